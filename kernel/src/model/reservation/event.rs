use crate::model::{
    id::{ReservationId, SlotId, UserId},
    reservation::ReservationStatus,
};
use chrono::{DateTime, Utc};
use derive_new::new;

// 予約作成イベント。トランザクション内でスロット確保と同時に使われる
#[derive(new)]
pub struct ReserveSlot {
    pub slot_id: SlotId,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub slot_date: String,
    pub slot_time: String,
    pub created_at: DateTime<Utc>,
    pub payment_deadline: DateTime<Utc>,
}

// 入金確認イベント（ユーザー操作）
#[derive(new)]
pub struct ConfirmPayment {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub confirmed_at: DateTime<Utc>,
}

// 状態遷移イベント。expected と一致する行だけを更新する（CAS）
#[derive(new)]
pub struct UpdateReservationStatus {
    pub reservation_id: ReservationId,
    pub expected: ReservationStatus,
    pub next: ReservationStatus,
}
