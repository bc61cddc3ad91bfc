use crate::model::id::{ReservationId, SlotId, UserId};
use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub mod countdown;
pub mod event;

// 予約の状態遷移：
//   payment_required → payment_confirmed → approved
// payment_required / payment_confirmed からは rejected（管理側の却下）と
// cancelled（ユーザー取消・期限切れ）にも遷移できる。
// approved / rejected / cancelled は終了状態であり、それ以上遷移しない
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ReservationStatus {
    PaymentRequired,
    PaymentConfirmed,
    Approved,
    Rejected,
    Cancelled,
}

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::PaymentRequired, Self::PaymentConfirmed) => true,
            (Self::PaymentRequired, Self::Rejected) => true,
            (Self::PaymentRequired, Self::Cancelled) => true,
            (Self::PaymentConfirmed, Self::Approved) => true,
            (Self::PaymentConfirmed, Self::Rejected) => true,
            (Self::PaymentConfirmed, Self::Cancelled) => true,
            (
                Self::PaymentRequired | Self::PaymentConfirmed,
                Self::PaymentRequired,
            ) => false,
            (Self::PaymentRequired, Self::Approved) => false,
            (Self::PaymentConfirmed, Self::PaymentConfirmed) => false,
            (Self::Approved | Self::Rejected | Self::Cancelled, _) => false,
        }
    }

    // この状態への遷移でスロットを available に戻す必要があるか
    pub fn releases_slot(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub slot_id: SlotId,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    // 予約画面に表示する日付・時間帯の文字列。予約確定時のスナップショット
    pub slot_date: String,
    pub slot_time: String,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub payment_confirmed: bool,
    pub payment_confirmed_at: Option<DateTime<Utc>>,
    pub payment_deadline: DateTime<Utc>,
}
