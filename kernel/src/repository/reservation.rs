use crate::model::{
    id::{ReservationId, SlotId, UserId},
    reservation::{
        event::{ConfirmPayment, ReserveSlot, UpdateReservationStatus},
        Reservation,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    // スロットの確保と予約レコードの作成を単一のトランザクションで行う。
    // スロットが存在しなければ SlotNotFound、
    // available でなければ SlotAlreadyBooked を返す
    async fn reserve(&self, event: ReserveSlot) -> AppResult<ReservationId>;

    // 入金確認（payment_required → payment_confirmed）。
    // 期待する状態と一致しない場合は何も更新しない
    async fn confirm_payment(&self, event: ConfirmPayment) -> AppResult<()>;

    // 管理側の承認・却下などの状態遷移。expected と一致する行だけを更新し、
    // rejected / cancelled への遷移では同一トランザクション内で
    // スロットを available に戻す
    async fn transition(&self, event: UpdateReservationStatus) -> AppResult<()>;

    // ユーザー自身による取消。非終了状態の自分の予約のみ取消でき、
    // スロットは同一トランザクション内で解放される
    async fn cancel(&self, reservation_id: ReservationId, user_id: UserId) -> AppResult<()>;

    // 入金期限切れによる自動取消。payment_required かつ期限超過の場合のみ
    // cancelled に遷移させ、解放したスロット ID を返す。
    // それ以外（入金確認済み・終了状態など）は何もせず None を返すため、
    // 複数回呼ばれても安全である
    async fn expire(
        &self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<SlotId>>;

    // 管理側による物理削除。非終了状態だった場合はスロットを解放する
    async fn delete(&self, reservation_id: ReservationId) -> AppResult<()>;

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>>;
    // ユーザーの非終了予約を取得する（1 ユーザー 1 件の事前チェックに使う）
    async fn find_active_by_user_id(&self, user_id: UserId) -> AppResult<Option<Reservation>>;
    // ユーザーの予約一覧（終了状態も含む）を取得する
    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Reservation>>;
    // 全予約一覧を取得する（管理画面用）
    async fn find_all(&self) -> AppResult<Vec<Reservation>>;
    // 期限を過ぎた payment_required の予約を取得する（掃き出しループ用）
    async fn find_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>>;
}
