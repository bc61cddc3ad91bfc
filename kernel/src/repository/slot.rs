use crate::model::{
    id::SlotId,
    slot::{event::CreateSlot, Slot},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::error::AppResult;

#[async_trait]
pub trait SlotRepository: Send + Sync {
    // スロットを登録する（管理側のスケジュール作成）
    async fn create(&self, event: CreateSlot) -> AppResult<SlotId>;
    // 指定日の空きスロット一覧を取得する
    async fn find_available_by_date(&self, date: NaiveDate) -> AppResult<Vec<Slot>>;
    // スロット ID からスロットを取得する
    async fn find_by_id(&self, slot_id: SlotId) -> AppResult<Option<Slot>>;
}
