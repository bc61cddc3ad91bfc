use crate::model::id::SlotId;
use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display, EnumString};

pub mod event;

// スロットの空き状態。
// booked のスロットにはちょうど 1 件の非終了予約が紐づく
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub slot_id: SlotId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
}
