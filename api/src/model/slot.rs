use chrono::{DateTime, NaiveDate, Utc};
use garde::Validate;
use kernel::model::{id::SlotId, slot::Slot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotRequest {
    #[garde(skip)]
    pub start_time: DateTime<Utc>,
    #[garde(skip)]
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SlotListQuery {
    #[garde(skip)]
    pub date: NaiveDate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub items: Vec<SlotResponse>,
}

impl From<Vec<Slot>> for SlotsResponse {
    fn from(value: Vec<Slot>) -> Self {
        Self {
            items: value.into_iter().map(SlotResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
    pub slot_id: SlotId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
}

impl From<Slot> for SlotResponse {
    fn from(value: Slot) -> Self {
        let Slot {
            slot_id,
            start_time,
            end_time,
            status,
        } = value;
        Self {
            slot_id,
            start_time,
            end_time,
            status: status.to_string(),
        }
    }
}

// スロットの表示用文字列を予約時のスナップショットとして整形する
pub fn slot_display_strings(slot: &Slot) -> (String, String) {
    let date = slot.start_time.format("%Y-%m-%d").to_string();
    let time = format!(
        "{} - {}",
        slot.start_time.format("%H:%M"),
        slot.end_time.format("%H:%M")
    );
    (date, time)
}
