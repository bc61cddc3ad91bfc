use kernel::model::{
    id::SlotId,
    slot::{Slot, SlotStatus},
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct SlotRow {
    pub slot_id: SlotId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    // status カラムは TEXT。ドメイン型への変換時に検証する
    pub status: String,
}

impl TryFrom<SlotRow> for Slot {
    type Error = AppError;

    fn try_from(value: SlotRow) -> Result<Self, Self::Error> {
        let SlotRow {
            slot_id,
            start_time,
            end_time,
            status,
        } = value;
        let status = status
            .parse::<SlotStatus>()
            .map_err(|e| AppError::ConversionEntityError(e.to_string()))?;
        Ok(Slot {
            slot_id,
            start_time,
            end_time,
            status,
        })
    }
}
