use crate::database::{model::slot::SlotRow, ConnectionPool};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use derive_new::new;
use kernel::model::{
    id::SlotId,
    slot::{event::CreateSlot, Slot, SlotStatus},
};
use kernel::repository::slot::SlotRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct SlotRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl SlotRepository for SlotRepositoryImpl {
    async fn create(&self, event: CreateSlot) -> AppResult<SlotId> {
        let slot_id = SlotId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO slots (slot_id, start_time, end_time, status)
                VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(slot_id)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(SlotStatus::Available.as_ref())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No slot record has been created".into(),
            ));
        }

        Ok(slot_id)
    }

    // 指定日の空きスロットを開始時刻順で返す
    async fn find_available_by_date(&self, date: NaiveDate) -> AppResult<Vec<Slot>> {
        let day_start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        let day_end = day_start + chrono::Duration::days(1);

        let rows: Vec<SlotRow> = sqlx::query_as(
            r#"
                SELECT slot_id, start_time, end_time, status
                FROM slots
                WHERE status = $1
                  AND start_time >= $2
                  AND start_time < $3
                ORDER BY start_time ASC
            "#,
        )
        .bind(SlotStatus::Available.as_ref())
        .bind(day_start)
        .bind(day_end)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Slot::try_from).collect()
    }

    async fn find_by_id(&self, slot_id: SlotId) -> AppResult<Option<Slot>> {
        let row: Option<SlotRow> = sqlx::query_as(
            r#"
                SELECT slot_id, start_time, end_time, status
                FROM slots
                WHERE slot_id = $1
            "#,
        )
        .bind(slot_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(Slot::try_from).transpose()
    }
}
