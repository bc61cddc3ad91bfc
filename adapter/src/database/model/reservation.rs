use kernel::model::{
    id::{ReservationId, SlotId, UserId},
    reservation::{Reservation, ReservationStatus},
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub struct ReservationRow {
    pub reservation_id: ReservationId,
    pub slot_id: SlotId,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub slot_date: String,
    pub slot_time: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub payment_confirmed: bool,
    pub payment_confirmed_at: Option<DateTime<Utc>>,
    pub payment_deadline: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(value: ReservationRow) -> Result<Self, Self::Error> {
        let ReservationRow {
            reservation_id,
            slot_id,
            user_id,
            user_name,
            email,
            slot_date,
            slot_time,
            status,
            created_at,
            payment_confirmed,
            payment_confirmed_at,
            payment_deadline,
        } = value;
        let status = status
            .parse::<ReservationStatus>()
            .map_err(|e| AppError::ConversionEntityError(e.to_string()))?;
        Ok(Reservation {
            reservation_id,
            slot_id,
            user_id,
            user_name,
            email,
            slot_date,
            slot_time,
            status,
            created_at,
            payment_confirmed,
            payment_confirmed_at,
            payment_deadline,
        })
    }
}
