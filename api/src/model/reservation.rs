use chrono::{DateTime, Utc};
use kernel::model::{
    id::{ReservationId, SlotId, UserId},
    reservation::{
        countdown::{CountdownState, UrgencyLevel},
        Reservation,
    },
};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationsResponse {
    pub items: Vec<ReservationResponse>,
}

impl From<Vec<Reservation>> for ReservationsResponse {
    fn from(value: Vec<Reservation>) -> Self {
        Self {
            items: value.into_iter().map(ReservationResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub reservation_id: ReservationId,
    pub slot_id: SlotId,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub date: String,
    pub time: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub payment_confirmed: bool,
    pub payment_confirmed_at: Option<DateTime<Utc>>,
    pub payment_deadline: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(value: Reservation) -> Self {
        let Reservation {
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
        Self {
            reservation_id,
            slot_id,
            user_id,
            user_name,
            email,
            date: slot_date,
            time: slot_time,
            status: status.to_string(),
            created_at,
            payment_confirmed,
            payment_confirmed_at,
            payment_deadline,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingTime {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

// 予約画面のカウントダウン表示用レスポンス。
// expired が true の場合、remaining と level は持たない
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownResponse {
    pub reservation_id: ReservationId,
    pub status: String,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<RemainingTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl CountdownResponse {
    // 入金待ち以外の状態ではカウントダウンを表示しない
    pub fn without_countdown(
        reservation_id: ReservationId,
        status: kernel::model::reservation::ReservationStatus,
    ) -> Self {
        Self {
            reservation_id,
            status: status.to_string(),
            expired: false,
            remaining: None,
            level: None,
        }
    }

    pub fn from_state(
        reservation_id: ReservationId,
        status: kernel::model::reservation::ReservationStatus,
        state: CountdownState,
    ) -> Self {
        match state {
            CountdownState::Expired => Self {
                reservation_id,
                status: status.to_string(),
                expired: true,
                remaining: None,
                level: None,
            },
            CountdownState::Ticking {
                hours,
                minutes,
                seconds,
                level,
            } => Self {
                reservation_id,
                status: status.to_string(),
                expired: false,
                remaining: Some(RemainingTime {
                    hours,
                    minutes,
                    seconds,
                }),
                level: Some(
                    match level {
                        UrgencyLevel::Normal => "normal",
                        UrgencyLevel::Warning => "warning",
                        UrgencyLevel::Critical => "critical",
                    }
                    .to_string(),
                ),
            },
        }
    }
}
