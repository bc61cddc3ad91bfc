use chrono::{DateTime, Utc};
use derive_new::new;

#[derive(new)]
pub struct CreateSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
