use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::slot::{register_slot, show_available_slots, show_slot};

pub fn build_slot_routers() -> Router<AppRegistry> {
    let slot_routers = Router::new()
        .route("/", post(register_slot))
        .route("/", get(show_available_slots))
        .route("/:slot_id", get(show_slot));

    Router::new().nest("/slots", slot_routers)
}
