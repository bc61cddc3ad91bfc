use axum::{
    routing::{delete, get, post, put},
    Router,
};
use registry::AppRegistry;

use crate::handler::reservation::{
    approve_reservation, cancel_reservation, confirm_payment, delete_reservation,
    reject_reservation, reserve_slot, show_countdown, show_my_reservations, show_reservation,
    show_reservation_list,
};

pub fn build_reservation_routers() -> Router<AppRegistry> {
    let reservation_routers = Router::new()
        .route("/", get(show_reservation_list))
        .route("/me", get(show_my_reservations))
        .route("/:reservation_id", get(show_reservation))
        .route("/:reservation_id", delete(delete_reservation))
        .route("/:reservation_id/payment", post(confirm_payment))
        .route("/:reservation_id/cancel", post(cancel_reservation))
        .route("/:reservation_id/countdown", get(show_countdown))
        .route("/:reservation_id/approve", put(approve_reservation))
        .route("/:reservation_id/reject", put(reject_reservation));

    // 予約の作成はスロットに対する操作として公開する
    let slot_reservation_routers =
        Router::new().route("/:slot_id/reservations", post(reserve_slot));

    Router::new()
        .nest("/reservations", reservation_routers)
        .nest("/slots", slot_reservation_routers)
}
