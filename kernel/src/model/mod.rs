pub mod auth;
pub mod id;
pub mod reservation;
pub mod role;
pub mod slot;
pub mod user;
