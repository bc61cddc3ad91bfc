pub mod auth;
pub mod reservation;
pub mod slot;
pub mod user;
