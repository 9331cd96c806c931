mod auth;
mod health_check;

pub use auth::{current_account, login, logout, LoginRequest};
pub use health_check::health_check;
