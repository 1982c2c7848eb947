pub mod app_api;
pub mod channels;
pub mod consent;
pub mod core;
pub mod main_module;
pub mod security;
pub mod webhooks;

pub use crate::core::shared::state::AppState;
