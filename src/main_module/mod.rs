//! Process wiring: router, server loop and health probe

mod health;
mod server;

pub use health::*;
pub use server::*;
