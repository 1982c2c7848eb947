pub mod config;
pub mod shared;
pub mod store;
pub mod tenant;
