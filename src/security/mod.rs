pub mod client;
pub mod webhook;

pub use client::ClientMeta;
pub use webhook::{compute_signature, validate_webhook_signature, SIGNATURE_HEADER};
