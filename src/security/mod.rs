pub mod cors;
pub mod webhook;

pub use cors::create_cors_layer;
pub use webhook::{verify_webhook, WebhookError, SIGNATURE_HEADER};
