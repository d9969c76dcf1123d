//! HTTP handlers for the chat service.

pub mod chat;
pub mod health;
pub mod metrics;

pub use chat::chat;
pub use health::{health_check, root};
pub use self::metrics::metrics_endpoint;
