pub mod cors;
pub mod metrics;
pub mod tracing;

pub use self::cors::permissive_cors;
pub use self::metrics::metrics_middleware;
pub use self::tracing::{REQUEST_ID_HEADER, http_trace_layer, request_id_middleware};
