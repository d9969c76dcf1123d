pub mod advisor;
pub mod providers;

pub use advisor::{build_prompt, generate_reply, AdvisorError, FALLBACK_RESPONSE, FINANCIAL_CONTEXT};
