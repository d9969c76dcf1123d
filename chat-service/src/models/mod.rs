pub mod chat;

pub use chat::{ChatRequest, ChatResponse, Message};
