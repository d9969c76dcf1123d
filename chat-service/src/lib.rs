//! chat-service: financial assistant chat relay in front of a hosted model.
pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
