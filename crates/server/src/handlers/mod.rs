//! # API Route Handlers
//!
//! The handlers are split by concern: `general` for the root and health
//! endpoints, `chat` for the three question-to-SQL endpoints.

pub mod chat;
pub mod general;

pub use chat::*;
pub use general::*;
