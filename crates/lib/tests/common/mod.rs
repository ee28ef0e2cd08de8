#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared setup for the `datachat` integration tests.

use dotenvy::dotenv;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Wraps text in a fenced block with the given language label.
pub fn fenced(label: &str, body: &str) -> String {
    format!("```{label}\n{body}\n```")
}
