//! Resilience patterns for realitycheck-runtime.
//!
//! This module provides:
//! - The retry policy shared by every agent call
//! - Token usage accounting

mod retry;
mod usage;

pub use retry::RetryPolicy;
pub use usage::LlmUsage;
