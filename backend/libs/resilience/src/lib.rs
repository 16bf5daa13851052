//! Resilience helpers for calls to rate-limited external services
//!
//! - **Retry**: exponential backoff for errors the caller classifies as transient
//! - **Timeout**: deadline for a single call, folded into the caller's error type
//!
//! # Example: retry only rate-limit failures
//!
//! ```rust,no_run
//! use resilience::{with_retry_if, RetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RetryConfig::default();
//!
//!     let result = with_retry_if(
//!         &config,
//!         |e: &String| e.contains("429"),
//!         || async { Ok::<_, String>("scored") },
//!     )
//!     .await;
//! }
//! ```

pub mod retry;
pub mod timeout;

pub use retry::{with_retry_if, RetryConfig, RetryError};
pub use timeout::{with_timeout, TimeoutError};
