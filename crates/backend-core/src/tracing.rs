//! # Observability & Tracing
//!
//! Structured logging for every backend, built on the `tracing` crate.
//!
//! ## What Gets Traced
//!
//! - **Backend lifecycle**: construction and reset of a backend partition
//! - **Store operations**: Create, Get, Update, Delete with the resource kind and id
//! - **Rejections**: failed validations with the error that was returned
//!
//! ## Usage Examples
//!
//! ```bash
//! # Mutations only
//! RUST_LOG=info cargo run
//!
//! # Lookups and full payloads
//! RUST_LOG=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` a pipeline creation reads:
//!
//! ```text
//! INFO Backend created service="codepipeline" account_id="123456789012" region="us-east-1"
//! INFO Created entity="Pipeline" id=build size=1
//! ```

use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber: compact lines, no module targets, `RUST_LOG` aware.
///
/// Panics if a global subscriber is already set; use [`try_setup_tracing`] from tests.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .compact()
        .init();
}

/// Like [`setup_tracing`] but a no-op when a subscriber is already installed.
pub fn try_setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .compact()
        .with_test_writer()
        .try_init();
}
