//! BugRelay — library crate for integration testing.
//!
//! Re-exports modules needed by integration tests in `tests/`.

pub mod config;
pub mod endpoint;
pub mod errors;
pub mod llm;
pub mod rate_limit;
pub mod ticket;
pub mod tracker;
