//! PhishGuard server internals.
//!
//! Exposed as a library so the integration tests in `tests/` can build
//! the router with test doubles for the classifier, credential verifier,
//! and store. The `phishguard` binary in `main.rs` is a thin shell over
//! [`serve::start_server`].

pub mod auth;
pub mod classify;
pub mod config;
pub mod pipeline;
pub mod serve;
