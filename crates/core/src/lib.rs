//! Core domain logic for the PhishGuard analysis pipeline.
//!
//! Everything in this crate is pure: validation, sanitization, prompt
//! construction, verdict parsing, and the trusted-contact override are
//! all functions from data to data. Network and storage I/O live in
//! `phishguard-server` and `phishguard-storage`.

pub mod message;
pub mod prompt;
pub mod sanitize;
pub mod trust;
pub mod validate;
pub mod verdict;

pub use message::{AnalysisRequest, MessageType};
pub use validate::{FieldError, ValidationError};
pub use verdict::{AnalysisResult, RiskLevel};
