//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: the error taxonomy raised by registry and sandbox
//! - [`string`]: slug derivation and UTF-8 safe truncation

pub mod error;
pub mod string;
