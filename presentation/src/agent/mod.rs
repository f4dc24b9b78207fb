//! Interactive agent components

pub mod approval;

pub use approval::{InteractiveApproval, parse_decision, read_line};
