//! Logging infrastructure
//!
//! [`JsonlTranscript`] implements the
//! [`ConversationLogger`](toolforge_application::ConversationLogger) port.

mod jsonl_transcript;

pub use jsonl_transcript::JsonlTranscript;
