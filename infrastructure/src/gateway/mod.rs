//! AI gateway adapters.

mod openai;
mod protocol;

pub use openai::OpenAiGateway;
