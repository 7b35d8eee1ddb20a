pub mod anthropic;
pub mod generator;
pub mod parser;
pub mod prompt;
pub mod usage;

pub use anthropic::*;
pub use generator::*;
pub use parser::*;
pub use prompt::*;
pub use usage::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("No API key configured for the fallback generator")]
    MissingApiKey,

    #[error("Cannot reach completion service at {0}")]
    Connection(String),

    #[error("Completion request timed out after {0}s")]
    Timeout(u64),

    #[error("Rate limited by completion service")]
    RateLimited,

    #[error("Completion service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Completion contained no text")]
    EmptyCompletion,
}
