pub mod orchestrator;
pub mod types;

pub use orchestrator::*;
pub use types::*;

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::fallback::GeneratorError;

/// Surfaced only when the extractor is built with `with_surface_fallback_errors(true)`.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Fallback generator failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Fallback generator timed out after {0:?}")]
    Timeout(Duration),

    #[error("Fallback generator task aborted: {0}")]
    Aborted(String),
}
