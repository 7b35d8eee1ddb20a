use std::sync::atomic::{AtomicUsize, Ordering};

use super::usage::TokenUsage;
use super::GeneratorError;

/// Text returned by a generator call, with its token cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
    pub token_usage: TokenUsage,
}

/// Hosted text-completion service used when the deterministic path is not trusted.
pub trait FallbackGenerator: Send + Sync {
    fn generate(&self, system: &str, user: &str) -> Result<Generation, GeneratorError>;

    fn model_name(&self) -> &str;
}

/// Mock generator for testing. Returns a configurable completion or error.
pub struct MockGenerator {
    outcome: Result<Generation, String>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new(content: &str) -> Self {
        Self {
            outcome: Ok(Generation {
                content: content.to_string(),
                token_usage: TokenUsage::new(100, 50),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with `GeneratorError::Connection`.
    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        if let Ok(generation) = &mut self.outcome {
            generation.token_usage = usage;
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FallbackGenerator for MockGenerator {
    fn generate(&self, _system: &str, _user: &str) -> Result<Generation, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(generation) => Ok(generation.clone()),
            Err(reason) => Err(GeneratorError::Connection(reason.clone())),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
