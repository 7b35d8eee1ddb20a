use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use super::types::{ExtractionMethod, ExtractionResult, FallbackReason, GateDecision};
use super::ExtractionError;
use crate::config::{ExtractorConfig, MIN_COVERAGE};
use crate::pipeline::fallback::{
    build_extraction_request, log_token_usage, parse_generated_extraction, AnthropicClient,
    FallbackGenerator, Generation, GeneratorError, TokenUsage, DEGRADED_SUMMARY,
    EXTRACTION_SYSTEM_PROMPT,
};
use crate::pipeline::preprocess::{PolicyPreprocessor, PreprocessError, PreprocessorOutput};
use crate::pipeline::registry::PatternRegistry;

/// Operation name recorded with generator token usage.
const TOKEN_OPERATION: &str = "policy-extraction";

/// Run a deterministic stage, turning a panic into `PreprocessError::Aborted`.
fn run_guarded<T>(stage: impl FnOnce() -> T) -> Result<T, PreprocessError> {
    panic::catch_unwind(AssertUnwindSafe(stage)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        PreprocessError::Aborted(message)
    })
}

/// Runs the preprocessor, applies the coverage gate, and falls back to the
/// generator when the deterministic output is not trusted:
/// preprocess → gate → {accept | generate → parse → {llm | degraded}}
pub struct PolicyExtractor {
    preprocessor: Result<PolicyPreprocessor, String>,
    generator: Option<Arc<dyn FallbackGenerator>>,
    min_coverage: usize,
    surface_fallback_errors: bool,
}

impl PolicyExtractor {
    pub fn new(preprocessor: PolicyPreprocessor) -> Self {
        Self {
            preprocessor: Ok(preprocessor),
            generator: None,
            min_coverage: MIN_COVERAGE,
            surface_fallback_errors: false,
        }
    }

    /// An extractor whose deterministic path is unavailable. Every document
    /// goes to the generator.
    pub fn without_preprocessor(reason: impl Into<String>) -> Self {
        Self {
            preprocessor: Err(reason.into()),
            generator: None,
            min_coverage: MIN_COVERAGE,
            surface_fallback_errors: false,
        }
    }

    /// Compile `registry`. A registry that cannot be compiled disables the
    /// deterministic path instead of failing.
    pub fn from_registry(registry: Arc<PatternRegistry>) -> Self {
        match PolicyPreprocessor::new(registry) {
            Ok(preprocessor) => Self::new(preprocessor),
            Err(e) => {
                tracing::warn!(error = %e, "Pattern registry unusable, deterministic path disabled");
                Self::without_preprocessor(e.to_string())
            }
        }
    }

    /// Registry from `registry_path` (or the embedded default), generator from
    /// the API settings when a key is configured.
    pub fn from_config(config: &ExtractorConfig) -> Self {
        let registry = match &config.registry_path {
            Some(path) => PatternRegistry::load(path),
            None => PatternRegistry::embedded(),
        };

        let extractor = match registry {
            Ok(registry) => Self::from_registry(Arc::new(registry)),
            Err(e) => {
                tracing::warn!(error = %e, "Pattern registry failed to load, deterministic path disabled");
                Self::without_preprocessor(e.to_string())
            }
        };

        let extractor = match AnthropicClient::from_config(config) {
            Ok(client) => extractor.with_generator(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "Fallback generator not configured");
                extractor
            }
        };

        extractor
            .with_min_coverage(config.min_coverage)
            .with_surface_fallback_errors(config.surface_fallback_errors)
    }

    pub fn with_generator(mut self, generator: Arc<dyn FallbackGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Matched patterns required to accept the deterministic output. Never
    /// below 1, so a document with zero matches always falls back.
    pub fn with_min_coverage(mut self, min_coverage: usize) -> Self {
        if min_coverage == 0 {
            tracing::warn!("Minimum coverage of 0 raised to 1");
        }
        self.min_coverage = min_coverage.max(1);
        self
    }

    /// Return generator failures as errors instead of a degraded result.
    pub fn with_surface_fallback_errors(mut self, surface: bool) -> Self {
        self.surface_fallback_errors = surface;
        self
    }

    pub fn preprocessor(&self) -> Option<&PolicyPreprocessor> {
        self.preprocessor.as_ref().ok()
    }

    pub fn min_coverage(&self) -> usize {
        self.min_coverage
    }

    /// The preprocessing call with its failure arm made explicit.
    pub fn try_preprocess(&self, text: &str) -> Result<PreprocessorOutput, PreprocessError> {
        let preprocessor = self
            .preprocessor
            .as_ref()
            .map_err(|reason| PreprocessError::RegistryUnavailable(reason.clone()))?;
        run_guarded(|| preprocessor.preprocess(text))
    }

    /// Preprocess and decide whether the output is trusted.
    pub fn gate(&self, text: &str) -> GateDecision {
        match self.try_preprocess(text) {
            Ok(output) => {
                let matched = output.coverage();
                let accepted = matched >= self.min_coverage;
                tracing::info!(
                    matched,
                    threshold = self.min_coverage,
                    accepted,
                    "Coverage gate"
                );
                if accepted {
                    GateDecision::Accept(Box::new(output))
                } else {
                    GateDecision::Fallback(FallbackReason::InsufficientCoverage {
                        matched,
                        required: self.min_coverage,
                    })
                }
            }
            Err(e) => GateDecision::Fallback(FallbackReason::PreprocessorFailed {
                reason: e.to_string(),
            }),
        }
    }

    /// Extract synchronously. Errors only when `surface_fallback_errors` is set.
    ///
    /// The generator is called on the current thread; from async code use
    /// `extract_with_timeout`, which moves that call to the blocking pool.
    pub fn extract(&self, text: &str, source: &str) -> Result<ExtractionResult, ExtractionError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("extract", %run_id, source);
        let _guard = span.enter();

        let reason = match self.gate(text) {
            GateDecision::Accept(output) => {
                return Ok(ExtractionResult::from_preprocessor(*output, source))
            }
            GateDecision::Fallback(reason) => reason,
        };
        tracing::warn!(reason = %reason, "Falling back to generator");

        let generation = match &self.generator {
            Some(generator) => generator
                .generate(EXTRACTION_SYSTEM_PROMPT, &build_extraction_request(text))
                .map_err(ExtractionError::from),
            None => Err(GeneratorError::MissingApiKey.into()),
        };
        self.finish_fallback(text, source, reason, generation)
    }

    /// Extract with the generator call bounded by `timeout`. The deterministic
    /// path runs inline; the generator runs on the blocking pool.
    pub async fn extract_with_timeout(
        &self,
        text: &str,
        source: &str,
        timeout: Duration,
    ) -> Result<ExtractionResult, ExtractionError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("extract", %run_id, source);

        async {
            let reason = match self.gate(text) {
                GateDecision::Accept(output) => {
                    return Ok(ExtractionResult::from_preprocessor(*output, source))
                }
                GateDecision::Fallback(reason) => reason,
            };
            tracing::warn!(reason = %reason, "Falling back to generator");

            let generation = match self.generator.clone() {
                Some(generator) => {
                    let request = build_extraction_request(text);
                    let task = tokio::task::spawn_blocking(move || {
                        generator.generate(EXTRACTION_SYSTEM_PROMPT, &request)
                    });
                    match tokio::time::timeout(timeout, task).await {
                        Ok(Ok(result)) => result.map_err(ExtractionError::from),
                        Ok(Err(join_error)) => Err(ExtractionError::Aborted(join_error.to_string())),
                        Err(_) => Err(ExtractionError::Timeout(timeout)),
                    }
                }
                None => Err(GeneratorError::MissingApiKey.into()),
            };
            self.finish_fallback(text, source, reason, generation)
        }
        .instrument(span)
        .await
    }

    fn finish_fallback(
        &self,
        text: &str,
        source: &str,
        reason: FallbackReason,
        generation: Result<Generation, ExtractionError>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let generation = match generation {
            Ok(generation) => generation,
            Err(e) => {
                tracing::warn!(error = %e, "Fallback generator failed");
                if self.surface_fallback_errors {
                    return Err(e);
                }
                return Ok(degraded_result(
                    text.to_string(),
                    source,
                    TokenUsage::default(),
                    reason,
                ));
            }
        };

        let model = self
            .generator
            .as_ref()
            .map(|g| g.model_name())
            .unwrap_or("unknown");
        log_token_usage(TOKEN_OPERATION, &generation.token_usage, model, Some(source));

        match parse_generated_extraction(&generation.content) {
            Ok(parsed) => Ok(ExtractionResult {
                method: ExtractionMethod::Llm,
                content: parsed
                    .structured_content
                    .unwrap_or_else(|| generation.content.clone()),
                summary: parsed
                    .summary
                    .unwrap_or_else(|| DEGRADED_SUMMARY.to_string()),
                validation_rules: parsed.validation_rules,
                extracted_at: Utc::now(),
                source_document: source.to_string(),
                token_usage: generation.token_usage,
                fallback_reason: Some(reason),
                preprocessor: None,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Generator response unparsable, using raw content");
                if self.surface_fallback_errors {
                    return Err(e.into());
                }
                Ok(degraded_result(
                    generation.content,
                    source,
                    generation.token_usage,
                    reason,
                ))
            }
        }
    }
}

/// Terminal degraded result: raw content, no rules, placeholder summary.
fn degraded_result(
    content: String,
    source: &str,
    token_usage: TokenUsage,
    reason: FallbackReason,
) -> ExtractionResult {
    tracing::warn!(source, "Emitting degraded extraction result");
    ExtractionResult {
        method: ExtractionMethod::Fallback,
        content,
        summary: DEGRADED_SUMMARY.to_string(),
        validation_rules: Vec::new(),
        extracted_at: Utc::now(),
        source_document: source.to_string(),
        token_usage,
        fallback_reason: Some(reason),
        preprocessor: None,
    }
}
