use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price per million input tokens, USD.
const INPUT_COST_PER_MILLION: f64 = 15.0;
/// Price per million output tokens, USD.
const OUTPUT_COST_PER_MILLION: f64 = 75.0;

/// Token accounting for one generator call. All zero on the deterministic path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.total_tokens == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub model: String,
    pub source_document: Option<String>,
}

/// Record token usage for a generator call.
pub fn log_token_usage(
    operation: &str,
    usage: &TokenUsage,
    model: &str,
    source_document: Option<&str>,
) -> TokenLogEntry {
    tracing::info!(
        operation,
        model,
        source = source_document.unwrap_or("-"),
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        total_tokens = usage.total_tokens,
        "Token usage"
    );

    TokenLogEntry {
        timestamp: Utc::now(),
        operation: operation.to_string(),
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        total_tokens: usage.total_tokens,
        model: model.to_string(),
        source_document: source_document.map(str::to_string),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `Input: 1,234 | Output: 567 | Total: 1,801`
pub fn format_token_usage(usage: &TokenUsage) -> String {
    format!(
        "Input: {} | Output: {} | Total: {}",
        group_thousands(usage.input_tokens),
        group_thousands(usage.output_tokens),
        group_thousands(usage.total_tokens)
    )
}

/// Rough USD cost of a call.
pub fn estimate_cost(usage: &TokenUsage) -> f64 {
    let input = usage.input_tokens as f64 / 1_000_000.0 * INPUT_COST_PER_MILLION;
    let output = usage.output_tokens as f64 / 1_000_000.0 * OUTPUT_COST_PER_MILLION;
    input + output
}
