// src/heuristics/mod.rs

mod generic;

use serde::Deserialize;
use serde::Serialize;

pub use generic::{DECISIVE_CONFIDENCE, FALLBACK_CONFIDENCE, PATTERN_COUNT};

/// What we could recover from a utility bill.
///
/// `success == false` with no `error` means the text was read but no usage
/// figure was found; the caller should keep the manually entered value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    /// kWh for the billing period
    pub electricity: Option<f64>,
    /// Heuristic trust in `electricity`, 0.0..=1.0
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn found(electricity: f64, confidence: f64) -> Self {
        Self {
            success: true,
            electricity: Some(electricity),
            confidence,
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            success: false,
            electricity: None,
            confidence: 0.0,
            error: None,
        }
    }

    /// The reader itself failed (corrupt PDF, OCR unavailable, ...).
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::not_found()
        }
    }
}

/// Pull the electricity usage figure out of raw bill text.
pub fn parse_utility_bill(text: &str) -> ExtractionResult {
    generic::extract(text)
}
