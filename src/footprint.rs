// src/footprint.rs

use crate::bill_extract::{self, BillError, ExtractOptions};
use crate::calculator::{self, EmissionResult, UsageInput};
use crate::heuristics::ExtractionResult;
use crate::history::{self, HistoricalEntry, HistoryAnalysis};
use crate::recommend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Everything a caller needs to render one footprint calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootprintReport {
    /// The input the numbers were computed from, after any bill override.
    pub input: UsageInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionResult>,
    pub emissions: EmissionResult,
    pub recommendations: Vec<String>,
    /// Present only when there was prior history to compare with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryAnalysis>,
}

/// Run the full pipeline: optional bill extraction, emissions, advice and
/// history analysis.
///
/// A bill that cannot be read never fails the calculation; the manually
/// entered electricity figure is kept. Only an unsupported file type is
/// returned as an error.
pub async fn assess_footprint(
    input: UsageInput,
    bill: Option<&Path>,
    history: &[HistoricalEntry],
    opts: &ExtractOptions,
) -> Result<FootprintReport, BillError> {
    let extraction = match bill {
        Some(path) => Some(bill_extract::extract_bill_with(path, opts).await?),
        None => None,
    };
    Ok(build_report(input, extraction, history))
}

/// The synchronous half of [`assess_footprint`], once any bill has been read.
pub fn build_report(
    mut input: UsageInput,
    extraction: Option<ExtractionResult>,
    history: &[HistoricalEntry],
) -> FootprintReport {
    if let Some(ExtractionResult {
        success: true,
        electricity: Some(kwh),
        ..
    }) = &extraction
    {
        info!(kwh, "Using electricity usage read from the bill");
        input.electricity = *kwh;
    } else if extraction.is_some() {
        info!("Bill extraction found nothing, using manual inputs");
    }

    let input = input.sanitized();
    let emissions = calculator::calculate_emissions(&input);
    let recommendations = recommend::generate_recommendations(&emissions);
    let history = (!history.is_empty()).then(|| history::analyze_history(history, &input));

    FootprintReport {
        input,
        extraction,
        emissions,
        recommendations,
        history,
    }
}
