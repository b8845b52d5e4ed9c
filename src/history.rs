// src/history.rs

use crate::calculator::UsageInput;
use crate::numeric::round_to;
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::debug;

/// Current usage above `mean * ANOMALY_RATIO` is flagged.
pub const ANOMALY_RATIO: f64 = 1.2;
/// Assumed electricity price used for the savings estimate, $/kWh.
pub const PRICE_PER_KWH: f64 = 0.15;
/// How many trailing readings the forecast looks at.
pub const FORECAST_WINDOW: usize = 3;

pub const ONBOARDING_INSIGHT: &str =
    "Start tracking your usage over time to receive personalized insights and forecasts.";

/// A previously recorded monthly reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEntry {
    #[serde(default)]
    pub electricity: Option<f64>,
    pub date: Date,
}

impl HistoricalEntry {
    fn kwh(&self) -> f64 {
        self.electricity.filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub next_month: f64,
    pub trend: Trend,
    pub percent_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAnalysis {
    pub has_anomaly: bool,
    pub forecast: Option<Forecast>,
    pub insights: Vec<String>,
}

/// Compare the current reading with past ones and project next month.
///
/// `history` is expected oldest-first; only the last [`FORECAST_WINDOW`]
/// entries feed the forecast.
pub fn analyze_history(history: &[HistoricalEntry], current: &UsageInput) -> HistoryAnalysis {
    if history.is_empty() {
        return HistoryAnalysis {
            has_anomaly: false,
            forecast: None,
            insights: vec![ONBOARDING_INSIGHT.to_string()],
        };
    }

    let current_kwh = current.sanitized().electricity;
    let mut insights = Vec::new();

    let average = history.iter().map(HistoricalEntry::kwh).sum::<f64>() / history.len() as f64;
    let has_anomaly = current_kwh > average * ANOMALY_RATIO;

    if has_anomaly {
        if average > 0.0 {
            let increase = ((current_kwh - average) / average * 100.0).round() as i64;
            insights.push(format!(
                "Your electricity usage is {increase}% higher than your historical average. Check for appliances that might be using more energy than usual."
            ));
        } else {
            insights.push(
                "Your electricity usage is higher than your historical average. Check for appliances that might be using more energy than usual."
                    .to_string(),
            );
        }
    }

    let forecast = forecast_next_month(history, current_kwh);
    if let Some(ref f) = forecast {
        match f.trend {
            Trend::Increasing => insights.push(format!(
                "Your electricity usage is trending upward. At this rate, expect about {}% higher usage next month.",
                f.percent_change
            )),
            Trend::Decreasing => insights.push(format!(
                "Good job! Your electricity usage is trending downward. At this rate, expect about {}% lower usage next month.",
                f.percent_change
            )),
        }
    }

    if has_anomaly {
        let savings = (current_kwh - average) * PRICE_PER_KWH;
        insights.push(format!(
            "Reducing your electricity to your usual levels could save approximately ${savings:.2} on your next bill."
        ));
    }

    debug!(
        entries = history.len(),
        average,
        current = current_kwh,
        has_anomaly,
        "History analysed"
    );

    HistoryAnalysis {
        has_anomaly,
        forecast,
        insights,
    }
}

/// Two-interval slope over the last three readings: `(last - first) / 2`.
/// The middle reading only contributes through the divisor.
fn forecast_next_month(history: &[HistoricalEntry], current_kwh: f64) -> Option<Forecast> {
    if history.len() < FORECAST_WINDOW {
        return None;
    }

    let recent = &history[history.len() - FORECAST_WINDOW..];
    let trend = (recent[2].kwh() - recent[0].kwh()) / 2.0;

    let percent_change = if current_kwh > 0.0 {
        round_to(trend.abs() / current_kwh * 100.0, 1)
    } else {
        0.0
    };

    Some(Forecast {
        next_month: round_to(current_kwh + trend, 2),
        trend: if trend > 0.0 {
            Trend::Increasing
        } else {
            Trend::Decreasing
        },
        percent_change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn entries(values: &[f64]) -> Vec<HistoricalEntry> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| HistoricalEntry {
                electricity: Some(v),
                date: Date::from_calendar_date(2025, Month::try_from(i as u8 + 1).unwrap(), 1)
                    .unwrap(),
            })
            .collect()
    }

    fn current(kwh: f64) -> UsageInput {
        UsageInput {
            electricity: kwh,
            ..UsageInput::default()
        }
    }

    #[test]
    fn test_empty_history_onboards() {
        let analysis = analyze_history(&[], &current(500.0));
        assert!(!analysis.has_anomaly);
        assert!(analysis.forecast.is_none());
        assert_eq!(analysis.insights, vec![ONBOARDING_INSIGHT.to_string()]);
    }

    #[test]
    fn test_anomaly_threshold_is_strict() {
        let history = entries(&[100.0, 100.0]);
        assert!(!analyze_history(&history, &current(120.0)).has_anomaly);
        assert!(analyze_history(&history, &current(120.01)).has_anomaly);
    }

    #[test]
    fn test_anomaly_insights() {
        let history = entries(&[100.0, 100.0]);
        let analysis = analyze_history(&history, &current(150.0));
        assert!(analysis.has_anomaly);
        assert!(analysis.forecast.is_none());
        assert_eq!(analysis.insights.len(), 2);
        assert!(analysis.insights[0].starts_with("Your electricity usage is 50% higher"));
        assert_eq!(
            analysis.insights[1],
            "Reducing your electricity to your usual levels could save approximately $7.50 on your next bill."
        );
    }

    #[test]
    fn test_forecast_needs_three_entries() {
        let history = entries(&[100.0, 300.0]);
        let analysis = analyze_history(&history, &current(900.0));
        assert!(analysis.has_anomaly);
        assert!(analysis.forecast.is_none());
    }

    #[test]
    fn test_forecast_uses_last_three_only() {
        // Middle value is irrelevant; the first entry is outside the window.
        let history = entries(&[5000.0, 400.0, 9999.0, 500.0]);
        let analysis = analyze_history(&history, &current(1000.0));
        let forecast = analysis.forecast.unwrap();
        assert_eq!(forecast.trend, Trend::Increasing);
        assert_eq!(forecast.next_month, 1050.0);
        assert_eq!(forecast.percent_change, 5.0);
        assert!(
            analysis
                .insights
                .iter()
                .any(|i| i.contains("trending upward") && i.contains("about 5% higher"))
        );
    }

    #[test]
    fn test_forecast_decreasing() {
        let history = entries(&[600.0, 550.0, 500.0]);
        let analysis = analyze_history(&history, &current(400.0));
        assert!(!analysis.has_anomaly);
        let forecast = analysis.forecast.unwrap();
        assert_eq!(forecast.trend, Trend::Decreasing);
        assert_eq!(forecast.next_month, 350.0);
        assert_eq!(forecast.percent_change, 12.5);
        assert_eq!(
            analysis.insights,
            vec![
                "Good job! Your electricity usage is trending downward. At this rate, expect about 12.5% lower usage next month."
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_flat_trend_reads_as_decreasing() {
        let history = entries(&[300.0, 300.0, 300.0]);
        let forecast = analyze_history(&history, &current(300.0)).forecast.unwrap();
        assert_eq!(forecast.trend, Trend::Decreasing);
        assert_eq!(forecast.percent_change, 0.0);
    }

    #[test]
    fn test_missing_readings_count_as_zero() {
        let mut history = entries(&[200.0, 0.0, 100.0]);
        history[1].electricity = None;
        // mean is 100
        assert!(analyze_history(&history, &current(121.0)).has_anomaly);
    }

    #[test]
    fn test_zero_current_reading_does_not_divide_by_zero() {
        let history = entries(&[100.0, 200.0, 300.0]);
        let forecast = analyze_history(&history, &current(0.0)).forecast.unwrap();
        assert_eq!(forecast.percent_change, 0.0);
        assert_eq!(forecast.next_month, 100.0);
    }

    #[test]
    fn test_zero_average_anomaly_has_no_percentage() {
        let history = entries(&[0.0]);
        let analysis = analyze_history(&history, &current(50.0));
        assert!(analysis.has_anomaly);
        assert!(analysis.insights[0].starts_with("Your electricity usage is higher"));
    }
}
