use super::ExtractionResult;
use crate::numeric::leading_float;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// A keyword-anchored pattern and the capture group holding the number.
struct UsagePattern {
    regex: Regex,
    group: usize,
}

fn pattern(re: &str, group: usize) -> UsagePattern {
    UsagePattern {
        regex: Regex::new(re).expect("static usage pattern must compile"),
        group,
    }
}

// Ordered most specific first. The index decides the confidence, so the
// order is part of the result and must not be shuffled.
static USAGE_PATTERNS: Lazy<Vec<UsagePattern>> = Lazy::new(|| {
    vec![
        // "total kwh: 123", "total kwh used: 123", "total kwh is 123"
        pattern(r"(?i)total\s+kwh\s*(used|consumed|:)?\s*(:|is)?\s*([\d,\.]+)", 3),
        // "electricity usage: 123 kwh"
        pattern(r"(?i)electricity\s+usage\s*:?\s*([\d,\.]+)\s*kwh", 1),
        // "123 kwh"
        pattern(r"(?i)([\d,\.]+)\s*kwh", 1),
        // "energy used: 123"
        pattern(r"(?i)energy\s+used\s*:?\s*([\d,\.]+)", 1),
        // "current reading: 123", often the meter index rather than usage
        pattern(r"(?i)current\s+reading\s*:?\s*([\d,\.]+)", 1),
    ]
});

static POWER_UNIT_FALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\d,\.]+)\s*(kw|kwh|kilowatt|units)").expect("static fallback must compile")
});

pub const PATTERN_COUNT: usize = 5;
pub const FALLBACK_CONFIDENCE: f64 = 0.3;
/// A hit scoring above this stops the scan; weaker hits let later patterns
/// replace them.
pub const DECISIVE_CONFIDENCE: f64 = 0.7;

/// Strip thousands separators and read the number.
fn parse_reading(raw: &str) -> Option<f64> {
    leading_float(&raw.replace(',', ""))
}

pub fn extract(text: &str) -> ExtractionResult {
    let lower = text.to_lowercase();

    let mut hit = None;
    for (idx, p) in USAGE_PATTERNS.iter().enumerate() {
        let Some(value) = p
            .regex
            .captures(&lower)
            .and_then(|c| c.get(p.group))
            .and_then(|m| parse_reading(m.as_str()))
        else {
            continue;
        };
        let confidence = 1.0 - idx as f64 / PATTERN_COUNT as f64;
        debug!(pattern = idx, value, confidence, "Usage pattern matched");
        hit = Some((value, confidence));
        if confidence > DECISIVE_CONFIDENCE {
            break;
        }
    }

    if let Some((value, confidence)) = hit {
        return ExtractionResult::found(value, confidence);
    }

    // Relaxed scan over the untouched text for any number next to a power unit.
    if let Some(value) = POWER_UNIT_FALLBACK
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_reading(m.as_str()))
    {
        debug!(value, "Power-unit fallback matched");
        return ExtractionResult::found(value, FALLBACK_CONFIDENCE);
    }

    ExtractionResult::not_found()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_count_matches_table() {
        assert_eq!(USAGE_PATTERNS.len(), PATTERN_COUNT);
    }

    #[test]
    fn test_total_kwh_beats_generic_kwh() {
        let text = "ACME Power\nMeter 300 kWh last period\nTotal kWh: 500\n";
        let r = extract(text);
        assert!(r.success);
        assert_eq!(r.electricity, Some(500.0));
        assert_eq!(r.confidence, 1.0);
        assert!(r.error.is_none());
    }

    #[test]
    fn test_total_kwh_variants() {
        assert_eq!(extract("TOTAL KWH USED: 1,234.5").electricity, Some(1234.5));
        assert_eq!(extract("total kwh is 88").electricity, Some(88.0));
        assert_eq!(extract("Total  kWh consumed 42").electricity, Some(42.0));
    }

    #[test]
    fn test_confidence_follows_pattern_order() {
        let r = extract("Electricity Usage: 742 kWh");
        assert_eq!(r.electricity, Some(742.0));
        assert!((r.confidence - 0.8).abs() < 1e-12);

        let r = extract("You used 615 kWh this month");
        assert_eq!(r.electricity, Some(615.0));
        assert!((r.confidence - 0.6).abs() < 1e-12);

        let r = extract("Energy used: 610");
        assert_eq!(r.electricity, Some(610.0));
        assert!((r.confidence - 0.4).abs() < 1e-12);

        let r = extract("Current reading: 45,678");
        assert_eq!(r.electricity, Some(45678.0));
        assert!((r.confidence - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_decisive_pattern_stops_the_scan() {
        // "electricity usage" scores 0.8, so the later kWh and reading hits are ignored.
        let r = extract("Electricity usage: 640 kWh\nCurrent reading: 9000");
        assert_eq!(r.electricity, Some(640.0));
        assert!((r.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_weak_hit_is_replaced_by_later_pattern() {
        // The generic kWh hit scores 0.6, so scanning continues and
        // "current reading" overwrites it.
        let r = extract("Billed 310 kWh\nCurrent reading: 9000");
        assert_eq!(r.electricity, Some(9000.0));
        assert!((r.confidence - 0.2).abs() < 1e-12);

        let r = extract("Current reading: 9000\nBilled 310 kWh\nEnergy used: 305");
        assert_eq!(r.electricity, Some(9000.0));
        assert!((r.confidence - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unparsable_capture_falls_through() {
        // ". kwh" captures a lone dot, which is not a number.
        let r = extract("rate per . kwh\nenergy used: 77");
        assert_eq!(r.electricity, Some(77.0));
        assert!((r.confidence - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_power_unit_fallback() {
        let r = extract("Consumption this cycle 350 Units");
        assert!(r.success);
        assert_eq!(r.electricity, Some(350.0));
        assert_eq!(r.confidence, FALLBACK_CONFIDENCE);

        let r = extract("Peak demand 12 kW");
        assert_eq!(r.electricity, Some(12.0));
        assert_eq!(r.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_no_match() {
        let r = extract("Thank you for your payment of $84.20");
        assert_eq!(r, ExtractionResult::not_found());
        assert!(r.error.is_none());
    }
}
