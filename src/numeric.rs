// src/numeric.rs

/// Parse the longest leading decimal number in `raw`, ignoring leading
/// whitespace. An exponent is accepted (`"1e3"` gives `1000`). Trailing
/// garbage is dropped: `"12.5kwh"` gives `12.5`.
///
/// Returns `None` when no digits lead the string or the result is not finite.
pub fn leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (i, c) in s.char_indices() {
        match c {
            '-' | '+' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return None;
    }
    let mantissa_end = end;
    end += exponent_len(&s[end..]);

    let candidate = if end == mantissa_end {
        s[..end].trim_end_matches('.')
    } else {
        &s[..end]
    };
    candidate.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Length of an `e`/`E` exponent (`e3`, `E-2`) leading `rest`, or 0 when the
/// exponent has no digits.
fn exponent_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let sign = usize::from(matches!(bytes.get(1), Some(b'-' | b'+')));
    let digits = bytes[1 + sign..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 { 0 } else { 1 + sign + digits }
}

/// Parse the leading integer in `raw` (`"4 people"` → 4).
pub fn leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_float_drops_suffix() {
        assert_eq!(leading_float("12.5kwh"), Some(12.5));
        assert_eq!(leading_float("  900 "), Some(900.0));
        assert_eq!(leading_float("1.2.3"), Some(1.2));
        assert_eq!(leading_float("500."), Some(500.0));
        assert_eq!(leading_float(".5"), Some(0.5));
    }

    #[test]
    fn test_leading_float_exponent() {
        assert_eq!(leading_float("1e3"), Some(1000.0));
        assert_eq!(leading_float("2.5E-1kwh"), Some(0.25));
        assert_eq!(leading_float("4e+2 units"), Some(400.0));
        assert_eq!(leading_float("7e"), Some(7.0));
        assert_eq!(leading_float("7e-x"), Some(7.0));
        assert_eq!(leading_float("1e400"), None);
    }

    #[test]
    fn test_leading_float_rejects_non_numbers() {
        assert_eq!(leading_float(""), None);
        assert_eq!(leading_float("."), None);
        assert_eq!(leading_float("abc"), None);
        assert_eq!(leading_float("-"), None);
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("4 people"), Some(4));
        assert_eq!(leading_int("3.7"), Some(3));
        assert_eq!(leading_int("-2"), Some(-2));
        assert_eq!(leading_int("x"), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(4.5087, 2), 4.51);
        assert_eq!(round_to(-99.96, 1), -100.0);
        assert_eq!(round_to(0.125, 1), 0.1);
    }
}
