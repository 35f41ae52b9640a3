//! Bulk-frame cleaning.
//!
//! The board answers a `d` request with three lines, one per channel:
//! `d,[v1,v2,...,vn]`. Brackets are optional, a trailing comma is common,
//! and samples the board never filled are printed as `nan`.
use super::BULK_PREFIX;
use log::warn;

/// Parse one raw bulk line into its finite samples, in order.
///
/// `nan` (any case) and empty tokens are dropped. Tokens that fail to parse
/// are logged and dropped. An empty result is valid.
pub fn parse_frame(raw: &str) -> Vec<f64> {
    let body = raw.trim();
    let body = body.strip_prefix(BULK_PREFIX).unwrap_or(body).trim();
    let body = body.strip_suffix(',').unwrap_or(body);
    let body = body.strip_prefix('[').unwrap_or(body);
    let body = body.strip_suffix(']').unwrap_or(body).trim();
    let body = body.strip_suffix(',').unwrap_or(body);

    let mut values = Vec::new();
    for token in body.split(',').map(str::trim) {
        if token.is_empty() || token.eq_ignore_ascii_case("nan") {
            continue;
        }
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => values.push(v),
            _ => warn!("Skipping unparseable bulk sample '{}'", token),
        }
    }
    values
}

/// Encode samples in the board's bracketed format.
pub fn encode_frame(values: &[f64]) -> String {
    let joined = values
        .iter()
        .map(|v| if v.is_nan() { "nan".to_string() } else { v.to_string() })
        .collect::<Vec<_>>()
        .join(",");
    format!("{BULK_PREFIX}[{joined}]")
}

/// Arithmetic mean, `None` for an empty series.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_frame_with_nans() {
        assert_eq!(
            parse_frame("d,[21.5,nan,22.0,NaN,22.5]"),
            vec![21.5, 22.0, 22.5]
        );
    }

    #[test]
    fn bare_frame_with_trailing_comma() {
        assert_eq!(parse_frame("d,400,410,420,"), vec![400.0, 410.0, 420.0]);
        assert_eq!(parse_frame("d,[400,410],"), vec![400.0, 410.0]);
    }

    #[test]
    fn garbage_tokens_dropped() {
        assert_eq!(parse_frame("d,[1.0,,x7,2.0]"), vec![1.0, 2.0]);
    }

    #[test]
    fn empty_frames_are_valid() {
        assert!(parse_frame("d,[]").is_empty());
        assert!(parse_frame("d,[nan,nan]").is_empty());
        assert!(parse_frame("d,").is_empty());
    }

    #[test]
    fn encoded_frames_parse_back_without_nans() {
        let samples = [18.25, f64::NAN, 19.0, -2.5];
        let line = encode_frame(&samples);
        assert_eq!(line, "d,[18.25,nan,19,-2.5]");
        assert_eq!(parse_frame(&line), vec![18.25, 19.0, -2.5]);
    }

    #[test]
    fn mean_of_samples() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }
}
