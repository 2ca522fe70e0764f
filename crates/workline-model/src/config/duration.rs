use std::time::Duration;

use crate::error::ParseDurationError;

/// Parses a duration written as a sequence of decimal numbers with units,
/// e.g. `500ms`, `1.5s`, `1m30s`, `250us`.
///
/// Accepted units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`.
/// A bare `0` is accepted as zero; every other number needs a unit.
/// Negative values are rejected.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ParseDurationError::Empty);
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(ParseDurationError::Invalid(input.to_string()));
        }
        let (num, tail) = rest.split_at(num_len);

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(ParseDurationError::MissingUnit(input.to_string()));
        }

        let scale = unit_nanos(unit).ok_or_else(|| ParseDurationError::UnknownUnit {
            input: input.to_string(),
            unit: unit.to_string(),
        })?;
        let value: f64 = num
            .parse()
            .map_err(|_| ParseDurationError::Invalid(input.to_string()))?;

        let nanos = (value * scale as f64).round();
        if !nanos.is_finite() || nanos >= u64::MAX as f64 {
            return Err(ParseDurationError::Overflow(input.to_string()));
        }
        total = total
            .checked_add(Duration::from_nanos(nanos as u64))
            .ok_or_else(|| ParseDurationError::Overflow(input.to_string()))?;
        rest = tail;
    }
    Ok(total)
}

/// Like [`parse_duration`], but also accepts a leading sign.
///
/// A negative value maps to [`Duration::ZERO`] so that it reaches config
/// validation as a non-positive timeout instead of failing as bad syntax.
pub fn parse_timeout(input: &str) -> Result<Duration, ParseDurationError> {
    let s = input.trim();
    if let Some(magnitude) = s.strip_prefix('-') {
        parse_duration(magnitude).map(|_| Duration::ZERO)
    } else {
        parse_duration(s.strip_prefix('+').unwrap_or(s))
    }
}

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}
