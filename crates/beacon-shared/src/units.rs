//! Human quantity strings <-> canonical integers.
//!
//! Sizes use decimal (SI) multipliers: `100m` is 100 x 10^6 bytes and is
//! displayed as `100.0 MB`. Durations are whole seconds and are displayed in
//! hours with minute/second remainders (`2d` -> `48h`).
//!
//! Parsed values never exceed [`MAX_QUANTITY`](crate::constants::MAX_QUANTITY), the largest value the user
//! database can hold.

use crate::constants::{MAX_QUANTITY, SECS_PER_DAY, SECS_PER_HOUR, SECS_PER_MINUTE};
use crate::error::UnitError;

const SIZE_GRAMMAR: &str = "a non-negative number with an optional k, m, g or t suffix (e.g. 100m, 10G)";
const DURATION_GRAMMAR: &str = "a non-negative number with an s, m, h or d suffix (e.g. 30m, 12h, 2d)";

/// Display units above plain bytes, each 1000x the previous.
const SIZE_UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

fn size_error(input: &str) -> UnitError {
    UnitError::InvalidFormat {
        input: input.to_string(),
        expected: SIZE_GRAMMAR,
    }
}

fn duration_error(input: &str) -> UnitError {
    UnitError::InvalidFormat {
        input: input.to_string(),
        expected: DURATION_GRAMMAR,
    }
}

// ---------------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------------

/// Parse a byte size such as `100m`, `10G`, `1.5kb`, `512` or `100.0 MB`.
pub fn parse_size(text: &str) -> Result<u64, UnitError> {
    let lower = text.trim().to_ascii_lowercase();

    let (number, multiplier) = if let Some(rest) = lower.strip_suffix("bytes") {
        (rest, 1)
    } else {
        let rest = lower.strip_suffix('b').unwrap_or(&lower);
        match rest.chars().last() {
            Some('k') => (&rest[..rest.len() - 1], 1_000),
            Some('m') => (&rest[..rest.len() - 1], 1_000_000),
            Some('g') => (&rest[..rest.len() - 1], 1_000_000_000),
            Some('t') => (&rest[..rest.len() - 1], 1_000_000_000_000),
            _ => (rest, 1),
        }
    };

    parse_decimal(number.trim_end(), multiplier)
        .and_then(|value| u64::try_from(value).ok())
        .filter(|&value| value <= MAX_QUANTITY)
        .ok_or_else(|| size_error(text))
}

/// `digits[.digits] * multiplier`, fraction truncated to whole units.
fn parse_decimal(number: &str, multiplier: u128) -> Option<u128> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (number, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut value = whole.parse::<u128>().ok()?.checked_mul(multiplier)?;

    if let Some(fraction) = fraction {
        if fraction.is_empty() || fraction.len() > 18 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let scale = 10u128.pow(fraction.len() as u32);
        let digits = fraction.parse::<u128>().ok()?;
        value = value.checked_add(digits.checked_mul(multiplier)? / scale)?;
    }
    Some(value)
}

/// Format a byte count with one decimal digit in the largest fitting unit.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1_000 {
        return format!("{bytes} bytes");
    }

    let bytes = u128::from(bytes);
    let mut divisor: u128 = 1_000;
    for (index, unit) in SIZE_UNITS.iter().enumerate() {
        let tenths = (bytes * 10 + divisor / 2) / divisor;
        // Rounding may carry into the next unit (999,960 -> 1.0 MB).
        if tenths < 10_000 || index == SIZE_UNITS.len() - 1 {
            return format!("{}.{} {unit}B", tenths / 10, tenths % 10);
        }
        divisor *= 1_000;
    }
    unreachable!("the last unit always returns")
}

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

fn duration_unit(word: &str) -> Option<u64> {
    match word {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(SECS_PER_MINUTE),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(SECS_PER_HOUR),
        "d" | "day" | "days" => Some(SECS_PER_DAY),
        _ => None,
    }
}

/// Parse a duration such as `2d`, `12h`, `1h30m` or `90` (seconds).
pub fn parse_duration(text: &str) -> Result<u64, UnitError> {
    let lower = text.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return Err(duration_error(text));
    }
    if lower.bytes().all(|b| b.is_ascii_digit()) {
        return lower
            .parse::<u64>()
            .ok()
            .filter(|&secs| secs <= MAX_QUANTITY)
            .ok_or_else(|| duration_error(text));
    }

    let mut total: u64 = 0;
    let mut rest = lower.as_str();
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(duration_error(text));
        }
        let amount: u64 = rest[..digits_end].parse().map_err(|_| duration_error(text))?;
        rest = rest[digits_end..].trim_start();

        let word_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let unit = duration_unit(&rest[..word_end]).ok_or_else(|| duration_error(text))?;
        rest = rest[word_end..].trim_start();

        total = amount
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .filter(|&secs| secs <= MAX_QUANTITY)
            .ok_or_else(|| duration_error(text))?;
    }
    Ok(total)
}

/// Format seconds as hours with minute/second remainders, e.g. `48h`, `1h30m`.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0s".to_string();
    }
    let hours = seconds / SECS_PER_HOUR;
    let minutes = (seconds % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let secs = seconds % SECS_PER_MINUTE;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if secs > 0 {
        out.push_str(&format!("{secs}s"));
    }
    out
}
