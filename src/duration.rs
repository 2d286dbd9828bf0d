use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::ParseError;

const NANOS_PER_SEC: u128 = 1_000_000_000;

static FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|μs|ms|s|m|h))+$").unwrap()
});

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)").unwrap()
});

fn unit_nanos(unit: &str) -> u128 {
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        _ => 3_600 * NANOS_PER_SEC,
    }
}

/// Parses a composable duration such as `2h30m`, `90s`, `1.5h` or `300ms`.
///
/// Units may appear in any order and repeat; their values add up. A bare
/// `0` is the zero duration. Negative durations are rejected.
pub fn parse(input: &str) -> Result<Duration, ParseError> {
    let (negative, body) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if body == "0" {
        return Ok(Duration::ZERO);
    }
    if !FULL.is_match(body) {
        return Err(ParseError::Unrecognized(input.to_string()));
    }

    let mut total: u128 = 0;
    for caps in COMPONENT.captures_iter(body) {
        let unit = unit_nanos(&caps[2]);
        let (whole, frac) = caps[1].split_once('.').unwrap_or((&caps[1], ""));

        if !whole.is_empty() {
            let whole: u128 = whole
                .parse()
                .map_err(|_| ParseError::OutOfRange(input.to_string()))?;
            total = whole
                .checked_mul(unit)
                .and_then(|n| total.checked_add(n))
                .ok_or_else(|| ParseError::OutOfRange(input.to_string()))?;
        }

        // Digits past nanosecond precision are dropped.
        let mut scale = unit;
        for digit in frac.bytes() {
            scale /= 10;
            if scale == 0 {
                break;
            }
            total += u128::from(digit - b'0') * scale;
        }
    }

    if negative && total > 0 {
        return Err(ParseError::Negative(input.to_string()));
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| ParseError::OutOfRange(input.to_string()))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Formats whole seconds compactly: `1h2m3s`, `4m0s`, `59s`, `0s`.
/// Sub-second remainders are ignored.
pub fn format_compact(d: Duration) -> String {
    let total = d.as_secs();
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}
