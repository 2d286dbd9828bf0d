//! Time expression parsing.
//!
//! An expression is one of:
//! - a minute count, possibly fractional (`5`, `90`, `1.5`)
//! - a composable duration (`2h30m`, `90s`)
//! - a clock time with an optional half-day suffix (`130p`, `9a`, `930`)
//!
//! Numbers longer than one character with no fractional seconds are tried
//! as clock times first, so `130` means half past one rather than 130
//! minutes. Two-digit numbers without a suffix are never clock times.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Timelike, Utc};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::clock::{short_time, Zone};
use crate::duration;
use crate::error::ParseError;

static CLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)([ap])?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    Minutes,
    Duration,
    ClockTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub duration: Duration,
    pub title: String,
    pub kind: ExpressionKind,
}

/// Parses `text` relative to `now`, reading clock times in `zone`.
pub fn parse(text: &str, zone: Zone, now: DateTime<Utc>) -> Result<Expression, ParseError> {
    match zone {
        Zone::Local => parse_at(text, &now.with_timezone(&Local)),
        Zone::Named(tz) => parse_at(text, &now.with_timezone(&tz)),
    }
}

/// Parses `text` relative to `now`; clock times are read in `now`'s zone.
///
/// Durations whose deadline can't be represented as a date are out of range.
pub fn parse_at<Z: TimeZone>(text: &str, now: &DateTime<Z>) -> Result<Expression, ParseError> {
    let expr = interpret(text, now)?;
    let fits = TimeDelta::from_std(expr.duration)
        .ok()
        .and_then(|delta| now.clone().checked_add_signed(delta))
        .is_some();
    if !fits {
        return Err(ParseError::OutOfRange(text.to_string()));
    }
    Ok(expr)
}

fn interpret<Z: TimeZone>(text: &str, now: &DateTime<Z>) -> Result<Expression, ParseError> {
    if let Ok(value) = text.parse::<f64>() {
        return fractional_minutes(text, value, now);
    }

    if text.chars().count() == 1 {
        return whole_minutes(text);
    }

    match duration::parse(text) {
        Ok(d) => {
            return Ok(Expression {
                duration: d,
                title: format!("{text} Timer"),
                kind: ExpressionKind::Duration,
            });
        }
        Err(ParseError::Unrecognized(_)) => {}
        Err(e) => return Err(e),
    }

    if let Some(expr) = clock_time(text, now) {
        return Ok(expr);
    }

    whole_minutes(text)
}

fn fractional_minutes<Z: TimeZone>(
    text: &str,
    value: f64,
    now: &DateTime<Z>,
) -> Result<Expression, ParseError> {
    if !value.is_finite() {
        return Err(ParseError::OutOfRange(text.to_string()));
    }
    if value < 0.0 {
        return Err(ParseError::Negative(text.to_string()));
    }

    let minutes = value.floor();
    if minutes >= (u64::MAX / 60) as f64 {
        return Err(ParseError::OutOfRange(text.to_string()));
    }
    let seconds = ((value - minutes) * 60.0).floor() as u64;

    if seconds == 0 && text.len() > 1 {
        if let Some(expr) = clock_time(text, now) {
            return Ok(expr);
        }
    }

    Ok(Expression {
        duration: Duration::from_secs(minutes as u64 * 60 + seconds),
        title: format!("{value}m Timer"),
        kind: ExpressionKind::Minutes,
    })
}

fn whole_minutes(text: &str) -> Result<Expression, ParseError> {
    let minutes: u64 = text
        .parse()
        .map_err(|_| ParseError::Unrecognized(text.to_string()))?;
    let secs = minutes
        .checked_mul(60)
        .ok_or_else(|| ParseError::OutOfRange(text.to_string()))?;

    Ok(Expression {
        duration: Duration::from_secs(secs),
        title: format!("{text}m Timer"),
        kind: ExpressionKind::Minutes,
    })
}

/// Splits clock digits into hour and minute: `130` is 1:30, `9` is 9:00.
fn split_clock(digits: &str) -> Option<(u32, u32)> {
    if digits.len() >= 3 {
        let (hour, minute) = digits.split_at(digits.len() - 2);
        Some((hour.parse().ok()?, minute.parse().ok()?))
    } else {
        Some((digits.parse().ok()?, 0))
    }
}

fn resolve_local<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> Option<DateTime<Z>> {
    // A wall time skipped by a DST jump resolves to the hour after it.
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
}

fn clock_time<Z: TimeZone>(text: &str, now: &DateTime<Z>) -> Option<Expression> {
    let caps = CLOCK.captures(text)?;
    let digits = &caps[1];
    let period = caps.get(2).map(|m| m.as_str());

    if period.is_none() && digits.len() <= 2 {
        return None;
    }

    let (hour, minute) = split_clock(digits)?;
    if hour > 23 || minute > 59 {
        return None;
    }

    let naive = now.date_naive().and_hms_opt(hour, minute, 0)?;
    let mut end = resolve_local(&now.timezone(), naive)?;

    let half_day = TimeDelta::hours(12);
    while end < *now {
        end = end.checked_add_signed(half_day)?;
    }

    let wrong_half = match period {
        Some("a") => end.hour() >= 12,
        Some("p") => end.hour() < 12,
        _ => false,
    };
    if wrong_half {
        end = end.checked_add_signed(half_day)?;
    }

    let duration = end.clone().signed_duration_since(now).to_std().ok()?;
    Some(Expression {
        duration,
        title: format!("{} Timer", short_time(&end)),
        kind: ExpressionKind::ClockTime,
    })
}
