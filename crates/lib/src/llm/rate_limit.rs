//! Retry hints from rate-limited (HTTP 429) responses.
//!
//! The `Retry-After` header wins. Without it, providers often put the hint in the error text
//! ("Please try again in 7m12.5s"), so the body is searched as a best effort.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Seconds from a `Retry-After` header value: delay-seconds or an HTTP date.
pub fn parse_retry_after_header(value: &str) -> Option<u64> {
    parse_retry_after_header_at(value, Utc::now())
}

/// As [`parse_retry_after_header`] with an explicit "now" for HTTP dates. Dates in the past
/// yield 0.
pub fn parse_retry_after_header_at(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    if let Ok(secs) = value.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            return Some(secs.ceil() as u64);
        }
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&Utc).signed_duration_since(now).num_seconds();
    Some(delta.max(0) as u64)
}

fn phrase_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:try again in|retry in|retry after|spróbuj(?:\s+ponownie)?\s+za)\s+([^\n;,]{1,40})")
            .expect("retry phrase regex")
    })
}

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(\d+(?:[.,]\d+)?)\s*(ms|milliseconds?|hours?|hrs?|h|godzin\p{L}*|minutes?|mins?|minut\p{L}*|m|seconds?|secs?|sekund\p{L}*|s)",
        )
        .expect("retry amount regex")
    })
}

/// Seconds parsed from a human-readable hint such as `try again in 7m12.5s`,
/// `try again in 20 minutes` or `spróbuj ponownie za 5 minut`. Fractions round up.
pub fn parse_retry_after_body(body: &str) -> Option<u64> {
    let phrase = phrase_regex().captures(body)?.get(1)?.as_str();
    let mut total = 0.0_f64;
    let mut matched = false;
    for caps in amount_regex().captures_iter(phrase) {
        let amount: f64 = caps[1].replace(',', ".").parse().ok()?;
        let unit = caps[2].to_lowercase();
        let factor = if unit.starts_with("ms") || unit.starts_with("milli") {
            0.001
        } else if unit.starts_with('h') || unit.starts_with("godzin") {
            3600.0
        } else if unit.starts_with('m') {
            60.0
        } else {
            1.0
        };
        total += amount * factor;
        matched = true;
    }
    matched.then(|| total.ceil() as u64)
}
