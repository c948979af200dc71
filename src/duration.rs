//! Human-readable durations for the command line and the result table.
//!
//! [`parse_duration`] accepts compound forms such as `"1h30m"`, `"1.5s"` or
//! `"250ms"`; a bare number means seconds. [`format_duration`] renders the
//! inverse (`"1m30s"`, `"12.5ms"`, `"0s"`).

use std::fmt::Write as _;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a duration string like "30s", "5m", "1h30m" into a Duration
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }
    if s.starts_with('-') {
        return Err(format!("negative duration: {s}"));
    }
    let s = s.strip_prefix('+').unwrap_or(s);

    let mut total: u128 = 0;
    let mut rest = s;
    let mut segments = 0;
    while !rest.is_empty() {
        let num_end = rest
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
            .map_or(rest.len(), |(i, _)| i);
        let (num_str, tail) = rest.split_at(num_end);
        let unit_end = tail
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map_or(tail.len(), |(i, _)| i);
        let (unit, tail) = tail.split_at(unit_end);

        if num_str.is_empty() {
            return Err(format!("invalid number in duration: {s}"));
        }
        let unit_nanos = match unit.trim() {
            "" if segments == 0 && tail.is_empty() => NANOS_PER_SEC,
            "" => return Err(format!("missing unit in duration: {s}")),
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3_600 * NANOS_PER_SEC,
            "d" => 86_400 * NANOS_PER_SEC,
            other => return Err(format!("unknown duration suffix: {other}")),
        };

        total = total
            .checked_add(scale(num_str, unit_nanos).ok_or_else(|| format!("invalid number in duration: {s}"))?)
            .ok_or_else(|| format!("duration out of range: {s}"))?;
        segments += 1;
        rest = tail;
    }

    from_nanos(total).ok_or_else(|| format!("duration out of range: {s}"))
}

/// `"1.5"` × unit, truncated to whole nanoseconds.
fn scale(num: &str, unit_nanos: u128) -> Option<u128> {
    let (whole, frac) = num.split_once('.').unwrap_or((num, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(unit_nanos)?;

    let mut place = unit_nanos;
    for digit in frac.chars() {
        let digit = u128::from(digit.to_digit(10)?);
        place /= 10;
        if place == 0 {
            break;
        }
        nanos = nanos.checked_add(digit * place)?;
    }
    Some(nanos)
}

fn from_nanos(nanos: u128) -> Option<Duration> {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
    let sub = u32::try_from(nanos % NANOS_PER_SEC).ok()?;
    Some(Duration::new(secs, sub))
}

/// Renders a duration with the largest fitting units (`"2h0m0s"`, `"1.5s"`, `"750µs"`).
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    match nanos {
        0 => return "0s".to_string(),
        n if n < 1_000 => return format!("{n}ns"),
        n if n < 1_000_000 => return format!("{}µs", decimal(n, 1_000)),
        n if n < NANOS_PER_SEC => return format!("{}ms", decimal(n, 1_000_000)),
        _ => {}
    }

    let secs = d.as_secs();
    let (hours, minutes) = (secs / 3_600, (secs / 60) % 60);
    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let rem = u128::from(secs % 60) * NANOS_PER_SEC + u128::from(d.subsec_nanos());
    let _ = write!(out, "{}s", decimal(rem, NANOS_PER_SEC));
    out
}

/// `value / unit` with trailing fractional zeros trimmed.
fn decimal(value: u128, unit: u128) -> String {
    let (whole, frac) = (value / unit, value % unit);
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Rounds half away from zero to a multiple of `unit`.
pub fn round_to(d: Duration, unit: Duration) -> Duration {
    let unit = unit.as_nanos();
    if unit == 0 {
        return d;
    }
    let nanos = d.as_nanos();
    let rem = nanos % unit;
    let rounded = if rem * 2 >= unit {
        nanos - rem + unit
    } else {
        nanos - rem
    };
    from_nanos(rounded).unwrap_or(Duration::MAX)
}
