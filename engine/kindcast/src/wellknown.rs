//! Well-known structural types: time instants, durations, URLs and IP
//! addresses. Each has a dedicated converter that bypasses generic
//! structural assignment.

use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use url::Url;

use crate::config::Config;
use crate::error::{CastError, CastResult};
use crate::extract;
use crate::format;
use crate::handle::Handle;
use crate::recover;
use crate::resolve;
use crate::types::Type;
use crate::value::Value;

/// Registry of the types with dedicated converters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WellKnown {
    Time,
    Duration,
    Url,
    Ip,
}

impl WellKnown {
    pub const ALL: [WellKnown; 4] = [
        WellKnown::Time,
        WellKnown::Duration,
        WellKnown::Url,
        WellKnown::Ip,
    ];

    /// Exact identity only; a named type defined over a well-known type is
    /// a distinct type.
    pub fn of(ty: &Type) -> Option<WellKnown> {
        match ty {
            Type::Time => Some(WellKnown::Time),
            Type::Duration => Some(WellKnown::Duration),
            Type::Url => Some(WellKnown::Url),
            Type::Ip => Some(WellKnown::Ip),
            _ => None,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            WellKnown::Time => Type::Time,
            WellKnown::Duration => Type::Duration,
            WellKnown::Url => Type::Url,
            WellKnown::Ip => Type::Ip,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WellKnown::Time => "time",
            WellKnown::Duration => "duration",
            WellKnown::Url => "url",
            WellKnown::Ip => "ip",
        }
    }
}

/// Layout tried when parsing time text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeLayout {
    Rfc3339,
    Rfc2822,
    /// A chrono strftime pattern. Patterns without an offset parse as UTC,
    /// patterns without a year fall in year 0, date-only patterns as
    /// midnight and time-only patterns on 0000-01-01.
    Format(Cow<'static, str>),
}

impl TimeLayout {
    pub fn format(pattern: impl Into<String>) -> Self {
        TimeLayout::Format(Cow::Owned(pattern.into()))
    }

    pub fn parse(&self, text: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
        match self {
            TimeLayout::Rfc3339 => DateTime::parse_from_rfc3339(text),
            TimeLayout::Rfc2822 => DateTime::parse_from_rfc2822(text),
            TimeLayout::Format(pattern) => parse_pattern(text, pattern),
        }
    }
}

fn parse_pattern(text: &str, pattern: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let zoned = match DateTime::parse_from_str(text, pattern) {
        Ok(instant) => return Ok(instant),
        Err(err) => err,
    };
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
        return Ok(naive.and_utc().fixed_offset());
    }
    if !pattern.contains("%Y") && !pattern.contains("%y") {
        let dated = format!("0000 {text}");
        if let Ok(naive) = NaiveDateTime::parse_from_str(&dated, &format!("%Y {pattern}")) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, pattern) {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }
    if let Ok(time) = NaiveTime::parse_from_str(text, pattern) {
        if let Some(date) = NaiveDate::from_ymd_opt(0, 1, 1) {
            return Ok(date.and_time(time).and_utc().fixed_offset());
        }
    }
    Err(zoned)
}

static DEFAULT_TIME_LAYOUTS: [TimeLayout; 15] = [
    TimeLayout::Rfc3339,
    TimeLayout::Rfc2822,
    TimeLayout::Format(Cow::Borrowed("%a %b %e %H:%M:%S %Y")),
    TimeLayout::Format(Cow::Borrowed("%a %b %e %H:%M:%S %Z %Y")),
    TimeLayout::Format(Cow::Borrowed("%a %b %d %H:%M:%S %z %Y")),
    TimeLayout::Format(Cow::Borrowed("%d %b %y %H:%M %Z")),
    TimeLayout::Format(Cow::Borrowed("%d %b %y %H:%M %z")),
    TimeLayout::Format(Cow::Borrowed("%A, %d-%b-%y %H:%M:%S %Z")),
    TimeLayout::Format(Cow::Borrowed("%a, %d %b %Y %H:%M:%S %Z")),
    TimeLayout::Format(Cow::Borrowed("%Y-%m-%d %H:%M:%S%.f %z")),
    TimeLayout::Format(Cow::Borrowed("%Y-%m-%dT%H:%M:%S%.f")),
    TimeLayout::Format(Cow::Borrowed("%Y-%m-%d %H:%M:%S%.f")),
    TimeLayout::Format(Cow::Borrowed("%Y-%m-%d")),
    TimeLayout::Format(Cow::Borrowed("%b %e %H:%M:%S%.f")),
    TimeLayout::Format(Cow::Borrowed("%I:%M%p")),
];

/// The built-in layout table used when a configuration lists none.
pub fn default_time_layouts() -> &'static [TimeLayout] {
    &DEFAULT_TIME_LAYOUTS
}

pub const ZERO_TIME_0: &str = "0000-00-00 00:00:00";
pub const ZERO_TIME_1: &str = "0001-01-01 00:00:00";

// Seconds from the unix epoch back to 0001-01-01T00:00:00Z.
const ZERO_TIME_UNIX: i64 = -62_135_596_800;

/// The zero instant, 0001-01-01T00:00:00Z.
pub fn zero_time() -> DateTime<FixedOffset> {
    DateTime::from_timestamp(ZERO_TIME_UNIX, 0)
        .unwrap_or_default()
        .fixed_offset()
}

/// The zero instant, or an instant that renders as a legacy zero-date
/// placeholder in its own offset.
pub fn is_time_zero(time: &DateTime<FixedOffset>) -> bool {
    if time.timestamp() == ZERO_TIME_UNIX && time.timestamp_subsec_nanos() == 0 {
        return true;
    }
    let rendered = time.format("%Y-%m-%d %H:%M:%S").to_string();
    rendered == ZERO_TIME_0 || rendered == ZERO_TIME_1
}

pub fn is_time_text_zero(text: &str) -> bool {
    let text = text.trim();
    if text == ZERO_TIME_0 || text == ZERO_TIME_1 {
        return true;
    }
    parse_time_with(text, default_time_layouts()).is_ok_and(|time| is_time_zero(&time))
}

/// Parse time text against the configured layouts, first match wins.
pub fn parse_time(text: &str, cfg: &Config) -> CastResult<DateTime<FixedOffset>> {
    parse_time_with(text, cfg.time_layouts())
}

fn parse_time_with(text: &str, layouts: &[TimeLayout]) -> CastResult<DateTime<FixedOffset>> {
    let mut last = None;
    for layout in layouts {
        match layout.parse(text) {
            Ok(time) => return Ok(time),
            Err(err) => last = Some(err),
        }
    }
    Err(CastError::parse(
        "time",
        text,
        last.map_or_else(|| "no layout configured".to_string(), |err| err.to_string()),
    ))
}

pub fn extract_time(handle: &Handle, cfg: &Config) -> CastResult<DateTime<FixedOffset>> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || time_of(handle, &cfg))
}

pub(crate) fn time_of(handle: &Handle, cfg: &Config) -> CastResult<DateTime<FixedOffset>> {
    let (resolved, value) = resolved_value(handle)?;
    match value.underlying() {
        Value::Time(time) => Ok(*time),
        Value::String(text) => parse_time(text, cfg),
        _ => parse_time(&extract::string_of(&resolved, cfg)?, cfg),
    }
}

pub fn extract_duration(handle: &Handle, cfg: &Config) -> CastResult<TimeDelta> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || duration_of(handle, &cfg))
}

/// Durations come from the duration type itself, from duration text, or
/// from an integer count of nanoseconds.
pub(crate) fn duration_of(handle: &Handle, cfg: &Config) -> CastResult<TimeDelta> {
    let (resolved, value) = resolved_value(handle)?;
    match value.underlying() {
        Value::Duration(duration) => Ok(*duration),
        Value::String(text) => parse_duration(text).or_else(|err| {
            format::parse_int(text, cfg.base, 64)
                .map(TimeDelta::nanoseconds)
                .map_err(|_| err)
        }),
        _ => extract::int_of(&resolved, cfg).map(TimeDelta::nanoseconds),
    }
}

pub fn extract_url(handle: &Handle, cfg: &Config) -> CastResult<Url> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || url_of(handle, &cfg))
}

pub(crate) fn url_of(handle: &Handle, cfg: &Config) -> CastResult<Url> {
    let (resolved, value) = resolved_value(handle)?;
    let text = match value.underlying() {
        Value::Url(Some(url)) => return Ok(url.clone()),
        Value::Url(None) => return Err(CastError::parse("url", "", "url is unset")),
        Value::String(text) => text.clone(),
        _ => extract::string_of(&resolved, cfg)?,
    };
    Url::parse(&text).map_err(|err| CastError::parse("url", &text, err))
}

pub fn extract_ip(handle: &Handle, cfg: &Config) -> CastResult<IpAddr> {
    let cfg = cfg.clone().normalized();
    recover::guard(&cfg, || ip_of(handle, &cfg))
}

/// Addresses come from address text or from a 4- or 16-byte list.
pub(crate) fn ip_of(handle: &Handle, cfg: &Config) -> CastResult<IpAddr> {
    let (resolved, value) = resolved_value(handle)?;
    let text = match value.underlying() {
        Value::Ip(Some(ip)) => return Ok(*ip),
        Value::Ip(None) => return Err(CastError::parse("ip", "", "address is unset")),
        Value::String(text) => text.clone(),
        other => {
            if let Some(bytes) = extract::list_bytes(other) {
                return ip_from_octets(&bytes);
            }
            extract::string_of(&resolved, cfg)?
        }
    };
    text.parse::<IpAddr>()
        .map_err(|err| CastError::parse("ip", &text, err))
}

fn ip_from_octets(bytes: &[u8]) -> CastResult<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Ok(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Ok(IpAddr::V6(Ipv6Addr::from(octets)).to_canonical());
    }
    Err(CastError::parse(
        "ip",
        &format!("{bytes:?}"),
        format!("expected 4 or 16 octets, found {}", bytes.len()),
    ))
}

fn resolved_value(handle: &Handle) -> CastResult<(Handle, Value)> {
    extract::check_extract_valid(handle)?;
    let resolved = resolve::child_elem(handle);
    let value = resolved
        .get()
        .ok_or_else(|| CastError::InvalidValue("resolved to nothing".into()))?;
    Ok((resolved, value))
}

const NANOSECOND: u64 = 1;
const MICROSECOND: u64 = 1_000 * NANOSECOND;
const MILLISECOND: u64 = 1_000 * MICROSECOND;
const SECOND: u64 = 1_000 * MILLISECOND;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;

/// Parse duration text such as `300ms`, `-1.5h` or `2h45m`.
///
/// Accepted units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`; a bare
/// `0` needs no unit.
pub fn parse_duration(text: &str) -> CastResult<TimeDelta> {
    let fail = |reason: &str| CastError::parse("duration", text, reason);
    let (negative, mut rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(fail("invalid duration"));
    }
    let limit = 1u64 << 63;
    let mut total: u64 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_text, after) = rest.split_at(int_len);
        let mut whole: u64 = 0;
        for digit in int_text.bytes() {
            whole = whole
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(digit - b'0')))
                .filter(|v| *v <= limit)
                .ok_or_else(|| fail("invalid duration"))?;
        }
        rest = after;
        let mut fraction: u64 = 0;
        let mut scale: f64 = 1.0;
        let mut frac_len = 0;
        if let Some(after_point) = rest.strip_prefix('.') {
            frac_len = after_point.bytes().take_while(u8::is_ascii_digit).count();
            let mut overflowed = false;
            for digit in after_point[..frac_len].bytes() {
                if overflowed {
                    continue;
                }
                match fraction
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(u64::from(digit - b'0')))
                    .filter(|v| *v < limit)
                {
                    Some(v) => {
                        fraction = v;
                        scale *= 10.0;
                    }
                    None => overflowed = true,
                }
            }
            rest = &after_point[frac_len..];
        }
        if int_len == 0 && frac_len == 0 {
            return Err(fail("invalid duration"));
        }
        let unit_len = rest
            .find(|ch: char| ch == '.' || ch.is_ascii_digit())
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(fail("missing unit in duration"));
        }
        let (unit_text, after_unit) = rest.split_at(unit_len);
        let unit = match unit_text {
            "ns" => NANOSECOND,
            "us" | "µs" | "μs" => MICROSECOND,
            "ms" => MILLISECOND,
            "s" => SECOND,
            "m" => MINUTE,
            "h" => HOUR,
            _ => return Err(fail("unknown unit in duration")),
        };
        rest = after_unit;
        if whole > limit / unit {
            return Err(CastError::overflow("duration", text));
        }
        let mut part = whole * unit;
        if fraction > 0 {
            part = part
                .checked_add((fraction as f64 * (unit as f64 / scale)) as u64)
                .filter(|v| *v <= limit)
                .ok_or_else(|| CastError::overflow("duration", text))?;
        }
        total = total
            .checked_add(part)
            .filter(|v| *v <= limit)
            .ok_or_else(|| CastError::overflow("duration", text))?;
    }
    if negative {
        let nanos = if total == limit {
            i64::MIN
        } else {
            -(total as i64)
        };
        return Ok(TimeDelta::nanoseconds(nanos));
    }
    if total > i64::MAX as u64 {
        return Err(CastError::overflow("duration", text));
    }
    Ok(TimeDelta::nanoseconds(total as i64))
}

/// Render a duration as `72h3m0.5s`; sub-second durations use the
/// smallest fitting unit (`1.5ms`, `250µs`, `7ns`).
pub fn format_duration(duration: TimeDelta) -> String {
    let nanos = duration.num_nanoseconds().unwrap_or(if duration < TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    });
    let sign = if nanos < 0 { "-" } else { "" };
    let u = nanos.unsigned_abs();
    if u == 0 {
        return "0s".to_string();
    }
    if u < SECOND {
        let (prec, unit) = if u < MICROSECOND {
            (0, "ns")
        } else if u < MILLISECOND {
            (3, "µs")
        } else {
            (6, "ms")
        };
        let (whole, frac) = split_fraction(u, prec);
        return format!("{sign}{whole}{frac}{unit}");
    }
    let (seconds, frac) = split_fraction(u, 9);
    let mut out = format!("{}{frac}s", seconds % 60);
    let minutes = seconds / 60;
    if minutes > 0 {
        out = format!("{}m{out}", minutes % 60);
        let hours = minutes / 60;
        if hours > 0 {
            out = format!("{hours}h{out}");
        }
    }
    format!("{sign}{out}")
}

// Integer part of `value / 10^prec` and the fraction text, without trailing
// zeros and empty when the fraction is zero.
fn split_fraction(value: u64, prec: u32) -> (u64, String) {
    let pow = 10u64.pow(prec);
    let fraction = value % pow;
    if fraction == 0 {
        return (value / pow, String::new());
    }
    let digits = format!("{fraction:0width$}", width = prec as usize);
    (value / pow, format!(".{}", digits.trim_end_matches('0')))
}
