use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Timelike};
use kindcast::{
    extract_duration, extract_ip, extract_string, extract_time, extract_url, format_duration,
    parse_duration, parse_time, CastError, Config, Handle, Type, Value,
};

fn cfg() -> Config {
    Config::default()
}

// ============================================================================
// Time
// ============================================================================

#[test]
fn time_from_rfc3339_text() {
    let text = "2024-03-01T10:00:00+02:00";
    let time = extract_time(&Handle::of(text), &cfg()).expect("rfc3339");
    assert_eq!(time, DateTime::parse_from_rfc3339(text).expect("fixture"));
}

#[test]
fn time_from_date_only_text_is_utc_midnight() {
    let time = parse_time("2024-03-01", &cfg()).expect("date layout");
    let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
        .expect("date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight")
        .and_utc()
        .fixed_offset();
    assert_eq!(time, expected);
}

#[test]
fn stamp_text_without_a_year() {
    let time = parse_time("Jan  2 15:04:05", &cfg()).expect("stamp");
    assert_eq!((time.year(), time.month(), time.day()), (0, 1, 2));
    assert_eq!((time.hour(), time.minute(), time.second()), (15, 4, 5));

    let precise = parse_time("Mar 14 01:59:26.535897", &cfg()).expect("stamp micro");
    assert_eq!((precise.month(), precise.day()), (3, 14));
    assert_eq!(precise.nanosecond(), 535_897_000);
}

#[test]
fn time_from_time_value_and_pointer() {
    let instant = DateTime::parse_from_rfc3339("1999-12-31T23:59:59Z").expect("fixture");
    let pointer = Value::pointer_to(Value::from(instant));
    assert_eq!(
        extract_time(&Handle::of(pointer), &cfg()).expect("pointer"),
        instant
    );
}

#[test]
fn unparseable_time_text() {
    let err = extract_time(&Handle::of("next tuesday"), &cfg()).expect_err("nonsense");
    assert!(matches!(err, CastError::ParseFailure { target: "time", .. }));
}

#[test]
fn time_renders_as_rfc3339() {
    let instant = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z").expect("fixture");
    assert_eq!(
        extract_string(&Handle::of(Value::from(instant)), &cfg()).expect("render"),
        "2024-03-01T10:00:00Z"
    );
}

// ============================================================================
// Duration
// ============================================================================

#[test]
fn duration_from_text_and_numbers() {
    assert_eq!(
        extract_duration(&Handle::of("1h30m"), &cfg()).expect("text"),
        TimeDelta::minutes(90)
    );
    assert_eq!(
        extract_duration(&Handle::of(1500i64), &cfg()).expect("nanoseconds"),
        TimeDelta::nanoseconds(1500)
    );
    // bare digits are a nanosecond count
    assert_eq!(
        extract_duration(&Handle::of("1500"), &cfg()).expect("digits"),
        TimeDelta::nanoseconds(1500)
    );
    assert_eq!(
        extract_duration(&Handle::of(Type::Duration.zero()), &cfg()).expect("zero"),
        TimeDelta::zero()
    );
}

#[test]
fn duration_rejects_unknown_units() {
    let err = extract_duration(&Handle::of("3 fortnights"), &cfg()).expect_err("units");
    assert!(matches!(err, CastError::ParseFailure { target: "duration", .. }));
}

#[test]
fn rendered_durations_parse_back() {
    for nanos in [1i64, 999, 1_500_000, 2_700_000_000_000, -45_000_000_000, 9_900_500_000] {
        let duration = TimeDelta::nanoseconds(nanos);
        let text = format_duration(duration);
        assert_eq!(parse_duration(&text).expect(&text), duration, "{text}");
    }
}

#[test]
fn duration_renders_through_string_extraction() {
    let value = Value::from(TimeDelta::milliseconds(2500));
    assert_eq!(extract_string(&Handle::of(value), &cfg()).expect("render"), "2.5s");
}

// ============================================================================
// URL and IP
// ============================================================================

#[test]
fn url_from_text() {
    let url = extract_url(&Handle::of("https://example.com/a?b=1"), &cfg()).expect("url");
    assert_eq!(url.host_str(), Some("example.com"));
    assert_eq!(url.query(), Some("b=1"));
}

#[test]
fn unset_url_is_an_error() {
    let err = extract_url(&Handle::of(Type::Url.zero()), &cfg()).expect_err("unset");
    assert!(matches!(err, CastError::ParseFailure { target: "url", .. }));
    assert!(extract_url(&Handle::of("not a url"), &cfg()).is_err());
}

#[test]
fn ip_from_text_and_octets() {
    assert_eq!(
        extract_ip(&Handle::of("10.0.0.1"), &cfg()).expect("v4 text"),
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
    );
    assert_eq!(
        extract_ip(&Handle::of("::1"), &cfg()).expect("v6 text"),
        IpAddr::V6(Ipv6Addr::LOCALHOST)
    );
    let octets = Value::slice(
        Type::U8,
        [192u8, 168, 0, 1].into_iter().map(Value::from).collect(),
    );
    assert_eq!(
        extract_ip(&Handle::of(octets), &cfg()).expect("octets"),
        IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1))
    );
}

#[test]
fn ip_rejects_odd_octet_counts() {
    let octets = Value::slice(Type::U8, vec![Value::from(1u8); 3]);
    let err = extract_ip(&Handle::of(octets), &cfg()).expect_err("three octets");
    assert!(matches!(err, CastError::ParseFailure { target: "ip", .. }));
}
