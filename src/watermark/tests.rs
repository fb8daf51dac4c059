//! Tests for watermark module

use super::*;
use serde_json::json;
use test_case::test_case;

// ============================================================================
// Parsing Tests
// ============================================================================

#[test_case("2024-01-10T00:00:00.000000Z", "2024-01-10T00:00:00.000000Z" ; "canonical")]
#[test_case("2024-01-10T00:00:00Z", "2024-01-10T00:00:00.000000Z" ; "rfc3339 without fraction")]
#[test_case("2020-08-25T13:17:36-07:00", "2020-08-25T20:17:36.000000Z" ; "negative offset")]
#[test_case("2020-08-25T13:17:36+0200", "2020-08-25T11:17:36.000000Z" ; "compact offset")]
#[test_case("2024-01-09", "2024-01-09T00:00:00.000000Z" ; "bare date")]
#[test_case("2024-01-09T12:30:00", "2024-01-09T12:30:00.000000Z" ; "naive datetime")]
#[test_case("2024-01-09 12:30:00.5", "2024-01-09T12:30:00.500000Z" ; "space separated")]
#[test_case("2024-01-09T12:30:00.123456789Z", "2024-01-09T12:30:00.123456Z" ; "nanos truncated")]
fn test_parse_normalizes_to_utc(input: &str, expected: &str) {
    let watermark = Watermark::parse(input).unwrap();
    assert_eq!(watermark.to_string(), expected);
}

#[test_case("" ; "empty")]
#[test_case("yesterday" ; "word")]
#[test_case("2024-13-01" ; "bad month")]
#[test_case("1704844800" ; "epoch seconds")]
fn test_parse_rejects_malformed(input: &str) {
    let err = Watermark::parse(input).unwrap_err();
    assert!(matches!(err, Error::MalformedWatermark { .. }));
}

#[test]
fn test_watermark_serde() {
    let watermark: Watermark = serde_json::from_str("\"2024-01-12T00:00:00Z\"").unwrap();
    let json = serde_json::to_string(&watermark).unwrap();
    assert_eq!(json, "\"2024-01-12T00:00:00.000000Z\"");

    let result: std::result::Result<Watermark, _> = serde_json::from_str("\"garbage\"");
    assert!(result.is_err());
}

// ============================================================================
// Comparison Tests
// ============================================================================

#[test]
fn test_compare_across_timezones() {
    let ordering = compare_str("2020-08-25T13:17:36-07:00", "2020-08-25T20:17:36Z").unwrap();
    assert_eq!(ordering, Ordering::Equal);

    // Lexically greater, chronologically smaller
    let ordering = compare_str("2020-08-25T23:00:00+05:00", "2020-08-25T19:00:00Z").unwrap();
    assert_eq!(ordering, Ordering::Less);
}

#[test]
fn test_compare_str_malformed() {
    assert!(compare_str("2024-01-01", "nope").is_err());
}

#[test]
fn test_max_merge() {
    let low = Watermark::parse("2024-01-09").unwrap();
    let high = Watermark::parse("2024-01-12").unwrap();

    assert_eq!(max_merge(None, &low), low);
    assert_eq!(max_merge(Some(&low), &high), high);
    assert_eq!(max_merge(Some(&high), &low), high);
    assert_eq!(max_merge(Some(&high), &high), high);
}

#[test]
fn test_parse_value() {
    let watermark = parse_value(&json!("2024-01-11T00:00:00Z")).unwrap();
    assert_eq!(watermark.to_string(), "2024-01-11T00:00:00.000000Z");

    assert!(matches!(
        parse_value(&json!(1_704_844_800)),
        Err(Error::MalformedWatermark { .. })
    ));
    assert!(matches!(
        parse_value(&json!(null)),
        Err(Error::MalformedWatermark { .. })
    ));
}
