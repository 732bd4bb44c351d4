use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::models::MetricPoint;
use crate::store::MetricStore;
use crate::window::TimeWindow;

/// Caller supplied point predicate.
pub type Predicate<'a> = &'a dyn Fn(&MetricPoint) -> bool;

/// Sentinel an absent tag compares as.
pub const MISSING_TAG: &str = "undefined";

/// Parses a timestamp to epoch milliseconds.
///
/// Accepts ISO 8601 date-times with or without seconds, with or without an
/// offset (offset-less values are read as UTC), and bare dates. Anything else
/// yields `None`, which every window rejects.
pub fn parse_timestamp(ts: &str) -> Option<i64> {
    const WITH_OFFSET: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"];
    const WITHOUT_OFFSET: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    let ts = ts.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(ts) {
        return Some(parsed.timestamp_millis());
    }
    if let Some(parsed) = WITH_OFFSET
        .iter()
        .find_map(|format| DateTime::parse_from_str(ts, format).ok())
    {
        return Some(parsed.timestamp_millis());
    }
    if let Some(naive) = WITHOUT_OFFSET
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(ts, format).ok())
    {
        return Some(naive.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(ts, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

pub fn in_range(point: &MetricPoint, window: &TimeWindow) -> bool {
    parse_timestamp(&point.timestamp).is_some_and(|millis| window.contains_millis(millis))
}

/// String form of a tag value, as a dashboard would print it.
pub fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => n.as_f64().map(format_number).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Prints a float the way a browser does: whole values without a fraction,
/// very large or very small magnitudes in exponent form.
fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if value.fract() == 0.0 && magnitude < 1e21 {
        return format!("{}", value as i128);
    }
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let text = format!("{:e}", value);
        return match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        };
    }
    format!("{}", value)
}

/// Strict equality of two tag values. Numbers compare by value, so `1` and
/// `1.0` are equal while `1` and `"1"` are not.
pub fn same_tag_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn tag_string(point: &MetricPoint, key: &str) -> Option<String> {
    point.tags.get(key).map(coerce)
}

/// The tag's string form, or `None` when the tag is absent or falsy.
pub fn tag_label(point: &MetricPoint, key: &str) -> Option<String> {
    point
        .tags
        .get(key)
        .filter(|value| is_truthy(value))
        .map(coerce)
}

/// Compares the string form of `point.tags[key]` to `expected`. Absent
/// tags compare as [`MISSING_TAG`].
pub fn matches_tag(point: &MetricPoint, key: &str, expected: &str) -> bool {
    match point.tags.get(key) {
        Some(value) => coerce(value) == expected,
        None => expected == MISSING_TAG,
    }
}

/// Points inside `window` that pass `predicate`, in store order.
pub fn select<'a>(
    points: &'a [MetricPoint],
    window: &TimeWindow,
    predicate: Option<Predicate<'_>>,
) -> Vec<&'a MetricPoint> {
    points
        .iter()
        .filter(|point| in_range(point, window))
        .filter(|point| predicate.map_or(true, |accept| accept(*point)))
        .collect()
}

/// Number of points whose timestamp no window will ever accept.
pub fn count_unparseable(store: &MetricStore) -> usize {
    store
        .observations()
        .filter(|obs| parse_timestamp(&obs.point.timestamp).is_none())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::TimeRange;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_parse_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp_millis();
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T02:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T02:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00+0000"), Some(expected));
        assert_eq!(parse_timestamp("not a time"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_malformed_timestamp_never_in_range() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::resolve(TimeRange::Month, now);
        assert!(!in_range(&MetricPoint::new("yesterday", 1.0), &window));
        assert!(in_range(&MetricPoint::new("2024-01-01T11:00:00Z", 1.0), &window));
    }

    #[test]
    fn test_window_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let window = TimeWindow::resolve(TimeRange::Day, now);
        assert!(in_range(&MetricPoint::new("2024-01-02T00:00:00Z", 1.0), &window));
        assert!(in_range(&MetricPoint::new("2024-01-01T00:00:00Z", 1.0), &window));
        assert!(!in_range(&MetricPoint::new("2023-12-31T23:59:59.999Z", 1.0), &window));
        assert!(!in_range(&MetricPoint::new("2024-01-02T00:00:00.001Z", 1.0), &window));
    }

    #[test]
    fn test_matches_tag_coerces_to_string() {
        let point = MetricPoint::new("2024-01-01T00:00:00Z", 1.0)
            .with_tag("status", "ok")
            .with_tag("code", 200)
            .with_tag("retry", false);

        assert!(matches_tag(&point, "status", "ok"));
        assert!(!matches_tag(&point, "status", "error"));
        assert!(matches_tag(&point, "code", "200"));
        assert!(matches_tag(&point, "retry", "false"));
        assert!(!matches_tag(&point, "cmd", "ping"));
        assert!(matches_tag(&point, "cmd", MISSING_TAG));
    }

    #[test]
    fn test_float_tags_print_like_integers() {
        let point = MetricPoint::new("2024-01-01T00:00:00Z", 1.0)
            .with_tag("status", 1.0)
            .with_tag("code", 200.0)
            .with_tag("ratio", 0.5);

        assert!(matches_tag(&point, "status", "1"));
        assert!(!matches_tag(&point, "status", "1.0"));
        assert!(matches_tag(&point, "code", "200"));
        assert!(matches_tag(&point, "ratio", "0.5"));

        assert_eq!(coerce(&json!(-0.0)), "0");
        assert_eq!(coerce(&json!(1e21)), "1e+21");
        assert_eq!(coerce(&json!(1.5e-7)), "1.5e-7");
        assert_eq!(coerce(&json!(u64::MAX)), u64::MAX.to_string());
    }

    #[test]
    fn test_minute_precision_timestamps_in_range() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::resolve(TimeRange::Day, now);
        for ts in ["2024-01-01T10:00Z", "2024-01-01T10:00", "2024-01-01T10:00:00+0000"] {
            assert!(in_range(&MetricPoint::new(ts, 1.0), &window), "{ts}");
        }
    }

    #[test]
    fn test_same_tag_value() {
        assert!(same_tag_value(&json!(1), &json!(1.0)));
        assert!(same_tag_value(&json!("ok"), &json!("ok")));
        assert!(!same_tag_value(&json!(1), &json!("1")));
        assert!(!same_tag_value(&json!(true), &json!("true")));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("ping")));
    }

    #[test]
    fn test_tag_label() {
        let point = MetricPoint::new("2024-01-01T00:00:00Z", 1.0)
            .with_tag("cmd", "")
            .with_tag("shard", 3);
        assert_eq!(tag_label(&point, "cmd"), None);
        assert_eq!(tag_label(&point, "missing"), None);
        assert_eq!(tag_label(&point, "shard").as_deref(), Some("3"));
        assert_eq!(tag_string(&point, "cmd").as_deref(), Some(""));
    }

    #[test]
    fn test_select_applies_window_and_predicate() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::resolve(TimeRange::Day, now);
        let points = vec![
            MetricPoint::new("2024-01-01T10:00:00Z", 1.0).with_tag("status", "ok"),
            MetricPoint::new("2024-01-01T11:00:00Z", 2.0).with_tag("status", "error"),
            MetricPoint::new("2023-06-01T00:00:00Z", 4.0).with_tag("status", "ok"),
            MetricPoint::new("garbage", 8.0).with_tag("status", "ok"),
        ];

        assert_eq!(select(&points, &window, None).len(), 2);

        let ok = |p: &MetricPoint| matches_tag(p, "status", "ok");
        let selected = select(&points, &window, Some(&ok));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].count, 1.0);
    }
}
