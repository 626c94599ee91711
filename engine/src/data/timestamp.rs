// Timestamp column detection and normalization.
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const TIME_KEYWORDS: [&str; 3] = ["time", "date", "timestamp"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Index of the time column: the first header mentioning a time keyword,
/// otherwise the first column.
pub fn find_time_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|header| {
            let lower = header.to_lowercase();
            TIME_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .or_else(|| (!headers.is_empty()).then_some(0))
}

/// Normalizes a raw timestamp column. `None` marks a value that could not be parsed.
///
/// The column is read as epoch seconds only if every value is numeric;
/// otherwise each value is parsed on its own as a date/time string.
pub fn normalize_column<S: AsRef<str>>(raw: &[S]) -> Vec<Option<NaiveDateTime>> {
    let epoch: Option<Vec<f64>> = raw.iter().map(|value| parse_epoch(value.as_ref())).collect();
    match epoch {
        Some(seconds) => seconds.into_iter().map(from_epoch_seconds).collect(),
        None => raw.iter().map(|value| parse_datetime(value.as_ref())).collect(),
    }
}

fn parse_epoch(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn from_epoch_seconds(seconds: f64) -> Option<NaiveDateTime> {
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos).map(|dt| dt.naive_utc())
}

pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_time_column_by_keyword() {
        assert_eq!(find_time_column(&headers(&["Open", "Close", "Date"])), Some(2));
        assert_eq!(find_time_column(&headers(&["Price", "UpdateTime"])), Some(1));
        assert_eq!(find_time_column(&headers(&["TIMESTAMP", "Price"])), Some(0));
    }

    #[test]
    fn test_find_time_column_defaults_to_first() {
        assert_eq!(find_time_column(&headers(&["Ticker", "Price"])), Some(0));
        assert_eq!(find_time_column(&[]), None);
    }

    #[test]
    fn test_all_numeric_column_is_epoch_seconds() {
        let parsed = normalize_column(&["1704067200", "1704153600.5"]);
        assert_eq!(parsed[0], Some(ts("2024-01-01 00:00:00")));
        let second = parsed[1].unwrap();
        assert_eq!(second.and_utc().timestamp_millis(), 1_704_153_600_500);
    }

    #[test]
    fn test_string_column_parses_per_value() {
        let parsed = normalize_column(&["2024-01-01 10:30:00", "2024-01-02", "garbage", "", "2024-01-03T08:00:00Z"]);
        assert_eq!(parsed[0], Some(ts("2024-01-01 10:30:00")));
        assert_eq!(parsed[1], Some(ts("2024-01-02 00:00:00")));
        assert_eq!(parsed[2], None);
        assert_eq!(parsed[3], None);
        assert_eq!(parsed[4], Some(ts("2024-01-03 08:00:00")));
    }

    #[test]
    fn test_mixed_column_falls_back_to_strings() {
        // One text value forces per-value parsing, so the bare number is invalid.
        let parsed = normalize_column(&["1704067200", "2024-01-01 00:00:00"]);
        assert_eq!(parsed, vec![None, Some(ts("2024-01-01 00:00:00"))]);
    }

    #[test]
    fn test_offsets_convert_to_utc() {
        assert_eq!(parse_datetime("2024-05-01 12:00:00+02:00"), Some(ts("2024-05-01 10:00:00")));
        assert_eq!(parse_datetime("2024-05-01T12:00:00-01:00"), Some(ts("2024-05-01 13:00:00")));
    }

    #[test]
    fn test_slash_layouts() {
        assert_eq!(parse_datetime("2024/05/01 09:15:00"), Some(ts("2024-05-01 09:15:00")));
        assert_eq!(parse_datetime("05/01/2024"), Some(ts("2024-05-01 00:00:00")));
        assert_eq!(parse_datetime("13/45/2024"), None);
    }
}
