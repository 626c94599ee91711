// Trailing-window filtering and fixed-interval resampling.
use std::ops::Range;

use chrono::{Duration, NaiveDateTime};
use shared::models::{FeatureSeries, TimeFrame, TimeframeSpec};

use super::csv_parser::TimeSeriesTable;
use crate::error::EngineError;

/// Rows kept by a trailing window, anchored to the newest row rather than wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub first_row: usize,
}

/// `None` when the table has no rows.
pub fn trailing_window(table: &TimeSeriesTable, spec: &TimeframeSpec) -> Option<Window> {
    let timestamps = table.timestamps();
    let end = *timestamps.last()?;
    let start = end - Duration::days(spec.window_days);
    let first_row = timestamps.partition_point(|ts| *ts < start);
    Some(Window { start, end, first_row })
}

/// Consecutive row ranges of the window that share a bucket, labelled by the
/// bucket start. The first label is clamped to the window start so that no
/// label precedes the window.
pub fn bucket_rows(table: &TimeSeriesTable, spec: &TimeframeSpec, window: &Window) -> Vec<(NaiveDateTime, Range<usize>)> {
    let timestamps = table.timestamps();
    let mut groups: Vec<(NaiveDateTime, Range<usize>)> = Vec::new();
    for row in window.first_row..timestamps.len() {
        let label = spec.bucket.floor(timestamps[row]).max(window.start);
        if let Some((current, rows)) = groups.last_mut() {
            if *current == label {
                rows.end = row + 1;
                continue;
            }
        }
        groups.push((label, row..row + 1));
    }
    groups
}

/// Mean of `feature` per bucket over the trailing window. Buckets without a
/// single valid value are dropped.
pub fn resample(table: &TimeSeriesTable, feature: &str, timeframe: TimeFrame) -> Result<FeatureSeries, EngineError> {
    let column = table
        .column(feature)
        .ok_or_else(|| EngineError::ColumnAbsent(feature.to_string()))?;
    let spec = timeframe.spec();
    let Some(window) = trailing_window(table, &spec) else {
        return Ok(FeatureSeries::default());
    };

    let points = bucket_rows(table, &spec, &window)
        .into_iter()
        .filter_map(|(label, rows)| {
            let (sum, count) = column[rows]
                .iter()
                .flatten()
                .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
            (count > 0).then(|| (label, sum / count as f64))
        })
        .collect();
    Ok(FeatureSeries { points })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn table(csv: &str) -> TimeSeriesTable {
        TimeSeriesTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_window_anchored_to_latest_row() {
        let t = table("Date,X\n2023-01-01,1\n2024-01-01,2\n2024-06-01,3\n");
        let window = trailing_window(&t, &TimeFrame::Day1.spec()).unwrap();
        assert_eq!(window.end, ts("2024-06-01 00:00:00"));
        assert_eq!(window.start, ts("2023-06-02 00:00:00"));
        assert_eq!(window.first_row, 1);
    }

    #[test]
    fn test_window_start_is_inclusive() {
        let t = table("Date,X\n2024-01-01,1\n2024-01-02,2\n");
        let window = trailing_window(&t, &TimeFrame::Minute1.spec()).unwrap();
        assert_eq!(window.first_row, 0);
    }

    #[test]
    fn test_hourly_mean_skips_blanks() {
        let t = table(
            "Time,Rate\n\
             2024-01-01 10:05:00,1\n\
             2024-01-01 10:35:00,\n\
             2024-01-01 10:50:00,3\n\
             2024-01-01 11:10:00,\n\
             2024-01-01 12:00:00,10\n",
        );
        let series = resample(&t, "Rate", TimeFrame::Hour1).unwrap();
        assert_eq!(
            series.points,
            vec![(ts("2024-01-01 10:00:00"), 2.0), (ts("2024-01-01 12:00:00"), 10.0)]
        );
    }

    #[test]
    fn test_duplicate_timestamps_collapse() {
        let t = table("Date,X\n2024-01-01,1\n2024-01-01,3\n2024-01-02,5\n");
        let series = resample(&t, "X", TimeFrame::Day1).unwrap();
        assert_eq!(series.values().collect::<Vec<_>>(), vec![2.0, 5.0]);
    }

    #[test]
    fn test_labels_stay_inside_window() {
        let t = table(
            "Time,X\n\
             2023-12-31 23:50:00,1\n\
             2024-01-01 13:30:00,2\n\
             2024-01-02 13:30:00,3\n",
        );
        for tf in TimeFrame::all() {
            let series = resample(&t, "X", *tf).unwrap();
            let window = trailing_window(&t, &tf.spec()).unwrap();
            for label in series.timestamps() {
                assert!(label >= window.start && label <= window.end, "{} label {} outside window", tf, label);
            }
        }
    }

    #[test]
    fn test_monthly_buckets() {
        let t = table("Date,X\n2024-01-10,1\n2024-01-20,3\n2024-02-05,6\n");
        let series = resample(&t, "X", TimeFrame::Month1).unwrap();
        assert_eq!(
            series.points,
            vec![(ts("2024-01-01 00:00:00"), 2.0), (ts("2024-02-01 00:00:00"), 6.0)]
        );
    }

    #[test]
    fn test_absent_column_and_empty_table() {
        let t = table("Date,X\n2024-01-01,1\n");
        assert!(matches!(resample(&t, "Y", TimeFrame::Day1), Err(EngineError::ColumnAbsent(_))));

        let empty = table("Date,X\n");
        assert!(resample(&empty, "X", TimeFrame::Day1).unwrap().is_empty());
    }

    #[test]
    fn test_resample_is_idempotent() {
        let t = table("Date,X\n2024-01-01,1\n2024-01-08,2\n2024-01-09,4\n");
        let first = resample(&t, "X", TimeFrame::Week1).unwrap();
        let second = resample(&t, "X", TimeFrame::Week1).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
