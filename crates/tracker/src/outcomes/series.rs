use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Observations of one instrument or market, sorted by timestamp.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    points: Vec<(DateTime<Utc>, f64)>,
}

impl TimeSeries {
    pub fn from_points(mut points: Vec<(DateTime<Utc>, f64)>) -> Self {
        // Stable: equal timestamps keep their input order.
        points.sort_by_key(|(ts, _)| *ts);
        Self { points }
    }

    /// Earliest observation at or after `at`, else the latest one before it.
    pub fn nearest(&self, at: DateTime<Utc>) -> Option<f64> {
        let idx = self.points.partition_point(|(ts, _)| *ts < at);
        self.points
            .get(idx)
            .or_else(|| self.points.last())
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Group `(key, ts, value)` observations into one series per key.
pub fn index_series<'a>(
    rows: impl IntoIterator<Item = (&'a str, DateTime<Utc>, f64)>,
) -> HashMap<String, TimeSeries> {
    let mut grouped: HashMap<String, Vec<(DateTime<Utc>, f64)>> = HashMap::new();
    for (key, ts, value) in rows {
        grouped.entry(key.to_string()).or_default().push((ts, value));
    }
    grouped
        .into_iter()
        .map(|(key, points)| (key, TimeSeries::from_points(points)))
        .collect()
}
