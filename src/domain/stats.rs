// Per-participant summary statistics
use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A route vertex. Carries the timestamp and dataset row of the sample it
/// came from so the polyline can be ordered chronologically and a single
/// sample's contribution can be taken back out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedCoordinate {
    #[serde(skip)]
    pub row: usize,
    pub timestamp: DateTime<Utc>,
    pub longitude: f64,
    pub latitude: f64,
}

impl TimedCoordinate {
    pub fn new(row: usize, timestamp: DateTime<Utc>, longitude: f64, latitude: f64) -> Self {
        Self {
            row,
            timestamp,
            longitude,
            latitude,
        }
    }

    fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Route vertices keyed by `(timestamp, row)`: chronological, ties in
/// dataset order, whatever order the samples arrived in.
pub type Route = BTreeMap<(DateTime<Utc>, usize), TimedCoordinate>;

fn serialize_route<S: Serializer>(route: &Route, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(route.values())
}

/// Running statistics for one participant over the currently active records.
///
/// `Default` is the zero-valued accumulator: no extremes, no coordinates,
/// all totals zero and an undefined average speed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStats {
    pub earliest_timestamp: Option<DateTime<Utc>>,
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub total_duration_minutes: f64,
    #[serde(serialize_with = "serialize_route")]
    pub coordinates: Route,
    pub route_length_km: f64,
    /// `None` while the duration is zero.
    pub avg_speed_kmh: Option<f64>,
    pub stop_count: u64,
    pub pan_count: u64,
    pub zoom_count: u64,
    pub record_count: u64,
}

impl ParticipantStats {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    pub fn insert_coordinate(&mut self, coordinate: TimedCoordinate) {
        self.coordinates
            .insert((coordinate.timestamp, coordinate.row), coordinate);
    }

    pub fn remove_coordinate(&mut self, timestamp: DateTime<Utc>, row: usize) -> Option<TimedCoordinate> {
        self.coordinates.remove(&(timestamp, row))
    }

    /// Recompute extremes, duration, route length and average speed from the
    /// coordinates currently held.
    pub fn refresh_derived(&mut self) {
        self.earliest_timestamp = self.coordinates.keys().next().map(|(t, _)| *t);
        self.latest_timestamp = self.coordinates.keys().next_back().map(|(t, _)| *t);
        self.total_duration_minutes = match (self.earliest_timestamp, self.latest_timestamp) {
            (Some(earliest), Some(latest)) => duration_minutes(earliest, latest),
            _ => 0.0,
        };

        self.route_length_km = round2(route_length_km(self.coordinates.values()));
        self.avg_speed_kmh = average_speed_kmh(self.route_length_km, self.total_duration_minutes);
    }
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn duration_minutes(earliest: DateTime<Utc>, latest: DateTime<Utc>) -> f64 {
    let millis = (latest - earliest).num_milliseconds() as f64;
    round2(millis / 60_000.0)
}

/// Great-circle length of the polyline through `coordinates`, in kilometers.
pub fn route_length_km<'a>(coordinates: impl IntoIterator<Item = &'a TimedCoordinate>) -> f64 {
    let points: Vec<Point<f64>> = coordinates.into_iter().map(TimedCoordinate::point).collect();
    points
        .windows(2)
        .map(|w| Haversine::distance(w[0], w[1]))
        .sum::<f64>()
        / 1000.0
}

pub fn average_speed_kmh(route_length_km: f64, duration_minutes: f64) -> Option<f64> {
    if duration_minutes == 0.0 {
        return None;
    }
    Some(route_length_km / (duration_minutes / 60.0))
}
