// Value accessors over participant statistics
use super::stats::ParticipantStats;
use serde::Serialize;

pub const NOT_AVAILABLE: &str = "N/A";

/// Which statistic a row chart or table column reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryMetric {
    RouteLength,
    Duration,
    AvgSpeed,
    Stops,
    PanCount,
    ZoomCount,
}

impl SummaryMetric {
    /// Raw value, `None` when the statistic is undefined.
    pub fn value_of(self, stats: &ParticipantStats) -> Option<f64> {
        match self {
            SummaryMetric::RouteLength => Some(stats.route_length_km),
            SummaryMetric::Duration => Some(stats.total_duration_minutes),
            SummaryMetric::AvgSpeed => stats.avg_speed_kmh,
            SummaryMetric::Stops => Some(stats.stop_count as f64),
            SummaryMetric::PanCount => Some(stats.pan_count as f64),
            SummaryMetric::ZoomCount => Some(stats.zoom_count as f64),
        }
    }

    /// Bar length: undefined and non-finite values draw as zero.
    pub fn chart_value(self, stats: &ParticipantStats) -> f64 {
        match self.value_of(stats) {
            Some(v) if v.is_finite() => v,
            _ => 0.0,
        }
    }

    /// Display text. Zero, undefined and non-finite values read "N/A".
    pub fn format(self, stats: &ParticipantStats) -> String {
        let value = match self.value_of(stats) {
            Some(v) if v.is_finite() && v != 0.0 => v,
            _ => return NOT_AVAILABLE.to_string(),
        };
        if self.is_count() {
            format!("{}", value as u64)
        } else {
            format!("{:.2}", value)
        }
    }

    fn is_count(self) -> bool {
        matches!(
            self,
            SummaryMetric::Stops | SummaryMetric::PanCount | SummaryMetric::ZoomCount
        )
    }

    pub fn title(self) -> &'static str {
        match self {
            SummaryMetric::RouteLength => "Route Length (km)",
            SummaryMetric::Duration => "Duration (min)",
            SummaryMetric::AvgSpeed => "Average Speed (km/h)",
            SummaryMetric::Stops => "Stops",
            SummaryMetric::PanCount => "Pan Count",
            SummaryMetric::ZoomCount => "Zoom Count",
        }
    }
}
