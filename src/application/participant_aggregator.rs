// Incremental per-participant reducer
use crate::application::indexed_dataset::Reducer;
use crate::domain::record::Record;
use crate::domain::stats::{ParticipantStats, TimedCoordinate};
use serde::Deserialize;

/// What happens to a participant's statistics when one of its records
/// leaves the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Take back exactly that record's contribution.
    #[default]
    Exact,
    /// Wipe the whole accumulator back to its zero value.
    Reset,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParticipantAggregator {
    policy: RemovalPolicy,
}

impl ParticipantAggregator {
    pub fn new(policy: RemovalPolicy) -> Self {
        Self { policy }
    }
}

impl Reducer<Record> for ParticipantAggregator {
    type Value = ParticipantStats;

    fn initial(&self) -> ParticipantStats {
        ParticipantStats::default()
    }

    fn add(&self, stats: &mut ParticipantStats, row: usize, record: &Record) {
        stats.insert_coordinate(TimedCoordinate::new(
            row,
            record.timestamp,
            record.longitude,
            record.latitude,
        ));

        if record.is_stopped() {
            stats.stop_count += 1;
        }
        stats.pan_count += record.pan_count;
        stats.zoom_count += record.zoom_count;
        stats.record_count += 1;
    }

    fn remove(&self, stats: &mut ParticipantStats, row: usize, record: &Record) {
        if self.policy == RemovalPolicy::Reset {
            *stats = self.initial();
            return;
        }

        if stats.remove_coordinate(record.timestamp, row).is_none() {
            tracing::warn!(row, participant = %record.participant, "removing a record that was never added");
            return;
        }
        stats.record_count = stats.record_count.saturating_sub(1);

        if stats.record_count == 0 {
            *stats = self.initial();
            return;
        }

        if record.is_stopped() {
            stats.stop_count = stats.stop_count.saturating_sub(1);
        }
        stats.pan_count = stats.pan_count.saturating_sub(record.pan_count);
        stats.zoom_count = stats.zoom_count.saturating_sub(record.zoom_count);
    }

    /// Extremes, duration and the geodesic route are settled once per
    /// batch of changes rather than per record.
    fn finish(&self, stats: &mut ParticipantStats) {
        stats.refresh_derived();
    }
}
