// GPS sample domain model
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One GPS sample of a participant, immutable once loaded.
///
/// `speed` and `heading` may be NaN when the feed carried a value that does
/// not coerce to a number. NaN never counts as a stop and poisons any sum it
/// takes part in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub participant: String,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub pan_count: u64,
    pub zoom_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_no: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl Record {
    pub fn new(
        participant: impl Into<String>,
        timestamp: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        speed: f64,
        heading: f64,
    ) -> Self {
        Self {
            participant: participant.into(),
            timestamp,
            latitude,
            longitude,
            speed,
            heading,
            pan_count: 0,
            zoom_count: 0,
            altitude: None,
            accuracy: None,
            task_no: None,
            task_category: None,
            rotation: None,
        }
    }

    pub fn with_interactions(mut self, pan_count: u64, zoom_count: u64) -> Self {
        self.pan_count = pan_count;
        self.zoom_count = zoom_count;
        self
    }

    /// A sample counts as a stop when its speed is zero or negative.
    pub fn is_stopped(&self) -> bool {
        self.speed <= 0.0
    }
}
