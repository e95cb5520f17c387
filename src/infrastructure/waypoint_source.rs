// Waypoint file source - per-group recordings flattened into feed records
use crate::application::record_source::RecordSource;
use crate::error::LoadError;
use crate::infrastructure::config::GroupFile;
use crate::infrastructure::record_mapper::RawRecord;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WaypointDocument {
    #[serde(default)]
    waypoints: Vec<Waypoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Waypoint {
    #[serde(default)]
    timestamp: Value,
    #[serde(default)]
    task_no: Value,
    #[serde(default)]
    task_category: Value,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    interaction: Interaction,
}

#[derive(Debug, Default, Deserialize)]
struct Position {
    #[serde(default)]
    coords: Coords,
}

#[derive(Debug, Default, Deserialize)]
struct Coords {
    latitude: Option<Value>,
    longitude: Option<Value>,
    altitude: Option<Value>,
    speed: Option<Value>,
    heading: Option<Value>,
    accuracy: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Interaction {
    pan_count: Option<Value>,
    zoom_count: Option<Value>,
    rotation: Option<Value>,
}

/// Flatten one recording. Waypoints without latitude or longitude are dropped;
/// other absent fields become explicit nulls.
pub fn parse_waypoints(participant: &str, json: &str) -> Result<Vec<RawRecord>, serde_json::Error> {
    let document: WaypointDocument = serde_json::from_str(json)?;

    Ok(document
        .waypoints
        .into_iter()
        .enumerate()
        .filter(|(index, wp)| {
            let positioned = wp.position.coords.latitude.is_some() && wp.position.coords.longitude.is_some();
            if !positioned {
                tracing::warn!(participant, index, "dropping waypoint without latitude/longitude");
            }
            positioned
        })
        .map(|(_, wp)| {
            let coords = wp.position.coords;
            let interaction = wp.interaction;
            RawRecord {
                participant: Some(participant.to_string()),
                timestamp: wp.timestamp,
                latitude: coords.latitude,
                longitude: coords.longitude,
                speed: Some(coords.speed.unwrap_or(Value::Null)),
                heading: Some(coords.heading.unwrap_or(Value::Null)),
                pan_count: interaction.pan_count.unwrap_or_default(),
                zoom_count: interaction.zoom_count.unwrap_or_default(),
                altitude: coords.altitude.unwrap_or_default(),
                accuracy: coords.accuracy.unwrap_or_default(),
                task_no: wp.task_no,
                task_category: wp.task_category,
                rotation: interaction.rotation.unwrap_or_default(),
            }
        })
        .collect())
}

/// Reads every configured group file and concatenates their samples.
#[derive(Debug, Clone)]
pub struct WaypointFileSource {
    groups: Vec<GroupFile>,
}

impl WaypointFileSource {
    pub fn new(groups: Vec<GroupFile>) -> Self {
        Self { groups }
    }
}

#[async_trait]
impl RecordSource for WaypointFileSource {
    fn describe(&self) -> String {
        format!("{} waypoint files", self.groups.len())
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, LoadError> {
        let mut records = Vec::new();

        for group in &self.groups {
            let json = tokio::fs::read_to_string(&group.path)
                .await
                .map_err(|source| LoadError::Io {
                    path: group.path.clone(),
                    source,
                })?;

            match parse_waypoints(&group.participant, &json) {
                Ok(waypoints) if waypoints.is_empty() => {
                    tracing::warn!("No valid data for group {}", group.participant);
                }
                Ok(waypoints) => {
                    tracing::debug!("{} waypoints for {}", waypoints.len(), group.participant);
                    records.extend(waypoints);
                }
                Err(e) => {
                    tracing::warn!("Skipping undecodable waypoint file {}: {}", group.path, e);
                }
            }
        }

        Ok(records)
    }
}
