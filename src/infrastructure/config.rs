use crate::application::participant_aggregator::RemovalPolicy;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub source: SourceSettings,
    #[serde(default)]
    pub aggregation: AggregationSettings,
    #[serde(default)]
    pub map: MapSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Http,
    Waypoints,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub groups: Vec<GroupFile>,
}

impl SourceSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GroupFile {
    pub participant: String,
    pub path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AggregationSettings {
    #[serde(default)]
    pub removal: RemovalPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapSettings {
    pub center: [f64; 2],
    pub zoom: u8,
    #[serde(default)]
    pub visible_overlays: Vec<String>,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center: [51.94615, 7.61479],
            zoom: 14,
            visible_overlays: Vec::new(),
        }
    }
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard"))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: DashboardConfig = settings.try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &DashboardConfig) -> anyhow::Result<()> {
    match config.source.kind {
        SourceKind::Http if config.source.url.is_none() => {
            anyhow::bail!("source.url is required for an http source")
        }
        SourceKind::Waypoints if config.source.groups.is_empty() => {
            anyhow::bail!("source.groups must list at least one waypoint file")
        }
        _ => Ok(()),
    }
}
