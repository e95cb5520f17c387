// Rendered dashboard view models
use super::heading::LegendEntry;
use super::metric::SummaryMetric;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub total_records: usize,
    pub active_records: usize,
    pub filters: Vec<WidgetFilter>,
    pub time_chart: TimeChartView,
    pub row_charts: Vec<RowChartView>,
    pub table: TableView,
    pub map: MapView,
}

#[derive(Debug, Clone, Serialize)]
pub struct WidgetFilter {
    pub widget: String,
    pub filter: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeChartView {
    pub id: String,
    pub title: String,
    pub domain: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub points: Vec<TimePoint>,
    /// Bumped on every redraw.
    pub revision: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub key: String,
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowChartView {
    pub id: String,
    pub title: String,
    pub metric: SummaryMetric,
    pub rows: Vec<RowView>,
    pub revision: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TableView {
    pub id: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub revision: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverlayView {
    pub name: &'static str,
    pub title: &'static str,
    pub visible: bool,
    pub markers: Vec<Marker>,
    /// Number of times the layer has been built.
    pub revision: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseMap {
    pub name: &'static str,
    pub url: &'static str,
    pub max_zoom: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub center: [f64; 2],
    pub zoom: u8,
    pub base_maps: Vec<BaseMap>,
    pub overlays: Vec<OverlayView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Vec<LegendEntry>>,
}
