// Dashboard session - owns the indexed dataset and keeps every view in sync
use crate::application::indexed_dataset::{Filter, GroupHandle, IndexedDataset, SumReducer};
use crate::application::map_overlays::{MapOverlays, OverlayKind};
use crate::application::participant_aggregator::{ParticipantAggregator, RemovalPolicy};
use crate::application::widgets::{DataTable, RowChart, SpeedReducer, TimeChart, Widget, WidgetView};
use crate::domain::dashboard::{DashboardSnapshot, TimeChartView, TableView, WidgetFilter};
use crate::domain::key::{Key, KeyKind};
use crate::domain::metric::SummaryMetric;
use crate::domain::record::Record;
use crate::domain::stats::ParticipantStats;
use crate::error::DashboardError;

pub const TIME_CHART: &str = "time-chart";
pub const ROUTE_LENGTH_CHART: &str = "routelength-row-chart";
pub const DURATION_CHART: &str = "duration-row-chart";
pub const AVG_SPEED_CHART: &str = "avgSpeed-row-chart";
pub const STOPS_CHART: &str = "stops-row-chart";
pub const DATA_TABLE: &str = "data-table";

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub removal: RemovalPolicy,
    pub map_center: [f64; 2],
    pub map_zoom: u8,
    pub visible_overlays: Vec<OverlayKind>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            removal: RemovalPolicy::default(),
            map_center: [51.94615, 7.61479],
            map_zoom: 14,
            visible_overlays: Vec::new(),
        }
    }
}

fn participant_key(record: &Record) -> Key {
    Key::Text(record.participant.clone())
}

fn record_speed(record: &Record) -> f64 {
    record.speed
}

/// One interactive session over a loaded dataset.
///
/// Every widget filters through its own dimension. After any filter change
/// all widgets redraw and the visible map overlays are rebuilt from the
/// active records, synchronously, before the call returns.
pub struct Dashboard {
    dataset: IndexedDataset<Record>,
    summary: GroupHandle<ParticipantAggregator>,
    widgets: Vec<Box<dyn Widget>>,
    map: MapOverlays,
}

impl Dashboard {
    pub fn new(records: Vec<Record>, options: DashboardOptions) -> Result<Self, DashboardError> {
        let mut dataset = IndexedDataset::new(records);

        let time = dataset.dimension(|r| Key::Time(r.timestamp))?;
        let summary_dim = dataset.dimension(participant_key)?;
        let route_dim = dataset.dimension(participant_key)?;
        let duration_dim = dataset.dimension(participant_key)?;
        let avg_speed_dim = dataset.dimension(participant_key)?;
        let stops_dim = dataset.dimension(participant_key)?;

        let speed_by_time: GroupHandle<SpeedReducer> = dataset.group(
            time,
            Key::clone,
            SumReducer::new(record_speed as fn(&Record) -> f64),
        )?;
        let summary = dataset.group(
            summary_dim,
            Key::clone,
            ParticipantAggregator::new(options.removal),
        )?;

        let domain = match (dataset.bottom(time, 1)?.first(), dataset.top(time, 1)?.first()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        };

        let widgets: Vec<Box<dyn Widget>> = vec![
            Box::new(TimeChart::new(TIME_CHART, time, speed_by_time, domain)),
            Box::new(RowChart::new(ROUTE_LENGTH_CHART, route_dim, summary, SummaryMetric::RouteLength)),
            Box::new(RowChart::new(DURATION_CHART, duration_dim, summary, SummaryMetric::Duration)),
            Box::new(RowChart::new(AVG_SPEED_CHART, avg_speed_dim, summary, SummaryMetric::AvgSpeed)),
            Box::new(RowChart::new(STOPS_CHART, stops_dim, summary, SummaryMetric::Stops)),
            Box::new(DataTable::new(DATA_TABLE, summary_dim, summary)),
        ];

        let map = MapOverlays::new(options.map_center, options.map_zoom, &options.visible_overlays);

        let mut dashboard = Self {
            dataset,
            summary,
            widgets,
            map,
        };
        dashboard.broadcast()?;
        tracing::info!(
            records = dashboard.dataset.len(),
            widgets = dashboard.widgets.len(),
            "dashboard rendered"
        );
        Ok(dashboard)
    }

    pub fn records(&self) -> &[Record] {
        self.dataset.records()
    }

    pub fn key_kind(&self, widget_id: &str) -> Result<KeyKind, DashboardError> {
        Ok(self.widget(widget_id)?.key_kind())
    }

    pub fn apply_filter(&mut self, widget_id: &str, filter: Filter) -> Result<(), DashboardError> {
        let dimension = self.widget(widget_id)?.dimension();
        tracing::debug!(widget = widget_id, ?filter, "filter changed");
        self.dataset.filter(dimension, filter)?;
        self.broadcast()
    }

    pub fn clear_filter(&mut self, widget_id: &str) -> Result<(), DashboardError> {
        self.apply_filter(widget_id, Filter::All)
    }

    pub fn reset_filters(&mut self) -> Result<(), DashboardError> {
        self.dataset.filter_all()?;
        self.broadcast()
    }

    pub fn set_layer_visible(&mut self, layer: &str, visible: bool) -> Result<(), DashboardError> {
        let kind = OverlayKind::from_name(layer)
            .ok_or_else(|| DashboardError::UnknownLayer(layer.to_string()))?;
        let active = self.dataset.active_records();
        self.map.set_visible(kind, visible, &active);
        Ok(())
    }

    /// Summary of one participant over the records its group currently sees.
    pub fn participant_stats(&self, participant: &str) -> Result<&ParticipantStats, DashboardError> {
        self.dataset
            .group_value(&self.summary, &Key::text(participant))?
            .ok_or_else(|| DashboardError::UnknownParticipant(participant.to_string()))
    }

    #[cfg(test)]
    pub fn map(&self) -> &MapOverlays {
        &self.map
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let mut time_chart = TimeChartView::default();
        let mut row_charts = Vec::new();
        let mut table = TableView::default();
        for widget in &self.widgets {
            match widget.view() {
                WidgetView::Time(view) => time_chart = view,
                WidgetView::Row(view) => row_charts.push(view),
                WidgetView::Table(view) => table = view,
            }
        }

        let filters = self
            .widgets
            .iter()
            .filter_map(|w| {
                let filter = self.dataset.current_filter(w.dimension()).ok()?;
                (!filter.is_all()).then(|| WidgetFilter {
                    widget: w.id().to_string(),
                    filter: serde_json::to_value(filter).unwrap_or_default(),
                })
            })
            .collect();

        DashboardSnapshot {
            total_records: self.dataset.len(),
            active_records: self.dataset.active_count(),
            filters,
            time_chart,
            row_charts,
            table,
            map: self.map.view(),
        }
    }

    fn widget(&self, widget_id: &str) -> Result<&dyn Widget, DashboardError> {
        self.widgets
            .iter()
            .find(|w| w.id() == widget_id)
            .map(|w| w.as_ref())
            .ok_or_else(|| DashboardError::UnknownWidget(widget_id.to_string()))
    }

    fn broadcast(&mut self) -> Result<(), DashboardError> {
        for widget in self.widgets.iter_mut() {
            widget.redraw(&self.dataset)?;
        }
        let active = self.dataset.active_records();
        self.map.refresh(&active);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn sample(participant: &str, minute: i64, lat: f64, speed: f64, heading: f64) -> Record {
        Record::new(participant, at(minute), lat, 7.61, speed, heading).with_interactions(1, 2)
    }

    fn records() -> Vec<Record> {
        vec![
            sample("Group-1", 0, 51.940, 0.0, 10.0),
            sample("Group-1", 30, 51.960, 2.0, 100.0),
            sample("Group-1", 60, 51.980, 0.0, 200.0),
            sample("Group-2", 0, 51.900, 1.0, 300.0),
            sample("Group-2", 60, 51.905, 1.0, 300.0),
            sample("Group-3", 45, 51.950, 0.0, 361.0),
        ]
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(records(), DashboardOptions::default()).unwrap()
    }

    fn revisions(snapshot: &DashboardSnapshot) -> Vec<usize> {
        std::iter::once(snapshot.time_chart.revision)
            .chain(snapshot.row_charts.iter().map(|c| c.revision))
            .chain(std::iter::once(snapshot.table.revision))
            .collect()
    }

    fn rows(snapshot: &DashboardSnapshot, id: &str) -> Vec<(String, String)> {
        snapshot
            .row_charts
            .iter()
            .find(|c| c.id == id)
            .unwrap()
            .rows
            .iter()
            .map(|r| (r.key.clone(), r.label.clone()))
            .collect()
    }

    #[test]
    fn test_initial_render() {
        let dashboard = dashboard();
        let snapshot = dashboard.snapshot();

        assert_eq!(snapshot.total_records, 6);
        assert_eq!(snapshot.active_records, 6);
        assert!(snapshot.filters.is_empty());
        assert_eq!(snapshot.time_chart.domain, Some((at(0), at(60))));
        assert_eq!(snapshot.time_chart.points.len(), 4);
        assert_eq!(snapshot.row_charts.len(), 4);
        assert_eq!(revisions(&snapshot), vec![1; 6]);

        let route = rows(&snapshot, ROUTE_LENGTH_CHART);
        assert_eq!(route[0], ("Group-1".to_string(), "4.45".to_string()));
        assert_eq!(route[2], ("Group-3".to_string(), "N/A".to_string()));
    }

    #[test]
    fn test_row_chart_ties_keep_key_order() {
        let snapshot = dashboard().snapshot();
        let stops = rows(&snapshot, STOPS_CHART);
        let keys: Vec<&str> = stops.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Group-1", "Group-3", "Group-2"]);
    }

    #[test]
    fn test_single_sample_participant_avg_speed_is_na() {
        let dashboard = dashboard();
        let stats = dashboard.participant_stats("Group-3").unwrap();
        assert_eq!(stats.avg_speed_kmh, None);

        let snapshot = dashboard.snapshot();
        let avg = rows(&snapshot, AVG_SPEED_CHART);
        assert!(avg.contains(&("Group-3".to_string(), "N/A".to_string())));
        let table_row = snapshot.table.rows.iter().find(|r| r[0] == "Group-3").unwrap();
        assert_eq!(table_row[3], "N/A");
    }

    #[test]
    fn test_table_rows_are_unique_and_sorted() {
        let snapshot = dashboard().snapshot();
        let names: Vec<&str> = snapshot.table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["Group-1", "Group-2", "Group-3"]);
        assert_eq!(snapshot.table.columns.len(), 7);
        assert_eq!(snapshot.table.rows[0][1], "4.45");
        assert_eq!(snapshot.table.rows[0][2], "60.00");
        assert_eq!(snapshot.table.rows[0][4], "2");
        assert_eq!(snapshot.table.rows[0][5], "3");
    }

    #[test]
    fn test_filter_fans_out_to_every_widget_and_visible_layers() {
        let mut dashboard = Dashboard::new(
            records(),
            DashboardOptions {
                visible_overlays: vec![OverlayKind::Heatmap],
                ..Default::default()
            },
        )
        .unwrap();

        dashboard
            .apply_filter(
                TIME_CHART,
                Filter::Range { from: Key::Time(at(0)), to: Key::Time(at(31)) },
            )
            .unwrap();

        assert_eq!(revisions(&dashboard.snapshot()), vec![2; 6]);
        assert_eq!(dashboard.map().rebuilds(OverlayKind::Heatmap), 2);
        assert_eq!(dashboard.map().rebuilds(OverlayKind::HeadingPoints), 0);
        assert_eq!(dashboard.map().markers(OverlayKind::Heatmap).len(), 3);

        let stats = dashboard.participant_stats("Group-1").unwrap();
        assert_eq!(stats.record_count, 2);
        assert_eq!(stats.total_duration_minutes, 30.0);

        let group3 = dashboard.participant_stats("Group-3").unwrap();
        assert_eq!(group3, &ParticipantStats::default());

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.active_records, 3);
        assert_eq!(snapshot.filters.len(), 1);
        assert_eq!(snapshot.filters[0].widget, TIME_CHART);
        let names: Vec<&str> = snapshot.table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["Group-1", "Group-2"]);
    }

    #[test]
    fn test_two_widget_filters_intersect_in_any_order() {
        let time_filter = Filter::Range { from: Key::Time(at(30)), to: Key::Time(at(61)) };
        let participant_filter = Filter::In {
            keys: [Key::text("Group-1"), Key::text("Group-3")].into_iter().collect(),
        };

        let mut first = dashboard();
        first.apply_filter(TIME_CHART, time_filter.clone()).unwrap();
        first.apply_filter(STOPS_CHART, participant_filter.clone()).unwrap();

        let mut second = dashboard();
        second.apply_filter(STOPS_CHART, participant_filter).unwrap();
        second.apply_filter(TIME_CHART, time_filter).unwrap();

        for dashboard in [&first, &second] {
            assert_eq!(dashboard.snapshot().active_records, 3);
            let g1 = dashboard.participant_stats("Group-1").unwrap();
            assert_eq!(g1.record_count, 2);
            assert_eq!(g1.earliest_timestamp, Some(at(30)));
            let g2 = dashboard.participant_stats("Group-2").unwrap();
            assert!(g2.is_empty());
        }
        assert_eq!(
            rows(&first.snapshot(), ROUTE_LENGTH_CHART),
            rows(&second.snapshot(), ROUTE_LENGTH_CHART)
        );
    }

    #[test]
    fn test_reset_filters_restores_everything() {
        let mut dashboard = dashboard();
        let before = dashboard.participant_stats("Group-1").unwrap().clone();

        dashboard
            .apply_filter(ROUTE_LENGTH_CHART, Filter::Exact { key: Key::text("Group-2") })
            .unwrap();
        assert!(dashboard.participant_stats("Group-1").unwrap().is_empty());

        dashboard.reset_filters().unwrap();
        assert_eq!(dashboard.participant_stats("Group-1").unwrap(), &before);
        assert!(dashboard.snapshot().filters.is_empty());
    }

    #[test]
    fn test_reset_policy_zeroes_partially_filtered_participant() {
        let mut dashboard = Dashboard::new(
            records(),
            DashboardOptions {
                removal: RemovalPolicy::Reset,
                ..Default::default()
            },
        )
        .unwrap();
        dashboard
            .apply_filter(TIME_CHART, Filter::Range { from: Key::Time(at(0)), to: Key::Time(at(31)) })
            .unwrap();

        let stats = dashboard.participant_stats("Group-1").unwrap();
        assert_eq!(stats, &ParticipantStats::default());
    }

    #[test]
    fn test_layer_toggle_and_unknown_names() {
        let mut dashboard = dashboard();
        dashboard.set_layer_visible("stop_clusters", true).unwrap();
        assert_eq!(dashboard.map().markers(OverlayKind::StopClusters).len(), 3);

        dashboard.set_layer_visible("stop_clusters", false).unwrap();
        assert!(dashboard.map().markers(OverlayKind::StopClusters).is_empty());

        assert_eq!(
            dashboard.set_layer_visible("satellite", true).unwrap_err(),
            DashboardError::UnknownLayer("satellite".to_string())
        );
        assert_eq!(
            dashboard.apply_filter("pie-chart", Filter::All).unwrap_err(),
            DashboardError::UnknownWidget("pie-chart".to_string())
        );
        assert_eq!(
            dashboard.participant_stats("Group-9").unwrap_err(),
            DashboardError::UnknownParticipant("Group-9".to_string())
        );
    }

    #[test]
    fn test_tied_samples_route_survives_filter_round_trip() {
        let tied = vec![
            sample("Group-1", 0, 51.00, 1.0, 10.0),
            sample("Group-1", 0, 51.10, 1.0, 10.0),
            sample("Group-1", 10, 51.00, 1.0, 10.0),
        ];
        let mut dashboard = Dashboard::new(tied, DashboardOptions::default()).unwrap();
        let before = dashboard.participant_stats("Group-1").unwrap().clone();

        dashboard
            .apply_filter(TIME_CHART, Filter::Range { from: Key::Time(at(5)), to: Key::Time(at(11)) })
            .unwrap();
        assert_eq!(dashboard.participant_stats("Group-1").unwrap().record_count, 1);

        dashboard.clear_filter(TIME_CHART).unwrap();
        assert_eq!(dashboard.participant_stats("Group-1").unwrap(), &before);
        assert_eq!(rows(&dashboard.snapshot(), ROUTE_LENGTH_CHART)[0].1, "22.24");
    }
}
