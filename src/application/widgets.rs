// Chart and table widgets bound to the indexed dataset
use crate::application::indexed_dataset::{DimensionId, GroupHandle, IndexedDataset, SumReducer};
use crate::application::participant_aggregator::ParticipantAggregator;
use crate::domain::dashboard::{RowChartView, RowView, TableView, TimeChartView, TimePoint};
use crate::domain::key::{Key, KeyKind};
use crate::domain::metric::{NOT_AVAILABLE, SummaryMetric};
use crate::domain::record::Record;
use crate::error::DashboardError;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

pub type SpeedReducer = SumReducer<fn(&Record) -> f64>;

/// Output of a widget's last redraw.
#[derive(Debug, Clone)]
pub enum WidgetView {
    Time(TimeChartView),
    Row(RowChartView),
    Table(TableView),
}

/// A widget filters through one dimension and reads from one group.
pub trait Widget: Send + Sync {
    fn id(&self) -> &str;
    fn dimension(&self) -> DimensionId;
    fn key_kind(&self) -> KeyKind;
    fn redraw(&mut self, dataset: &IndexedDataset<Record>) -> Result<(), DashboardError>;
    fn view(&self) -> WidgetView;
}

/// Speed summed per timestamp over a fixed time domain.
pub struct TimeChart {
    dimension: DimensionId,
    group: GroupHandle<SpeedReducer>,
    view: TimeChartView,
}

impl TimeChart {
    pub fn new(
        id: &str,
        dimension: DimensionId,
        group: GroupHandle<SpeedReducer>,
        domain: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Self {
        Self {
            dimension,
            group,
            view: TimeChartView {
                id: id.to_string(),
                title: "Speed by Time".to_string(),
                domain,
                points: Vec::new(),
                revision: 0,
            },
        }
    }
}

impl Widget for TimeChart {
    fn id(&self) -> &str {
        &self.view.id
    }

    fn dimension(&self) -> DimensionId {
        self.dimension
    }

    fn key_kind(&self) -> KeyKind {
        KeyKind::Time
    }

    fn redraw(&mut self, dataset: &IndexedDataset<Record>) -> Result<(), DashboardError> {
        self.view.points = dataset
            .group_all(&self.group)?
            .into_iter()
            .filter_map(|(key, value)| match key {
                Key::Time(time) => Some(TimePoint {
                    time: *time,
                    value: *value,
                }),
                _ => None,
            })
            .collect();
        self.view.revision += 1;
        Ok(())
    }

    fn view(&self) -> WidgetView {
        WidgetView::Time(self.view.clone())
    }
}

/// One bar per participant, longest first.
pub struct RowChart {
    dimension: DimensionId,
    summary: GroupHandle<ParticipantAggregator>,
    view: RowChartView,
}

impl RowChart {
    pub fn new(
        id: &str,
        dimension: DimensionId,
        summary: GroupHandle<ParticipantAggregator>,
        metric: SummaryMetric,
    ) -> Self {
        Self {
            dimension,
            summary,
            view: RowChartView {
                id: id.to_string(),
                title: metric.title().to_string(),
                metric,
                rows: Vec::new(),
                revision: 0,
            },
        }
    }
}

impl Widget for RowChart {
    fn id(&self) -> &str {
        &self.view.id
    }

    fn dimension(&self) -> DimensionId {
        self.dimension
    }

    fn key_kind(&self) -> KeyKind {
        KeyKind::Text
    }

    fn redraw(&mut self, dataset: &IndexedDataset<Record>) -> Result<(), DashboardError> {
        let metric = self.view.metric;
        let mut rows: Vec<RowView> = dataset
            .group_all(&self.summary)?
            .into_iter()
            .map(|(key, stats)| RowView {
                key: key.to_string(),
                value: metric.chart_value(stats),
                label: metric.format(stats),
            })
            .collect();
        // Stable, so equal values stay in key order.
        rows.sort_by(|a, b| b.value.total_cmp(&a.value));

        self.view.rows = rows;
        self.view.revision += 1;
        Ok(())
    }

    fn view(&self) -> WidgetView {
        WidgetView::Row(self.view.clone())
    }
}

const TABLE_METRICS: [SummaryMetric; 6] = [
    SummaryMetric::RouteLength,
    SummaryMetric::Duration,
    SummaryMetric::AvgSpeed,
    SummaryMetric::Stops,
    SummaryMetric::PanCount,
    SummaryMetric::ZoomCount,
];

/// Participant summary table: one row per participant that still has
/// active records, ascending by participant.
pub struct DataTable {
    dimension: DimensionId,
    summary: GroupHandle<ParticipantAggregator>,
    view: TableView,
}

impl DataTable {
    pub fn new(id: &str, dimension: DimensionId, summary: GroupHandle<ParticipantAggregator>) -> Self {
        let columns = std::iter::once("Participant")
            .chain(TABLE_METRICS.iter().map(|m| m.title()))
            .map(str::to_string)
            .collect();
        Self {
            dimension,
            summary,
            view: TableView {
                id: id.to_string(),
                columns,
                rows: Vec::new(),
                revision: 0,
            },
        }
    }
}

impl Widget for DataTable {
    fn id(&self) -> &str {
        &self.view.id
    }

    fn dimension(&self) -> DimensionId {
        self.dimension
    }

    fn key_kind(&self) -> KeyKind {
        KeyKind::Text
    }

    fn redraw(&mut self, dataset: &IndexedDataset<Record>) -> Result<(), DashboardError> {
        let participants: BTreeSet<&str> = dataset
            .top(self.dimension, usize::MAX)?
            .into_iter()
            .map(|r| r.participant.as_str())
            .collect();

        let mut rows = Vec::with_capacity(participants.len());
        for participant in participants {
            let stats = dataset.group_value(&self.summary, &Key::text(participant))?;
            let mut row = vec![participant.to_string()];
            row.extend(TABLE_METRICS.iter().map(|metric| match stats {
                Some(stats) => metric.format(stats),
                None => NOT_AVAILABLE.to_string(),
            }));
            rows.push(row);
        }

        self.view.rows = rows;
        self.view.revision += 1;
        Ok(())
    }

    fn view(&self) -> WidgetView {
        WidgetView::Table(self.view.clone())
    }
}
