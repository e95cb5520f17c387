// Application layer - indexing, aggregation and the dashboard session
pub mod dashboard_service;
pub mod dataset_loader;
pub mod indexed_dataset;
pub mod map_overlays;
pub mod participant_aggregator;
pub mod record_source;
pub mod widgets;
