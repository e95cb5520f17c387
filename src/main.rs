// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    Router,
    routing::{delete, get, put},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::{Dashboard, DashboardOptions};
use crate::application::dataset_loader::DatasetLoader;
use crate::application::map_overlays::OverlayKind;
use crate::application::record_source::RecordSource;
use crate::infrastructure::config::{DashboardConfig, SourceKind, load_dashboard_config};
use crate::infrastructure::http_source::HttpRecordSource;
use crate::infrastructure::waypoint_source::WaypointFileSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    delete_filter, delete_filters, get_dashboard, get_data, get_participant, health_check, put_filter,
    put_layer,
};

fn build_source(config: &DashboardConfig) -> Arc<dyn RecordSource> {
    match config.source.kind {
        SourceKind::Http => Arc::new(HttpRecordSource::new(
            config.source.url.clone().unwrap_or_default(),
            config.source.timeout(),
        )),
        SourceKind::Waypoints => Arc::new(WaypointFileSource::new(config.source.groups.clone())),
    }
}

fn dashboard_options(config: &DashboardConfig) -> DashboardOptions {
    let visible_overlays = config
        .map
        .visible_overlays
        .iter()
        .filter_map(|name| {
            let kind = OverlayKind::from_name(name);
            if kind.is_none() {
                tracing::warn!("Ignoring unknown overlay {}", name);
            }
            kind
        })
        .collect();

    DashboardOptions {
        removal: config.aggregation.removal,
        map_center: config.map.center,
        map_zoom: config.map.zoom,
        visible_overlays,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Load the dataset once; any failure aborts before a dashboard exists
    let loader = DatasetLoader::new(build_source(&config));
    let records = match loader.load().await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Error loading data: {}", e);
            return Err(e.into());
        }
    };

    // Build the dashboard session
    let dashboard = Dashboard::new(records, dashboard_options(&config))?;
    let state = Arc::new(AppState::new(dashboard));

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/data", get(get_data))
        .route("/dashboard", get(get_dashboard))
        .route("/participants/:name", get(get_participant))
        .route("/filters", delete(delete_filters))
        .route("/widgets/:id/filter", put(put_filter).delete(delete_filter))
        .route("/layers/:name", put(put_layer))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting tracking-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
