// Application state for HTTP handlers
use crate::application::dashboard_service::Dashboard;
use tokio::sync::Mutex;

/// The single dashboard session. The mutex admits one writer at a time, so
/// each interaction runs to completion before the next is handled.
pub struct AppState {
    pub dashboard: Mutex<Dashboard>,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard: Mutex::new(dashboard),
        }
    }
}
