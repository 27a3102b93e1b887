use crate::detect::incident::IncidentManager;
use crate::sink::Dashboard;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Dashboard,
    /// Present when the alert log is configured.
    pub incidents: Option<IncidentManager>,
}
