use metrics_exporter_prometheus::PrometheusHandle;
use ppdb::config::DatabaseConfig;
use ppdb::enrollment::{ApplicationRepository, RepositoryError, SqliteApplicationRepository};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Arc<dyn ApplicationRepository>,
}

pub(crate) fn open_repository(
    config: &DatabaseConfig,
) -> Result<SqliteApplicationRepository, RepositoryError> {
    if config.is_in_memory() {
        SqliteApplicationRepository::in_memory()
    } else {
        SqliteApplicationRepository::open(&config.path)
    }
}
