use gazification::config::SurveyConfig;
use gazification::error::AppError;
use gazification::survey::{GazificationService, InMemorySurveyRepository, SurveySeed};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory repository filled from the seed file, or empty without one.
pub(crate) fn load_repository(seed_path: Option<&Path>) -> Result<InMemorySurveyRepository, AppError> {
    let Some(path) = seed_path else {
        warn!("no survey seed configured; starting with empty tables");
        return Ok(InMemorySurveyRepository::default());
    };

    let seed = SurveySeed::from_path(path)?;
    info!(
        path = %path.display(),
        addresses = seed.addresses.len(),
        status_records = seed.status_records.len(),
        answer_records = seed.answer_records.len(),
        "survey seed loaded"
    );
    Ok(InMemorySurveyRepository::from_seed(seed))
}

pub(crate) fn build_service(
    config: &SurveyConfig,
) -> Result<Arc<GazificationService<InMemorySurveyRepository>>, AppError> {
    let repository = Arc::new(load_repository(config.seed_path.as_deref())?);
    Ok(Arc::new(GazificationService::new(
        repository,
        config.service_settings(),
    )))
}
