use crate::infra::build_service;
use clap::Args;
use gazification::config::AppConfig;
use gazification::error::AppError;
use gazification::telemetry::{self, TelemetryError};
use gazification::survey::{
    CsvExport, DateRange, ExportFilter, GazificationService, InMemorySurveyRepository,
    MunicipalityId, SurveyError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct StatusExportArgs {
    /// Survey seed JSON (defaults to APP_SEED_PATH)
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Municipality id to export
    #[arg(long)]
    pub(crate) mo_id: Option<i64>,
    /// District, or city for addresses without a district
    #[arg(long)]
    pub(crate) district: Option<String>,
    #[arg(long)]
    pub(crate) street: Option<String>,
    /// Earliest status timestamp (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    #[arg(long)]
    pub(crate) date_from: Option<String>,
    /// Latest status timestamp (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    #[arg(long)]
    pub(crate) date_to: Option<String>,
    /// Output file; defaults to a timestamped name in the current directory
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ActivityExportArgs {
    /// Survey seed JSON (defaults to APP_SEED_PATH)
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    #[arg(long)]
    pub(crate) date_from: Option<String>,
    #[arg(long)]
    pub(crate) date_to: Option<String>,
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_status_export(args: StatusExportArgs) -> Result<(), AppError> {
    let StatusExportArgs {
        seed,
        mo_id,
        district,
        street,
        date_from,
        date_to,
        output,
    } = args;

    let range =
        DateRange::parse(date_from.as_deref(), date_to.as_deref()).map_err(SurveyError::from)?;
    let filter = ExportFilter::new(mo_id.map(MunicipalityId), district, street, range);

    let service = export_service(seed)?;
    let export = service.export_statuses(&filter)?;
    let path = write_export(&export, output)?;

    println!(
        "Gazification export: {} addresses written to {}",
        export.rows,
        path.display()
    );
    Ok(())
}

pub(crate) fn run_activity_export(args: ActivityExportArgs) -> Result<(), AppError> {
    let range = DateRange::parse(args.date_from.as_deref(), args.date_to.as_deref())
        .map_err(SurveyError::from)?;

    let service = export_service(args.seed)?;
    let export = service.export_activity(&range)?;
    let path = write_export(&export, args.output)?;

    println!(
        "Activity export: {} sessions written to {}",
        export.rows,
        path.display()
    );
    Ok(())
}

fn export_service(
    seed: Option<PathBuf>,
) -> Result<Arc<GazificationService<InMemorySurveyRepository>>, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(seed) = seed {
        config.survey.seed_path = Some(seed);
    }

    match telemetry::init(&config.telemetry) {
        Ok(()) | Err(TelemetryError::Subscriber(_)) => {}
        Err(err) => return Err(err.into()),
    }
    build_service(&config.survey)
}

fn write_export(export: &CsvExport, output: Option<PathBuf>) -> Result<PathBuf, AppError> {
    let path = output.unwrap_or_else(|| Path::new(".").join(&export.file_name));
    std::fs::write(&path, &export.body)?;
    Ok(path)
}
