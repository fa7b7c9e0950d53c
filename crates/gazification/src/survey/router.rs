use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::cache::ReferenceKey;
use super::domain::MunicipalityId;
use super::export::CsvExport;
use super::filters::{DateRange, ExportFilter, FilterError};
use super::intake::{AddressCreateRequest, StatusUpdateRequest, SurveyUploadRequest};
use super::repository::{RepositoryError, SurveyRepository};
use super::resolver::ResolveError;
use super::service::{GazificationService, SurveyError};

pub const API_PREFIX: &str = "/api/v1/gazification";

type SharedService<R> = State<Arc<GazificationService<R>>>;

/// Router builder exposing the catalog, intake and export endpoints.
pub fn gazification_router<R>(service: Arc<GazificationService<R>>) -> Router
where
    R: SurveyRepository + 'static,
{
    let routes = Router::new()
        .route("/mo", get(municipalities_handler::<R>))
        .route("/mo/:mo_id/district", get(districts_handler::<R>))
        .route(
            "/mo/:mo_id/district/:district/street",
            get(streets_handler::<R>),
        )
        .route(
            "/mo/:mo_id/district/:district/street/:street/house",
            get(houses_handler::<R>),
        )
        .route(
            "/mo/:mo_id/district/:district/street/:street/house/:house/flat",
            get(flats_handler::<R>),
        )
        .route("/type-values", get(questions_handler::<R>))
        .route("/add", post(add_address_handler::<R>))
        .route("/update-gas-status", post(update_status_handler::<R>))
        .route("/upload", post(upload_handler::<R>))
        .route("/statuses", get(statuses_handler::<R>))
        .route("/export-csv", get(export_csv_handler::<R>))
        .route("/export-activity", get(export_activity_handler::<R>))
        .route("/cache/invalidate", post(invalidate_handler::<R>))
        .with_state(service);

    Router::new().nest(API_PREFIX, routes)
}

/// Query parameters shared by the status endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    pub mo_id: Option<i64>,
    pub district: Option<String>,
    pub street: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl ExportQuery {
    pub fn into_filter(self) -> Result<ExportFilter, FilterError> {
        let range = DateRange::parse(self.date_from.as_deref(), self.date_to.as_deref())?;
        Ok(ExportFilter::new(
            self.mo_id.map(MunicipalityId),
            self.district,
            self.street,
            range,
        ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateQuery {
    pub key: Option<ReferenceKey>,
}

pub(crate) async fn municipalities_handler<R>(
    State(service): SharedService<R>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let entries = service.municipalities()?;
    Ok(Json(entries).into_response())
}

pub(crate) async fn districts_handler<R>(
    State(service): SharedService<R>,
    Path(mo_id): Path<i64>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let districts = service.districts(MunicipalityId(mo_id))?;
    Ok(Json(districts).into_response())
}

pub(crate) async fn streets_handler<R>(
    State(service): SharedService<R>,
    Path((mo_id, district)): Path<(i64, String)>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let streets = service.streets(MunicipalityId(mo_id), &district)?;
    Ok(Json(streets).into_response())
}

pub(crate) async fn houses_handler<R>(
    State(service): SharedService<R>,
    Path((mo_id, district, street)): Path<(i64, String, String)>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let houses = service.houses(MunicipalityId(mo_id), &district, &street)?;
    Ok(Json(houses).into_response())
}

pub(crate) async fn flats_handler<R>(
    State(service): SharedService<R>,
    Path((mo_id, district, street, house)): Path<(i64, String, String, String)>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let flats = service.flats(MunicipalityId(mo_id), &district, &street, &house)?;
    Ok(Json(flats).into_response())
}

pub(crate) async fn questions_handler<R>(
    State(service): SharedService<R>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let questions = service.questions()?;
    Ok(Json(questions).into_response())
}

pub(crate) async fn add_address_handler<R>(
    State(service): SharedService<R>,
    Json(request): Json<AddressCreateRequest>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let receipt = service.add_address(request)?;
    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}

pub(crate) async fn update_status_handler<R>(
    State(service): SharedService<R>,
    Json(request): Json<StatusUpdateRequest>,
) -> Response
where
    R: SurveyRepository + 'static,
{
    match service.update_status(request) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(SurveyError::NotFound(address)) => {
            let payload = json!({
                "error": "address not found",
                "address": address,
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(other) => other.into_response(),
    }
}

pub(crate) async fn upload_handler<R>(
    State(service): SharedService<R>,
    Json(request): Json<SurveyUploadRequest>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let receipt = service.upload_survey(request)?;
    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}

pub(crate) async fn statuses_handler<R>(
    State(service): SharedService<R>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let filter = query.into_filter()?;
    let table = service.resolve(&filter)?;
    Ok(Json(table).into_response())
}

pub(crate) async fn export_csv_handler<R>(
    State(service): SharedService<R>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let filter = query.into_filter()?;
    let export = service.export_statuses(&filter)?;
    Ok(csv_response(export))
}

pub(crate) async fn export_activity_handler<R>(
    State(service): SharedService<R>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response, SurveyError>
where
    R: SurveyRepository + 'static,
{
    let range = DateRange::parse(query.date_from.as_deref(), query.date_to.as_deref())?;
    let export = service.export_activity(&range)?;
    Ok(csv_response(export))
}

pub(crate) async fn invalidate_handler<R>(
    State(service): SharedService<R>,
    Query(query): Query<InvalidateQuery>,
) -> Response
where
    R: SurveyRepository + 'static,
{
    let evicted = service.invalidate(query.key);
    let payload = json!({
        "key": query.key,
        "evicted": evicted,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

fn csv_response(export: CsvExport) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn repository_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn resolve_status(error: &ResolveError) -> StatusCode {
    match error {
        ResolveError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
        ResolveError::NotFound => StatusCode::NOT_FOUND,
        ResolveError::DataAccess(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        error_response(resolve_status(&self), self.to_string())
    }
}

impl IntoResponse for SurveyError {
    fn into_response(self) -> Response {
        let status = match &self {
            SurveyError::Filter(_) | SurveyError::UnknownQuestion(_) => StatusCode::BAD_REQUEST,
            SurveyError::NotFound(_) => StatusCode::NOT_FOUND,
            SurveyError::Resolve(error) => resolve_status(error),
            SurveyError::Repository(error) => repository_status(error),
            SurveyError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}
