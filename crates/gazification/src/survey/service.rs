use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use super::cache::{ReferenceData, ReferenceKey};
use super::catalog::{self, MunicipalityEntry};
use super::domain::{
    ActivitySession, Address, GasStatus, Municipality, MunicipalityId, NewAnswerRecord,
    NewStatusRecord, Question, QuestionId,
};
use super::export::{
    self, CsvExport, ExportError, ACTIVITY_EXPORT_PREFIX, STATUS_EXPORT_PREFIX,
};
use super::filters::{DateRange, ExportFilter, FilterError};
use super::intake::{
    AddressCreateRequest, IntakeReceipt, StatusUpdateRequest, SurveyUploadRequest,
};
use super::repository::{RepositoryError, SurveyRepository};
use super::resolver::{ResolveError, StatusResolver};
use super::views::ExportTable;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_EXPORT_UTC_OFFSET_HOURS: i32 = 7;

const UNKNOWN_LOGIN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub cache_ttl: Duration,
    /// Hours added to stored UTC timestamps when rendering exports.
    pub export_utc_offset_hours: i32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            export_utc_offset_hours: DEFAULT_EXPORT_UTC_OFFSET_HOURS,
        }
    }
}

/// Service composing the repository, the reference cache and the status resolver.
pub struct GazificationService<R> {
    repository: Arc<R>,
    reference: ReferenceData,
    settings: ServiceSettings,
}

impl<R> GazificationService<R>
where
    R: SurveyRepository + 'static,
{
    pub fn new(repository: Arc<R>, settings: ServiceSettings) -> Self {
        Self {
            repository,
            reference: ReferenceData::new(settings.cache_ttl),
            settings,
        }
    }

    pub fn settings(&self) -> ServiceSettings {
        self.settings
    }

    pub fn municipalities(&self) -> Result<Vec<MunicipalityEntry>, SurveyError> {
        let names = self.reference.municipality_names(self.repository.as_ref())?;
        let municipalities: Vec<Municipality> = names
            .iter()
            .map(|(id, name)| Municipality {
                id: *id,
                name: name.clone(),
            })
            .collect();
        let addresses = self.repository.addresses(None)?;
        Ok(catalog::municipalities_in_use(&municipalities, &addresses))
    }

    pub fn districts(&self, mo_id: MunicipalityId) -> Result<Vec<String>, SurveyError> {
        let addresses = self.repository.addresses(Some(mo_id))?;
        Ok(catalog::districts(&addresses))
    }

    pub fn streets(&self, mo_id: MunicipalityId, district: &str) -> Result<Vec<String>, SurveyError> {
        let addresses = self.repository.addresses(Some(mo_id))?;
        Ok(catalog::streets(&addresses, district))
    }

    pub fn houses(
        &self,
        mo_id: MunicipalityId,
        district: &str,
        street: &str,
    ) -> Result<Vec<String>, SurveyError> {
        let addresses = self.repository.addresses(Some(mo_id))?;
        Ok(catalog::houses(&addresses, district, street))
    }

    pub fn flats(
        &self,
        mo_id: MunicipalityId,
        district: &str,
        street: &str,
        house: &str,
    ) -> Result<Vec<String>, SurveyError> {
        let addresses = self.repository.addresses(Some(mo_id))?;
        Ok(catalog::flats(&addresses, district, street, house))
    }

    /// Active questions of every kind in display order.
    pub fn questions(&self) -> Result<Vec<Question>, SurveyError> {
        let questions = self.reference.questions(self.repository.as_ref())?;
        Ok(questions
            .iter()
            .filter(|question| question.active)
            .cloned()
            .collect())
    }

    /// Register a new address together with its first status observation.
    pub fn add_address(&self, request: AddressCreateRequest) -> Result<IntakeReceipt, SurveyError> {
        let now = now();
        let address = self.repository.insert_address(request.to_new_address())?;
        let status = GasStatus::from_has_gas(request.has_gas);
        self.repository.append_status(NewStatusRecord {
            address_id: address.id,
            status,
            recorded_at: now,
            author: request.from_login.clone(),
        })?;

        info!(
            address_id = address.id.0,
            mo_id = request.mo_id.0,
            status = status.code(),
            "address registered"
        );

        Ok(IntakeReceipt {
            address_ids: vec![address.id.0],
            status,
            status_label: status.label(),
            answers: None,
        })
    }

    /// Append a new status observation to every stored row of the address.
    ///
    /// Earlier observations are kept; the resolver picks the latest one.
    pub fn update_status(&self, request: StatusUpdateRequest) -> Result<IntakeReceipt, SurveyError> {
        let matches: Vec<Address> = self
            .repository
            .addresses(Some(request.address.mo_id))?
            .into_iter()
            .filter(|address| request.address.matches(address))
            .collect();

        if matches.is_empty() {
            return Err(SurveyError::NotFound(request.address.describe()));
        }

        let now = now();
        let mut address_ids = Vec::with_capacity(matches.len());
        for address in &matches {
            self.repository.append_status(NewStatusRecord {
                address_id: address.id,
                status: request.status,
                recorded_at: now,
                author: request.from_login.clone(),
            })?;
            address_ids.push(address.id.0);
        }

        info!(
            address = %request.address.describe(),
            updated = address_ids.len(),
            status = request.status.code(),
            "gas status appended"
        );

        self.record_activity(request.session_id.as_deref(), request.from_login.as_deref())?;

        Ok(IntakeReceipt {
            address_ids,
            status: request.status,
            status_label: request.status.label(),
            answers: None,
        })
    }

    /// Store a completed questionnaire, creating the address when it is new.
    pub fn upload_survey(&self, request: SurveyUploadRequest) -> Result<IntakeReceipt, SurveyError> {
        let known = self.reference.questions(self.repository.as_ref())?;
        if let Some(unknown) = request
            .fields
            .iter()
            .find(|field| !known.iter().any(|question| question.id == field.id))
        {
            return Err(SurveyError::UnknownQuestion(unknown.id));
        }

        let existing = self
            .repository
            .addresses(Some(request.address.mo_id))?
            .into_iter()
            .filter(|address| request.address.matches(address))
            .max_by_key(|address| address.id);

        let address = match existing {
            Some(address) => address,
            None => {
                let created = self
                    .repository
                    .insert_address(request.address.to_new_address(request.from_login.clone()))?;
                debug!(address_id = created.id.0, "address created from survey upload");
                created
            }
        };

        let now = now();
        for field in &request.fields {
            self.repository.append_answer(NewAnswerRecord {
                address_id: address.id,
                question_id: field.id,
                value: field.value.clone(),
                recorded_at: now,
                author: request.from_login.clone(),
            })?;
        }

        let status = if self.repository.status_history(address.id)?.is_empty() {
            GasStatus::NotConnected
        } else {
            GasStatus::Resubmitted
        };
        self.repository.append_status(NewStatusRecord {
            address_id: address.id,
            status,
            recorded_at: now,
            author: request.from_login.clone(),
        })?;

        info!(
            address_id = address.id.0,
            answers = request.fields.len(),
            status = status.code(),
            "survey stored"
        );

        self.record_activity(request.session_id.as_deref(), request.from_login.as_deref())?;

        Ok(IntakeReceipt {
            address_ids: vec![address.id.0],
            status,
            status_label: status.label(),
            answers: Some(request.fields.len()),
        })
    }

    /// Count one submission against the worker's session. Blank session ids are ignored.
    pub fn record_activity(
        &self,
        session_id: Option<&str>,
        login: Option<&str>,
    ) -> Result<Option<ActivitySession>, SurveyError> {
        let Some(session_id) = session_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let login = login
            .map(str::trim)
            .filter(|login| !login.is_empty())
            .unwrap_or(UNKNOWN_LOGIN);

        let session = self.repository.touch_activity(session_id, login, now())?;
        debug!(session_id, submissions = session.submissions, "activity recorded");
        Ok(Some(session))
    }

    pub fn resolve(&self, filter: &ExportFilter) -> Result<ExportTable, ResolveError> {
        let resolver = StatusResolver::new(self.repository.as_ref(), &self.reference);
        match resolver.resolve(filter) {
            Ok(table) => {
                info!(
                    mo_id = filter.municipality_id.map(|id| id.0),
                    district = filter.district.as_deref(),
                    street = filter.street.as_deref(),
                    rows = table.rows.len(),
                    "current statuses resolved"
                );
                Ok(table)
            }
            Err(ResolveError::DataAccess(error)) => {
                warn!(error = %error, "status resolution failed");
                Err(ResolveError::DataAccess(error))
            }
            Err(other) => Err(other),
        }
    }

    pub fn export_statuses(&self, filter: &ExportFilter) -> Result<CsvExport, SurveyError> {
        let table = self.resolve(filter)?;
        let body = export::render_status_csv(&table, self.settings.export_utc_offset_hours)?;
        Ok(CsvExport {
            file_name: export::export_file_name(STATUS_EXPORT_PREFIX, local_now(self.settings)),
            body,
            rows: table.rows.len(),
        })
    }

    /// Sessions started inside the range, newest first.
    pub fn activity(&self, range: &DateRange) -> Result<Vec<ActivitySession>, SurveyError> {
        Ok(self.repository.activity(range)?)
    }

    pub fn export_activity(&self, range: &DateRange) -> Result<CsvExport, SurveyError> {
        let sessions = self.activity(range)?;
        if sessions.is_empty() {
            return Err(SurveyError::NotFound("no activity in the given period".to_string()));
        }

        let body = export::render_activity_csv(&sessions, self.settings.export_utc_offset_hours)?;
        info!(rows = sessions.len(), "activity exported");
        Ok(CsvExport {
            file_name: export::export_file_name(ACTIVITY_EXPORT_PREFIX, local_now(self.settings)),
            body,
            rows: sessions.len(),
        })
    }

    /// Drop one cached reference table, or all of them when `key` is `None`.
    pub fn invalidate(&self, key: Option<ReferenceKey>) -> bool {
        match key {
            Some(key) => self.reference.invalidate(key),
            None => {
                self.reference.invalidate_all();
                true
            }
        }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn local_now(settings: ServiceSettings) -> NaiveDateTime {
    let now = now();
    now.checked_add_signed(chrono::Duration::hours(i64::from(
        settings.export_utc_offset_hours,
    )))
    .unwrap_or(now)
}

/// Error raised by the gazification service.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unknown question id {0}")]
    UnknownQuestion(QuestionId),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
