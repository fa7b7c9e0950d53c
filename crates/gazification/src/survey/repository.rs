use chrono::NaiveDateTime;

use super::domain::{
    ActivitySession, Address, AddressId, AnswerRecord, GasStatus, Municipality, MunicipalityId,
    NewAddress, NewAnswerRecord, NewStatusRecord, Question, StatusRecord,
};
use super::filters::DateRange;

/// Bulk storage reads and append-only writes used by the survey service.
///
/// Every read is a single bulk fetch; callers never issue per-row queries.
pub trait SurveyRepository: Send + Sync {
    fn status_records(
        &self,
        statuses: &[GasStatus],
        range: &DateRange,
    ) -> Result<Vec<StatusRecord>, RepositoryError>;

    fn status_history(&self, address_id: AddressId) -> Result<Vec<StatusRecord>, RepositoryError>;

    fn addresses_by_id(&self, ids: &[AddressId]) -> Result<Vec<Address>, RepositoryError>;

    /// All addresses, optionally restricted to one municipality.
    fn addresses(
        &self,
        municipality_id: Option<MunicipalityId>,
    ) -> Result<Vec<Address>, RepositoryError>;

    fn answer_records(
        &self,
        address_ids: &[AddressId],
        range: &DateRange,
    ) -> Result<Vec<AnswerRecord>, RepositoryError>;

    fn municipalities(&self) -> Result<Vec<Municipality>, RepositoryError>;

    /// Question catalog ordered by display order.
    fn questions(&self) -> Result<Vec<Question>, RepositoryError>;

    /// Activity sessions started inside the range, newest first.
    fn activity(&self, range: &DateRange) -> Result<Vec<ActivitySession>, RepositoryError>;

    fn insert_address(&self, address: NewAddress) -> Result<Address, RepositoryError>;

    fn append_status(&self, record: NewStatusRecord) -> Result<StatusRecord, RepositoryError>;

    fn append_answer(&self, record: NewAnswerRecord) -> Result<AnswerRecord, RepositoryError>;

    /// Increments the session's submission counter, creating the session on first use.
    fn touch_activity(
        &self,
        session_id: &str,
        login: &str,
        at: NaiveDateTime,
    ) -> Result<ActivitySession, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
