//! Gas-network survey: address catalog, append-only status and answer history,
//! current-status resolution and tabular exports.
//!
//! Reads flow through [`SurveyRepository`]; the [`StatusResolver`] reduces the
//! history to one row per physical address and the export module renders it.

pub mod cache;
pub mod catalog;
pub mod domain;
pub mod export;
pub mod filters;
pub mod intake;
pub mod memory;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod service;
pub mod views;

#[cfg(test)]
mod tests;

pub use cache::{ReferenceData, ReferenceKey, TtlCache};
pub use catalog::MunicipalityEntry;
pub use domain::{
    ActivitySession, Address, AddressId, AnswerRecord, AnswerValue, GasStatus, Municipality,
    MunicipalityId, Question, QuestionId, QuestionKind, RecordId, StatusRecord,
};
pub use export::{CsvExport, ExportError};
pub use filters::{DateRange, ExportFilter, FilterError};
pub use intake::{
    AddressCreateRequest, AddressLocator, IntakeReceipt, StatusUpdateRequest, SurveyField,
    SurveyUploadRequest,
};
pub use memory::{InMemorySurveyRepository, SeedError, SurveySeed};
pub use repository::{RepositoryError, SurveyRepository};
pub use resolver::{ResolveError, StatusResolver};
pub use router::gazification_router;
pub use service::{GazificationService, ServiceSettings, SurveyError};
pub use views::{ExportCell, ExportRow, ExportTable, QuestionColumn};
