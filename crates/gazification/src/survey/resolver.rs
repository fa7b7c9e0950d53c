//! Current-status resolution: one row per physical address, carrying the
//! latest status observation and the latest answer to every exported question.
//!
//! Every "latest" reduction orders by timestamp first and by surrogate record id
//! second, so equal timestamps resolve to the most recently inserted record.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use tracing::debug;

use super::cache::ReferenceData;
use super::domain::{
    Address, AddressId, AddressIdentity, AnswerRecord, AnswerValue, GasStatus, QuestionId,
    RecordId, StatusRecord,
};
use super::filters::{DateRange, ExportFilter, FilterError};
use super::repository::{RepositoryError, SurveyRepository};
use super::views::{ExportRow, ExportTable, QuestionColumn};

pub const UNKNOWN_MUNICIPALITY: &str = "Неизвестный муниципалитет";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),
    #[error("no data found for the given parameters")]
    NotFound,
    #[error("data access failed: {0}")]
    DataAccess(#[from] RepositoryError),
}

/// Status observation joined to the address it was recorded against.
#[derive(Debug, Clone)]
struct Observation {
    address: Address,
    status: StatusRecord,
}

impl Observation {
    fn recency(&self) -> (NaiveDateTime, RecordId) {
        (self.status.recorded_at, self.status.id)
    }
}

type AnswerPivot = HashMap<AddressId, HashMap<QuestionId, String>>;

pub struct StatusResolver<'a, R: ?Sized> {
    repository: &'a R,
    reference: &'a ReferenceData,
}

impl<'a, R> StatusResolver<'a, R>
where
    R: SurveyRepository + ?Sized,
{
    pub fn new(repository: &'a R, reference: &'a ReferenceData) -> Self {
        Self {
            repository,
            reference,
        }
    }

    pub fn resolve(&self, filter: &ExportFilter) -> Result<ExportTable, ResolveError> {
        let joined = self.select_terminal(&filter.range)?;
        let selected = joined.len();

        let filtered = apply_address_filters(joined, filter);
        let latest = latest_per_address(filtered);
        let survivors = collapse_duplicates(latest);

        debug!(
            selected,
            survivors = survivors.len(),
            "status observations reduced"
        );

        if survivors.is_empty() {
            return Err(ResolveError::NotFound);
        }

        let questions: Vec<QuestionColumn> = self
            .reference
            .questions(self.repository)?
            .iter()
            .filter(|question| question.is_export_column())
            .map(|question| QuestionColumn {
                id: question.id,
                label: question.label.clone(),
            })
            .collect();

        let answers = self.pivot_answers(&survivors, &filter.range)?;
        let names = self.reference.municipality_names(self.repository)?;

        let mut rows: Vec<ExportRow> = survivors
            .into_iter()
            .map(|observation| {
                let municipality = observation
                    .address
                    .municipality_id
                    .and_then(|id| names.get(&id).cloned())
                    .unwrap_or_else(|| UNKNOWN_MUNICIPALITY.to_string());
                build_row(observation, municipality, &questions, &answers)
            })
            .collect();

        rows.sort_by_key(|row| (row.recorded_at, row.address_id));

        Ok(ExportTable { questions, rows })
    }

    fn select_terminal(&self, range: &DateRange) -> Result<Vec<Observation>, RepositoryError> {
        let records = self
            .repository
            .status_records(&GasStatus::terminal(), range)?;

        let ids: Vec<AddressId> = records
            .iter()
            .map(|record| record.address_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let addresses: HashMap<AddressId, Address> = self
            .repository
            .addresses_by_id(&ids)?
            .into_iter()
            .map(|address| (address.id, address))
            .collect();

        Ok(records
            .into_iter()
            .filter(|record| range.contains(record.recorded_at))
            .filter_map(|status| {
                addresses
                    .get(&status.address_id)
                    .cloned()
                    .map(|address| Observation { address, status })
            })
            .collect())
    }

    fn pivot_answers(
        &self,
        survivors: &[Observation],
        range: &DateRange,
    ) -> Result<AnswerPivot, RepositoryError> {
        let ids: Vec<AddressId> = survivors
            .iter()
            .map(|observation| observation.address.id)
            .collect();

        let mut latest: HashMap<(AddressId, QuestionId), AnswerRecord> = HashMap::new();
        for record in self.repository.answer_records(&ids, range)? {
            if !range.contains(record.recorded_at) {
                continue;
            }
            let key = (record.address_id, record.question_id);
            match latest.get(&key) {
                Some(current)
                    if (current.recorded_at, current.id) >= (record.recorded_at, record.id) => {}
                _ => {
                    latest.insert(key, record);
                }
            }
        }

        let mut pivot: AnswerPivot = HashMap::new();
        for ((address_id, question_id), record) in latest {
            pivot
                .entry(address_id)
                .or_default()
                .insert(question_id, record.value);
        }
        Ok(pivot)
    }
}

fn apply_address_filters(observations: Vec<Observation>, filter: &ExportFilter) -> Vec<Observation> {
    observations
        .into_iter()
        .filter(|observation| {
            let address = &observation.address;
            if address.district_or_city().is_none() || address.house().is_none() {
                return false;
            }
            if let Some(municipality_id) = filter.municipality_id {
                if address.municipality_id != Some(municipality_id) {
                    return false;
                }
            }
            if let Some(district) = filter.district.as_deref() {
                if !address.matches_district(district) {
                    return false;
                }
            }
            if let Some(street) = filter.street.as_deref() {
                if !address.matches_street(street) {
                    return false;
                }
            }
            true
        })
        .collect()
}

fn latest_per_address(observations: Vec<Observation>) -> Vec<Observation> {
    let mut latest: HashMap<AddressId, Observation> = HashMap::new();
    for observation in observations {
        match latest.get(&observation.address.id) {
            Some(current) if current.recency() >= observation.recency() => {}
            _ => {
                latest.insert(observation.address.id, observation);
            }
        }
    }
    latest.into_values().collect()
}

fn collapse_duplicates(observations: Vec<Observation>) -> Vec<Observation> {
    let mut groups: HashMap<AddressIdentity, Observation> = HashMap::new();
    for observation in observations {
        let identity = observation.address.identity();
        match groups.get(&identity) {
            Some(current)
                if (current.recency(), current.address.id)
                    >= (observation.recency(), observation.address.id) => {}
            _ => {
                groups.insert(identity, observation);
            }
        }
    }
    groups.into_values().collect()
}

fn build_row(
    observation: Observation,
    municipality: String,
    questions: &[QuestionColumn],
    answers: &AnswerPivot,
) -> ExportRow {
    let Observation { address, status } = observation;
    let address_answers = answers.get(&address.id);

    let answers = questions
        .iter()
        .map(|question| {
            address_answers
                .and_then(|values| values.get(&question.id))
                .map(|raw| AnswerValue::parse(raw).label().to_string())
                .unwrap_or_default()
        })
        .collect();

    ExportRow {
        address_id: address.id,
        recorded_at: status.recorded_at,
        address_author: address.author.clone(),
        status_author: status.author,
        municipality,
        district: address.district_or_city().unwrap_or_default().to_string(),
        street: address.street_display().to_string(),
        house: address.house().unwrap_or_default().to_string(),
        flat: address.flat().unwrap_or_default().to_string(),
        status: status.status,
        status_label: status.status.label(),
        answers,
    }
}
