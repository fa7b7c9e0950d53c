use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use serde::Deserialize;

use super::domain::{
    ActivitySession, Address, AddressId, AnswerRecord, GasStatus, Municipality, MunicipalityId,
    NewAddress, NewAnswerRecord, NewStatusRecord, Question, RecordId, StatusRecord,
};
use super::filters::DateRange;
use super::repository::{RepositoryError, SurveyRepository};

/// Snapshot of survey tables loaded into the in-memory repository.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveySeed {
    #[serde(default)]
    pub municipalities: Vec<Municipality>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub status_records: Vec<StatusRecord>,
    #[serde(default)]
    pub answer_records: Vec<AnswerRecord>,
    #[serde(default)]
    pub activity: Vec<ActivitySession>,
}

#[derive(Debug)]
pub enum SeedError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedError::Io(err) => write!(f, "failed to read survey seed: {}", err),
            SeedError::Json(err) => write!(f, "invalid survey seed: {}", err),
        }
    }
}

impl std::error::Error for SeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeedError::Io(err) => Some(err),
            SeedError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SeedError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl SurveySeed {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SeedError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SeedError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[derive(Debug, Default)]
struct Tables {
    seed: SurveySeed,
    next_address_id: i64,
    next_record_id: i64,
}

/// Process-local repository; writes live as long as the process.
#[derive(Debug, Default, Clone)]
pub struct InMemorySurveyRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemorySurveyRepository {
    pub fn from_seed(seed: SurveySeed) -> Self {
        let next_address_id = seed
            .addresses
            .iter()
            .map(|address| address.id.0)
            .max()
            .unwrap_or(0)
            + 1;
        let next_record_id = seed
            .status_records
            .iter()
            .map(|record| record.id.0)
            .chain(seed.answer_records.iter().map(|record| record.id.0))
            .max()
            .unwrap_or(0)
            + 1;

        Self {
            tables: Arc::new(Mutex::new(Tables {
                seed,
                next_address_id,
                next_record_id,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tables {
    fn record_id(&mut self) -> RecordId {
        let id = RecordId(self.next_record_id);
        self.next_record_id += 1;
        id
    }
}

impl SurveyRepository for InMemorySurveyRepository {
    fn status_records(
        &self,
        statuses: &[GasStatus],
        range: &DateRange,
    ) -> Result<Vec<StatusRecord>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .seed
            .status_records
            .iter()
            .filter(|record| statuses.contains(&record.status))
            .filter(|record| range.contains(record.recorded_at))
            .cloned()
            .collect())
    }

    fn status_history(&self, address_id: AddressId) -> Result<Vec<StatusRecord>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .seed
            .status_records
            .iter()
            .filter(|record| record.address_id == address_id)
            .cloned()
            .collect())
    }

    fn addresses_by_id(&self, ids: &[AddressId]) -> Result<Vec<Address>, RepositoryError> {
        let wanted: HashSet<&AddressId> = ids.iter().collect();
        let tables = self.lock();
        Ok(tables
            .seed
            .addresses
            .iter()
            .filter(|address| wanted.contains(&address.id))
            .cloned()
            .collect())
    }

    fn addresses(
        &self,
        municipality_id: Option<MunicipalityId>,
    ) -> Result<Vec<Address>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .seed
            .addresses
            .iter()
            .filter(|address| {
                municipality_id.map_or(true, |id| address.municipality_id == Some(id))
            })
            .cloned()
            .collect())
    }

    fn answer_records(
        &self,
        address_ids: &[AddressId],
        range: &DateRange,
    ) -> Result<Vec<AnswerRecord>, RepositoryError> {
        let wanted: HashSet<&AddressId> = address_ids.iter().collect();
        let tables = self.lock();
        Ok(tables
            .seed
            .answer_records
            .iter()
            .filter(|record| wanted.contains(&record.address_id))
            .filter(|record| range.contains(record.recorded_at))
            .cloned()
            .collect())
    }

    fn municipalities(&self) -> Result<Vec<Municipality>, RepositoryError> {
        Ok(self.lock().seed.municipalities.clone())
    }

    fn questions(&self) -> Result<Vec<Question>, RepositoryError> {
        let mut questions = self.lock().seed.questions.clone();
        questions.sort_by_key(|question| (question.order, question.id));
        Ok(questions)
    }

    fn activity(&self, range: &DateRange) -> Result<Vec<ActivitySession>, RepositoryError> {
        let mut sessions: Vec<ActivitySession> = self
            .lock()
            .seed
            .activity
            .iter()
            .filter(|session| range.contains(session.started_at))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    fn insert_address(&self, address: NewAddress) -> Result<Address, RepositoryError> {
        let mut tables = self.lock();
        let id = AddressId(tables.next_address_id);
        tables.next_address_id += 1;

        let NewAddress {
            municipality_id,
            district,
            city,
            street,
            house,
            flat,
            author,
        } = address;
        let stored = Address {
            id,
            municipality_id,
            district,
            city,
            street,
            house,
            flat,
            author,
        };
        tables.seed.addresses.push(stored.clone());
        Ok(stored)
    }

    fn append_status(&self, record: NewStatusRecord) -> Result<StatusRecord, RepositoryError> {
        let mut tables = self.lock();
        if !tables
            .seed
            .addresses
            .iter()
            .any(|address| address.id == record.address_id)
        {
            return Err(RepositoryError::NotFound);
        }

        let stored = StatusRecord {
            id: tables.record_id(),
            address_id: record.address_id,
            status: record.status,
            recorded_at: record.recorded_at,
            author: record.author,
        };
        tables.seed.status_records.push(stored.clone());
        Ok(stored)
    }

    fn append_answer(&self, record: NewAnswerRecord) -> Result<AnswerRecord, RepositoryError> {
        let mut tables = self.lock();
        if !tables
            .seed
            .addresses
            .iter()
            .any(|address| address.id == record.address_id)
        {
            return Err(RepositoryError::NotFound);
        }

        let stored = AnswerRecord {
            id: tables.record_id(),
            address_id: record.address_id,
            question_id: record.question_id,
            value: record.value,
            recorded_at: record.recorded_at,
            author: record.author,
        };
        tables.seed.answer_records.push(stored.clone());
        Ok(stored)
    }

    fn touch_activity(
        &self,
        session_id: &str,
        login: &str,
        at: NaiveDateTime,
    ) -> Result<ActivitySession, RepositoryError> {
        let mut tables = self.lock();
        if let Some(session) = tables
            .seed
            .activity
            .iter_mut()
            .find(|session| session.session_id == session_id)
        {
            session.submissions += 1;
            return Ok(session.clone());
        }

        let session = ActivitySession {
            session_id: session_id.to_string(),
            login: login.to_string(),
            submissions: 1,
            started_at: at,
        };
        tables.seed.activity.push(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, day)
            .expect("valid date")
            .and_hms_opt(9, 0, 0)
            .expect("valid time")
    }

    #[test]
    fn seed_parses_from_json() {
        let seed = SurveySeed::from_reader(Cursor::new(
            r#"{
                "municipalities": [{"id": 1, "name": "Абаканский"}],
                "addresses": [{"id": 7, "municipality_id": 1, "city": "Абакан", "street": "Ленина", "house": "1"}],
                "status_records": [{"id": 3, "address_id": 7, "status": "connected", "recorded_at": "2025-07-01T09:00:00"}]
            }"#,
        ))
        .expect("seed parses");

        assert_eq!(seed.addresses.len(), 1);
        assert_eq!(seed.status_records[0].status, GasStatus::Connected);
        assert!(seed.questions.is_empty());
    }

    #[test]
    fn inserted_ids_continue_after_seed() {
        let seed = SurveySeed::from_reader(Cursor::new(
            r#"{"addresses": [{"id": 7, "house": "1"}],
                "answer_records": [{"id": 12, "address_id": 7, "question_id": 1, "value": "true", "recorded_at": "2025-07-01T09:00:00"}]}"#,
        ))
        .expect("seed parses");
        let repository = InMemorySurveyRepository::from_seed(seed);

        let address = repository
            .insert_address(NewAddress {
                municipality_id: None,
                district: None,
                city: Some("Абакан".to_string()),
                street: None,
                house: Some("2".to_string()),
                flat: None,
                author: None,
            })
            .expect("insert");
        assert_eq!(address.id, AddressId(8));

        let status = repository
            .append_status(NewStatusRecord {
                address_id: address.id,
                status: GasStatus::NotConnected,
                recorded_at: at(2),
                author: None,
            })
            .expect("append");
        assert_eq!(status.id, RecordId(13));
    }

    #[test]
    fn appending_to_unknown_address_fails() {
        let repository = InMemorySurveyRepository::default();
        let error = repository
            .append_status(NewStatusRecord {
                address_id: AddressId(99),
                status: GasStatus::Connected,
                recorded_at: at(1),
                author: None,
            })
            .expect_err("unknown address");
        assert!(matches!(error, RepositoryError::NotFound));
    }

    #[test]
    fn touch_activity_counts_submissions() {
        let repository = InMemorySurveyRepository::default();
        repository
            .touch_activity("s-1", "worker@example.org", at(1))
            .expect("create");
        let session = repository
            .touch_activity("s-1", "worker@example.org", at(2))
            .expect("increment");
        assert_eq!(session.submissions, 2);
        assert_eq!(session.started_at, at(1));
    }

    #[test]
    fn missing_seed_file_reports_io_error() {
        let error = SurveySeed::from_path("./does-not-exist.json").expect_err("io error");
        assert!(matches!(error, SeedError::Io(_)));
    }
}
