use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::survey::domain::{
    ActivitySession, Address, AddressId, AnswerRecord, GasStatus, Municipality, MunicipalityId,
    NewAddress, NewAnswerRecord, NewStatusRecord, Question, QuestionId, QuestionKind, RecordId,
    StatusRecord,
};
use crate::survey::filters::DateRange;
use crate::survey::memory::{InMemorySurveyRepository, SurveySeed};
use crate::survey::repository::{RepositoryError, SurveyRepository};
use crate::survey::service::{GazificationService, ServiceSettings};

pub(super) const BOILER: QuestionId = QuestionId(1);
pub(super) const HEATING: QuestionId = QuestionId(2);

pub(super) fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, day)
        .expect("valid date")
        .and_hms_opt(hour, 0, 0)
        .expect("valid time")
}

pub(super) fn address(
    id: i64,
    district: Option<&str>,
    city: Option<&str>,
    street: &str,
    house: &str,
    flat: Option<&str>,
) -> Address {
    Address {
        id: AddressId(id),
        municipality_id: Some(MunicipalityId(1)),
        district: district.map(str::to_string),
        city: city.map(str::to_string),
        street: Some(street.to_string()),
        house: Some(house.to_string()),
        flat: flat.map(str::to_string),
        author: Some("registrar@example.org".to_string()),
    }
}

pub(super) fn status(
    id: i64,
    address_id: i64,
    status: GasStatus,
    recorded_at: NaiveDateTime,
) -> StatusRecord {
    StatusRecord {
        id: RecordId(id),
        address_id: AddressId(address_id),
        status,
        recorded_at,
        author: Some("worker@example.org".to_string()),
    }
}

pub(super) fn answer(
    id: i64,
    address_id: i64,
    question_id: QuestionId,
    value: &str,
    recorded_at: NaiveDateTime,
) -> AnswerRecord {
    AnswerRecord {
        id: RecordId(id),
        address_id: AddressId(address_id),
        question_id,
        value: value.to_string(),
        recorded_at,
        author: None,
    }
}

fn question(id: i64, label: &str, kind: QuestionKind, order: i32, active: bool) -> Question {
    Question {
        id: QuestionId(id),
        label: label.to_string(),
        description: String::new(),
        kind,
        order,
        active,
    }
}

pub(super) fn questions() -> Vec<Question> {
    vec![
        question(2, "Тип отопления", QuestionKind::Text, 2, true),
        question(1, "Есть котёл", QuestionKind::Boolean, 1, true),
        question(3, "Пояснение", QuestionKind::Info, 0, true),
        question(4, "Старый вопрос", QuestionKind::Boolean, 3, false),
    ]
}

pub(super) fn municipalities() -> Vec<Municipality> {
    vec![
        Municipality {
            id: MunicipalityId(1),
            name: "Абаканский".to_string(),
        },
        Municipality {
            id: MunicipalityId(2),
            name: "Бейский".to_string(),
        },
    ]
}

/// Reference tables only; scenarios add their own addresses and history.
pub(super) fn base_seed() -> SurveySeed {
    SurveySeed {
        municipalities: municipalities(),
        questions: questions(),
        ..SurveySeed::default()
    }
}

/// One address in "Центр" whose status flipped from not connected to connected.
pub(super) fn connected_seed() -> SurveySeed {
    SurveySeed {
        addresses: vec![address(1, Some("Центр"), None, "Ленина", "1", None)],
        status_records: vec![
            status(1, 1, GasStatus::NotConnected, at(1, 9)),
            status(2, 1, GasStatus::Connected, at(3, 9)),
        ],
        answer_records: vec![answer(3, 1, BOILER, "true", at(3, 9))],
        ..base_seed()
    }
}

pub(super) fn repository(seed: SurveySeed) -> Arc<InMemorySurveyRepository> {
    Arc::new(InMemorySurveyRepository::from_seed(seed))
}

pub(super) fn build_service(
    seed: SurveySeed,
) -> (
    Arc<GazificationService<InMemorySurveyRepository>>,
    Arc<InMemorySurveyRepository>,
) {
    let repository = repository(seed);
    let settings = ServiceSettings {
        cache_ttl: Duration::from_secs(600),
        export_utc_offset_hours: 7,
    };
    let service = Arc::new(GazificationService::new(repository.clone(), settings));
    (service, repository)
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) async fn raw_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

/// Repository whose storage is always down.
pub(super) struct UnavailableRepository;

fn unavailable<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("connection refused".to_string()))
}

impl SurveyRepository for UnavailableRepository {
    fn status_records(
        &self,
        _statuses: &[GasStatus],
        _range: &DateRange,
    ) -> Result<Vec<StatusRecord>, RepositoryError> {
        unavailable()
    }

    fn status_history(&self, _address_id: AddressId) -> Result<Vec<StatusRecord>, RepositoryError> {
        unavailable()
    }

    fn addresses_by_id(&self, _ids: &[AddressId]) -> Result<Vec<Address>, RepositoryError> {
        unavailable()
    }

    fn addresses(
        &self,
        _municipality_id: Option<MunicipalityId>,
    ) -> Result<Vec<Address>, RepositoryError> {
        unavailable()
    }

    fn answer_records(
        &self,
        _address_ids: &[AddressId],
        _range: &DateRange,
    ) -> Result<Vec<AnswerRecord>, RepositoryError> {
        unavailable()
    }

    fn municipalities(&self) -> Result<Vec<Municipality>, RepositoryError> {
        unavailable()
    }

    fn questions(&self) -> Result<Vec<Question>, RepositoryError> {
        unavailable()
    }

    fn activity(&self, _range: &DateRange) -> Result<Vec<ActivitySession>, RepositoryError> {
        unavailable()
    }

    fn insert_address(&self, _address: NewAddress) -> Result<Address, RepositoryError> {
        unavailable()
    }

    fn append_status(&self, _record: NewStatusRecord) -> Result<StatusRecord, RepositoryError> {
        unavailable()
    }

    fn append_answer(&self, _record: NewAnswerRecord) -> Result<AnswerRecord, RepositoryError> {
        unavailable()
    }

    fn touch_activity(
        &self,
        _session_id: &str,
        _login: &str,
        _at: NaiveDateTime,
    ) -> Result<ActivitySession, RepositoryError> {
        unavailable()
    }
}
