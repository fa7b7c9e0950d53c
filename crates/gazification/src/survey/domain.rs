use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Street value field workers enter when a settlement has no named streets.
pub const NO_STREET_PLACEHOLDER: &str = "Нет улиц";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MunicipalityId(pub i64);

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gas network status of a surveyed address.
///
/// Storage codes follow the field-collection database; `Resubmitted` takes the
/// next free code:
///
/// | variant          | code |
/// |------------------|------|
/// | `Connected`      | 3    |
/// | `NotConnected`   | 4    |
/// | `AddressInvalid` | 6    |
/// | `OwnerAbsent`    | 7    |
/// | `Resubmitted`    | 8    |
///
/// The mobile client sends `"true"`, `"false"`, `"not_exist"` and `"not_at_home"`,
/// which deserialize through the aliases below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasStatus {
    #[serde(alias = "true")]
    Connected,
    #[serde(alias = "false")]
    NotConnected,
    #[serde(alias = "not_exist")]
    AddressInvalid,
    #[serde(alias = "not_at_home")]
    OwnerAbsent,
    Resubmitted,
}

impl GasStatus {
    /// Statuses the status resolver treats as a final observation for an address.
    pub const fn terminal() -> [Self; 5] {
        [
            Self::Connected,
            Self::NotConnected,
            Self::AddressInvalid,
            Self::OwnerAbsent,
            Self::Resubmitted,
        ]
    }

    pub const fn code(self) -> i32 {
        match self {
            Self::Connected => 3,
            Self::NotConnected => 4,
            Self::AddressInvalid => 6,
            Self::OwnerAbsent => 7,
            Self::Resubmitted => 8,
        }
    }

    pub const fn from_has_gas(has_gas: bool) -> Self {
        if has_gas {
            Self::Connected
        } else {
            Self::NotConnected
        }
    }

    /// Maps the mobile client's `has_gas` flag; unrecognised values mean not connected.
    pub fn from_flag(flag: &str) -> Self {
        match flag.trim() {
            "true" | "connected" => Self::Connected,
            "not_exist" | "address_invalid" => Self::AddressInvalid,
            "not_at_home" | "owner_absent" => Self::OwnerAbsent,
            "resubmitted" => Self::Resubmitted,
            _ => Self::NotConnected,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Connected => "Подключен к газу",
            Self::NotConnected => "Не подключен",
            Self::AddressInvalid => "Адрес не существует",
            Self::OwnerAbsent => "Хозяин отсутствует",
            Self::Resubmitted => "Повторная подача",
        }
    }

    /// Value of the "Газифицирован?" export column.
    pub const fn export_label(self) -> &'static str {
        match self {
            Self::Connected => "Да",
            Self::AddressInvalid => "Адрес не существует",
            Self::Resubmitted => "Повторная подача",
            Self::NotConnected | Self::OwnerAbsent => "Нет",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown gas status code {0}")]
pub struct UnknownStatusCode(pub i32);

impl TryFrom<i32> for GasStatus {
    type Error = UnknownStatusCode;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::terminal()
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(UnknownStatusCode(code))
    }
}

/// Survey answer after boolean normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Yes,
    No,
    Text(String),
}

impl AnswerValue {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("true") {
            Self::Yes
        } else if raw.eq_ignore_ascii_case("false") {
            Self::No
        } else {
            Self::Text(raw.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Yes => "Да",
            Self::No => "Нет",
            Self::Text(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Boolean,
    Text,
    Select,
    /// Explanatory text shown in the app; never answered.
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub kind: QuestionKind,
    pub order: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Question {
    pub fn is_export_column(&self) -> bool {
        self.active && self.kind != QuestionKind::Info
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub id: MunicipalityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    #[serde(default)]
    pub municipality_id: Option<MunicipalityId>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub house: Option<String>,
    #[serde(default)]
    pub flat: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl Address {
    /// District, or the city when the district is blank.
    pub fn district_or_city(&self) -> Option<&str> {
        non_blank(self.district.as_deref()).or_else(|| non_blank(self.city.as_deref()))
    }

    pub fn street_display(&self) -> &str {
        match non_blank(self.street.as_deref()) {
            Some(street) if street != NO_STREET_PLACEHOLDER => street,
            _ => "",
        }
    }

    pub fn house(&self) -> Option<&str> {
        non_blank(self.house.as_deref())
    }

    pub fn flat(&self) -> Option<&str> {
        non_blank(self.flat.as_deref())
    }

    pub fn matches_district(&self, district: &str) -> bool {
        let needle = normalize_component(district);
        self.district_or_city()
            .map(|value| normalize_component(value) == needle)
            .unwrap_or(false)
    }

    pub fn matches_street(&self, street: &str) -> bool {
        normalize_component(self.street.as_deref().unwrap_or_default())
            == normalize_component(street)
    }

    /// Key under which duplicate submissions of one physical address collapse.
    pub fn identity(&self) -> AddressIdentity {
        AddressIdentity {
            municipality_id: self.municipality_id,
            area: normalize_component(self.district_or_city().unwrap_or_default()),
            street: normalize_component(self.street_display()),
            house: normalize_component(self.house().unwrap_or_default()),
            flat: normalize_component(self.flat().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressIdentity {
    pub municipality_id: Option<MunicipalityId>,
    pub area: String,
    pub street: String,
    pub house: String,
    pub flat: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    pub municipality_id: Option<MunicipalityId>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub flat: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: RecordId,
    pub address_id: AddressId,
    pub status: GasStatus,
    pub recorded_at: NaiveDateTime,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatusRecord {
    pub address_id: AddressId,
    pub status: GasStatus,
    pub recorded_at: NaiveDateTime,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: RecordId,
    pub address_id: AddressId,
    pub question_id: QuestionId,
    pub value: String,
    pub recorded_at: NaiveDateTime,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswerRecord {
    pub address_id: AddressId,
    pub question_id: QuestionId,
    pub value: String,
    pub recorded_at: NaiveDateTime,
    pub author: Option<String>,
}

/// Field worker login session with a running count of submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySession {
    pub session_id: String,
    pub login: String,
    pub submissions: u32,
    pub started_at: NaiveDateTime,
}

/// Trims, collapses inner whitespace and lower-cases an address component.
pub fn normalize_component(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
