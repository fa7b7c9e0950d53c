use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{
    non_blank, normalize_component, Address, GasStatus, MunicipalityId, NewAddress, QuestionId,
};

/// New address reported from the field together with its first observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCreateRequest {
    pub mo_id: MunicipalityId,
    pub district: String,
    pub street: String,
    pub house: String,
    #[serde(default)]
    pub flat: Option<String>,
    pub has_gas: bool,
    #[serde(default)]
    pub from_login: Option<String>,
}

impl AddressCreateRequest {
    pub(crate) fn to_new_address(&self) -> NewAddress {
        AddressLocator {
            mo_id: self.mo_id,
            district: Some(self.district.clone()),
            street: self.street.clone(),
            house: self.house.clone(),
            flat: self.flat.clone(),
        }
        .to_new_address(self.from_login.clone())
    }
}

/// Physical address as typed by a field worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressLocator {
    pub mo_id: MunicipalityId,
    #[serde(default)]
    pub district: Option<String>,
    pub street: String,
    pub house: String,
    #[serde(default)]
    pub flat: Option<String>,
}

impl AddressLocator {
    /// A missing district only matches addresses without district and city; a
    /// missing flat only matches addresses without a flat.
    pub fn matches(&self, address: &Address) -> bool {
        if address.municipality_id != Some(self.mo_id) {
            return false;
        }

        let district_matches = match non_blank(self.district.as_deref()) {
            Some(district) => address.matches_district(district),
            None => address.district_or_city().is_none(),
        };
        if !district_matches || !address.matches_street(&self.street) {
            return false;
        }

        let house = normalize_component(&self.house);
        if address.house().map(normalize_component) != Some(house) {
            return false;
        }

        match non_blank(self.flat.as_deref()) {
            Some(flat) => {
                address.flat().map(normalize_component) == Some(normalize_component(flat))
            }
            None => address.flat().is_none(),
        }
    }

    pub(crate) fn to_new_address(&self, author: Option<String>) -> NewAddress {
        let district = non_blank(self.district.as_deref()).map(str::to_string);
        NewAddress {
            municipality_id: Some(self.mo_id),
            city: district.clone(),
            district,
            street: Some(self.street.trim().to_string()),
            house: Some(self.house.trim().to_string()),
            flat: non_blank(self.flat.as_deref()).map(str::to_string),
            author,
        }
    }

    pub(crate) fn describe(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.mo_id.0,
            non_blank(self.district.as_deref()).unwrap_or("none"),
            self.street,
            self.house,
            non_blank(self.flat.as_deref()).unwrap_or("none"),
        )
    }
}

/// New status observation for every stored row of an existing address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(flatten)]
    pub address: AddressLocator,
    #[serde(rename = "has_gas", deserialize_with = "status_flag")]
    pub status: GasStatus,
    #[serde(default)]
    pub from_login: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn status_flag<'de, D>(deserializer: D) -> Result<GasStatus, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(has_gas) => GasStatus::from_has_gas(has_gas),
        Flag::Text(flag) => GasStatus::from_flag(&flag),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyField {
    pub id: QuestionId,
    /// `"true"` / `"false"` for boolean questions, free text otherwise.
    pub value: String,
}

/// Completed questionnaire for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyUploadRequest {
    pub address: AddressLocator,
    pub fields: Vec<SurveyField>,
    #[serde(default)]
    pub from_login: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeReceipt {
    pub address_ids: Vec<i64>,
    pub status: GasStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<usize>,
}
