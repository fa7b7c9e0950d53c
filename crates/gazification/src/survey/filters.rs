use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::MunicipalityId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("{field}: '{value}' is not a date (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)")]
    InvalidDate { field: &'static str, value: String },
    #[error("date_from {from} is later than date_to {to}")]
    InvertedRange {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
}

/// Inclusive timestamp window; an open side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

impl DateRange {
    pub fn new(
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<Self, FilterError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(FilterError::InvertedRange { from, to });
            }
        }
        Ok(Self { from, to })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Parses the `date_from` / `date_to` query values. A bare date widens to the
    /// start (or end) of that day.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, FilterError> {
        let from = parse_bound("date_from", from, Bound::Start)?;
        let to = parse_bound("date_to", to, Bound::End)?;
        Self::new(from, to)
    }

    pub fn contains(&self, moment: NaiveDateTime) -> bool {
        self.from.map_or(true, |from| moment >= from) && self.to.map_or(true, |to| moment <= to)
    }
}

fn parse_bound(
    field: &'static str,
    raw: Option<&str>,
    bound: Bound,
) -> Result<Option<NaiveDateTime>, FilterError> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(moment) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Some(moment));
        }
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        FilterError::InvalidDate {
            field,
            value: value.to_string(),
        }
    })?;

    let moment = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
    };

    moment.map(Some).ok_or(FilterError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// Filter set accepted by the status resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFilter {
    pub municipality_id: Option<MunicipalityId>,
    pub district: Option<String>,
    pub street: Option<String>,
    pub range: DateRange,
}

impl ExportFilter {
    pub fn new(
        municipality_id: Option<MunicipalityId>,
        district: Option<String>,
        street: Option<String>,
        range: DateRange,
    ) -> Self {
        Self {
            municipality_id,
            district: district.filter(|value| !value.trim().is_empty()),
            street: street.filter(|value| !value.trim().is_empty()),
            range,
        }
    }
}
