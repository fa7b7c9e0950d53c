use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::{AddressId, GasStatus, QuestionId};

pub const COLUMN_ADDRESS_ID: &str = "ID адреса";
pub const COLUMN_RECORDED_AT: &str = "Дата создания";
pub const COLUMN_ADDRESS_AUTHOR: &str = "Создатель адреса";
pub const COLUMN_STATUS_AUTHOR: &str = "Отправитель";
pub const COLUMN_MUNICIPALITY: &str = "Муниципалитет";
pub const COLUMN_DISTRICT: &str = "Район";
pub const COLUMN_STREET: &str = "Улица";
pub const COLUMN_HOUSE: &str = "Дом";
pub const COLUMN_FLAT: &str = "Квартира";
pub const COLUMN_GASIFIED: &str = "Газифицирован?";

/// Columns that precede the per-question columns, in export order.
pub const FIXED_COLUMNS: [&str; 10] = [
    COLUMN_ADDRESS_ID,
    COLUMN_RECORDED_AT,
    COLUMN_ADDRESS_AUTHOR,
    COLUMN_STATUS_AUTHOR,
    COLUMN_MUNICIPALITY,
    COLUMN_DISTRICT,
    COLUMN_STREET,
    COLUMN_HOUSE,
    COLUMN_FLAT,
    COLUMN_GASIFIED,
];

pub const MISSING_AUTHOR: &str = "Отсутствует";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionColumn {
    pub id: QuestionId,
    pub label: String,
}

/// One physical address with its current status and answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub address_id: AddressId,
    pub recorded_at: NaiveDateTime,
    pub address_author: Option<String>,
    pub status_author: Option<String>,
    pub municipality: String,
    pub district: String,
    pub street: String,
    pub house: String,
    pub flat: String,
    pub status: GasStatus,
    pub status_label: &'static str,
    /// Aligned with [`ExportTable::questions`]; unanswered questions are empty.
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportCell {
    Text(String),
    Timestamp(NaiveDateTime),
    Number(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportTable {
    pub questions: Vec<QuestionColumn>,
    pub rows: Vec<ExportRow>,
}

impl ExportTable {
    pub fn header(&self) -> Vec<String> {
        FIXED_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .chain(self.questions.iter().map(|question| question.label.clone()))
            .collect()
    }

    pub fn cells(&self, row: &ExportRow) -> Vec<ExportCell> {
        let author = |value: &Option<String>| {
            ExportCell::Text(value.clone().unwrap_or_else(|| MISSING_AUTHOR.to_string()))
        };

        let mut cells = vec![
            ExportCell::Number(row.address_id.0),
            ExportCell::Timestamp(row.recorded_at),
            author(&row.address_author),
            author(&row.status_author),
            ExportCell::Text(row.municipality.clone()),
            ExportCell::Text(row.district.clone()),
            ExportCell::Text(row.street.clone()),
            ExportCell::Text(row.house.clone()),
            ExportCell::Text(row.flat.clone()),
            ExportCell::Text(row.status.export_label().to_string()),
        ];
        cells.extend(row.answers.iter().cloned().map(ExportCell::Text));
        cells
    }

    /// Column name to cell mapping for one row.
    pub fn row_map(&self, row: &ExportRow) -> BTreeMap<String, ExportCell> {
        self.header().into_iter().zip(self.cells(row)).collect()
    }
}
