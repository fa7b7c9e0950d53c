//! CSV rendering for spreadsheet consumers: `;` separated, every field quoted,
//! prefixed with a UTF-8 byte order mark.

use chrono::{Duration, NaiveDateTime};

use super::domain::ActivitySession;
use super::views::{ExportCell, ExportTable};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const ACTIVITY_COLUMNS: [&str; 3] = ["Дата входа", "Аккаунт", "Количество внесений"];
pub const STATUS_EXPORT_PREFIX: &str = "gazification_export";
pub const ACTIVITY_EXPORT_PREFIX: &str = "activity_export";

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write csv record: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv buffer: {0}")]
    Io(#[from] std::io::Error),
}

/// Rendered export ready to be served or written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub body: Vec<u8>,
    pub rows: usize,
}

pub fn render_status_csv(table: &ExportTable, utc_offset_hours: i32) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv_writer();
    writer.write_record(table.header())?;
    for row in &table.rows {
        let record: Vec<String> = table
            .cells(row)
            .into_iter()
            .map(|cell| format_cell(cell, utc_offset_hours))
            .collect();
        writer.write_record(&record)?;
    }
    finish(writer)
}

pub fn render_activity_csv(
    sessions: &[ActivitySession],
    utc_offset_hours: i32,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv_writer();
    writer.write_record(ACTIVITY_COLUMNS)?;
    for session in sessions {
        writer.write_record([
            format_timestamp(session.started_at, utc_offset_hours),
            session.login.clone(),
            session.submissions.to_string(),
        ])?;
    }
    finish(writer)
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.csv`
pub fn export_file_name(prefix: &str, now: NaiveDateTime) -> String {
    format!("{}_{}.csv", prefix, now.format("%Y%m%d_%H%M%S"))
}

pub fn format_timestamp(moment: NaiveDateTime, utc_offset_hours: i32) -> String {
    moment
        .checked_add_signed(Duration::hours(i64::from(utc_offset_hours)))
        .unwrap_or(moment)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

fn format_cell(cell: ExportCell, utc_offset_hours: i32) -> String {
    match cell {
        ExportCell::Text(value) => value,
        ExportCell::Timestamp(moment) => format_timestamp(moment, utc_offset_hours),
        ExportCell::Number(value) => value.to_string(),
    }
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(UTF8_BOM.to_vec())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::domain::{AddressId, GasStatus, QuestionId};
    use crate::survey::views::{ExportRow, QuestionColumn};
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 31)
            .expect("valid date")
            .and_hms_opt(hour, 5, 0)
            .expect("valid time")
    }

    fn table() -> ExportTable {
        ExportTable {
            questions: vec![QuestionColumn {
                id: QuestionId(1),
                label: "Есть котёл".to_string(),
            }],
            rows: vec![ExportRow {
                address_id: AddressId(42),
                recorded_at: at(20),
                address_author: None,
                status_author: Some("worker@example.org".to_string()),
                municipality: "Абаканский".to_string(),
                district: "Центр".to_string(),
                street: "Ленина; угол".to_string(),
                house: "1".to_string(),
                flat: String::new(),
                status: GasStatus::OwnerAbsent,
                status_label: GasStatus::OwnerAbsent.label(),
                answers: vec!["Да".to_string()],
            }],
        }
    }

    fn lines(bytes: &[u8]) -> Vec<String> {
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).expect("utf-8 body");
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn status_csv_has_bom_header_and_quoted_cells() {
        let bytes = render_status_csv(&table(), 7).expect("render");
        assert!(bytes.starts_with(UTF8_BOM));

        let lines = lines(&bytes);
        assert_eq!(
            lines[0],
            "\"ID адреса\";\"Дата создания\";\"Создатель адреса\";\"Отправитель\";\"Муниципалитет\";\"Район\";\"Улица\";\"Дом\";\"Квартира\";\"Газифицирован?\";\"Есть котёл\""
        );
        assert_eq!(
            lines[1],
            "\"42\";\"01.04.2025 03:05\";\"Отсутствует\";\"worker@example.org\";\"Абаканский\";\"Центр\";\"Ленина; угол\";\"1\";\"\";\"Нет\";\"Да\""
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn activity_csv_lists_sessions_in_given_order() {
        let sessions = vec![
            ActivitySession {
                session_id: "b".to_string(),
                login: "second@example.org".to_string(),
                submissions: 4,
                started_at: at(10),
            },
            ActivitySession {
                session_id: "a".to_string(),
                login: "first@example.org".to_string(),
                submissions: 1,
                started_at: at(9),
            },
        ];

        let bytes = render_activity_csv(&sessions, 0).expect("render");
        let lines = lines(&bytes);
        assert_eq!(lines[0], "\"Дата входа\";\"Аккаунт\";\"Количество внесений\"");
        assert_eq!(lines[1], "\"31.03.2025 10:05\";\"second@example.org\";\"4\"");
        assert_eq!(lines[2], "\"31.03.2025 09:05\";\"first@example.org\";\"1\"");
    }

    #[test]
    fn file_names_embed_timestamp() {
        assert_eq!(
            export_file_name(STATUS_EXPORT_PREFIX, at(8)),
            "gazification_export_20250331_080500.csv"
        );
    }
}
