use crate::config::receipt::ReceiptConfig;
use crate::domain::model::StudentRecord;
use crate::utils::error::{ReceiptError, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::Path;

/// Header aliases per record field, compared after trimming and lowercasing.
const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    ("name", &["name", "full name", "student name", "student"]),
    ("email", &["email", "email address"]),
    ("amount", &["amount", "amount paid", "contribution", "paid"]),
    ("date", &["date", "payment date", "paid on", "received on"]),
    (
        "payment_method",
        &["payment method", "payment mode", "mode", "channel"],
    ),
];

const REQUIRED_COLUMNS: &[&str] = &["name", "email", "amount"];

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Date(d) => d.format("%d %B %Y").to_string(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

pub fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(cell.to_string())),
        other => CellValue::Text(other.to_string()),
    }
}

/// `25000` -> `25,000 RWF`, rounding halves to even. Non-numeric and
/// non-finite values keep their text.
pub fn format_amount(value: &CellValue, currency: &str) -> String {
    if value.is_blank() {
        return String::new();
    }
    match value.as_number().filter(|amount| amount.is_finite()) {
        Some(amount) => format!("{} {}", group_thousands(amount.round_ties_even() as i64), currency)
            .trim()
            .to_string(),
        None => format!("{} {}", value.as_text().trim(), currency)
            .trim()
            .to_string(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn normalize_header(value: &str) -> String {
    value.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Key under which a non-mapped column is exposed, e.g. `Class Name` -> `class_name`.
pub fn field_key(header: &str) -> String {
    normalize_header(header)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone)]
pub struct ColumnMap {
    name: usize,
    email: usize,
    amount: usize,
    date: Option<usize>,
    payment_method: Option<usize>,
    extra: Vec<(usize, String)>,
}

impl ColumnMap {
    pub fn from_headers(headers: &[CellValue], source: &str) -> Result<Self> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| normalize_header(&h.as_text()))
            .collect();

        let find = |field: &str| -> Option<usize> {
            let aliases = COLUMN_ALIASES
                .iter()
                .find(|(name, _)| *name == field)
                .map(|(_, aliases)| *aliases)
                .unwrap_or(&[]);
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
        };

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|field| find(field).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ReceiptError::file(
                source,
                format!(
                    "Missing required columns: {}. Update the spreadsheet headers.",
                    missing.join(", ")
                ),
            ));
        }

        let mut map = Self {
            name: find("name").unwrap_or_default(),
            email: find("email").unwrap_or_default(),
            amount: find("amount").unwrap_or_default(),
            date: find("date"),
            payment_method: find("payment_method"),
            extra: Vec::new(),
        };

        let mapped = [
            Some(map.name),
            Some(map.email),
            Some(map.amount),
            map.date,
            map.payment_method,
        ];
        map.extra = normalized
            .iter()
            .enumerate()
            .filter(|(idx, header)| !header.is_empty() && !mapped.contains(&Some(*idx)))
            .map(|(idx, header)| (idx, field_key(header)))
            .collect();

        Ok(map)
    }
}

/// Cells of one spreadsheet row with its 1-based line in the source file.
type RawRows = Box<dyn Iterator<Item = Result<(usize, Vec<CellValue>)>>>;

/// Lazily converts spreadsheet rows into records; blank rows are skipped.
pub struct StudentRows {
    rows: RawRows,
    columns: ColumnMap,
    currency: String,
    default_payment_method: String,
}

impl StudentRows {
    fn build(&self, row: usize, cells: &[CellValue]) -> Result<StudentRecord> {
        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or(CellValue::Empty);
        let optional = |idx: Option<usize>| idx.map(cell).unwrap_or(CellValue::Empty);

        let name = cell(self.columns.name).as_text().trim().to_string();
        let email = cell(self.columns.email).as_text().trim().to_string();
        if name.is_empty() || email.is_empty() {
            return Err(ReceiptError::RowError {
                row,
                message: "Missing name or email".to_string(),
            });
        }

        let payment_method = optional(self.columns.payment_method).as_text().trim().to_string();
        let payment_method = if payment_method.is_empty() {
            self.default_payment_method.clone()
        } else {
            payment_method
        };

        let extra: BTreeMap<String, String> = self
            .columns
            .extra
            .iter()
            .filter_map(|(idx, key)| {
                let value = cell(*idx);
                (!value.is_blank()).then(|| (key.clone(), value.as_text()))
            })
            .collect();

        Ok(StudentRecord {
            row,
            name,
            email,
            amount: format_amount(&cell(self.columns.amount), &self.currency),
            date: optional(self.columns.date).as_text().trim().to_string(),
            payment_method,
            receipt_number: format!("R-{:04}", row),
            extra,
        })
    }
}

impl Iterator for StudentRows {
    type Item = Result<StudentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (row, cells) = match self.rows.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };

            if cells.iter().all(CellValue::is_blank) {
                tracing::debug!("Skipping blank row {}", row);
                continue;
            }
            return Some(self.build(row, &cells));
        }
    }
}

/// Opens the spreadsheet and maps its header row; rows are read on iteration.
pub fn read_students(path: &Path, config: &ReceiptConfig) -> Result<StudentRows> {
    let source = path.display().to_string();
    if !path.is_file() {
        return Err(ReceiptError::file(&source, "spreadsheet does not exist"));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let mut rows = if extension == "csv" {
        csv_rows(path)?
    } else {
        workbook_rows(path)?
    };

    let (_, headers) = match rows.next() {
        Some(headers) => headers?,
        None => return Err(ReceiptError::file(&source, "spreadsheet is empty")),
    };
    let columns = ColumnMap::from_headers(&headers, &source)?;
    tracing::debug!("Mapped columns for {}: {:?}", source, columns);

    Ok(StudentRows {
        rows,
        columns,
        currency: config.currency.clone(),
        default_payment_method: config.default_payment_method.clone(),
    })
}

/// Rows are numbered by the line each record starts on, so empty lines and
/// quoted multi-line fields do not shift later receipt numbers.
fn csv_rows(path: &Path) -> Result<RawRows> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut last_line = 0;
    Ok(Box::new(reader.into_records().map(
        move |record| -> Result<(usize, Vec<CellValue>)> {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    let row = e
                        .position()
                        .map(|p| p.line() as usize)
                        .unwrap_or(last_line + 1);
                    last_line = row;
                    return Err(ReceiptError::RowError {
                        row,
                        message: e.to_string(),
                    });
                }
            };
            let row = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(last_line + 1);
            last_line = row;

            let cells = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect();
            Ok((row, cells))
        },
    )))
}

/// First worksheet of an Excel/ODS workbook. The used range may start below
/// row 1, so row numbers are offset by its first cell.
fn workbook_rows(path: &Path) -> Result<RawRows> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReceiptError::file(path.display().to_string(), "workbook has no worksheets"))??;

    let first_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let (height, width) = range.get_size();

    let rows = (0..height).map(move |r| -> Result<(usize, Vec<CellValue>)> {
        let cells = (0..width)
            .map(|c| range.get((r, c)).map(cell_from_data).unwrap_or(CellValue::Empty))
            .collect();
        Ok((first_row + r, cells))
    });
    Ok(Box::new(rows))
}
