use anyhow::{Context, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;

use crate::application::AppError;
use crate::domain::excel_serial_to_date;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A single spreadsheet cell, detached from the reader that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    pub fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
                Some(date) => Cell::Date(date),
                None => Cell::Float(dt.as_f64()),
            },
            Data::DateTimeIso(s) => match iso_date(s) {
                Some(date) => Cell::Date(date),
                None => Cell::Text(s.clone()),
            },
            other => Cell::Text(other.to_string()),
        }
    }

    /// Blank cells are empty, whitespace-only text or NaN.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Trimmed text of the cell, empty for blank cells.
    /// Integral floats render without a fraction so `2023.0` reads as "2023".
    pub fn text(&self) -> String {
        if self.is_blank() {
            return String::new();
        }
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            Cell::Float(f) => f.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Date part of an ISO 8601 cell value, as OpenDocument stores date cells.
fn iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

/// One named region of the source. The first row is the header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Build a table from string rows, mostly for fixtures.
    pub fn from_strings(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|s| Cell::from(*s)).collect())
            .collect();
        Self::new(name, rows)
    }

    pub fn header(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.iter().map(Cell::text).collect())
            .unwrap_or_default()
    }

    /// Rows after the header, paired with their 1-based sheet row number.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, row)| (idx + 1, row.as_slice()))
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Cell at `column`, or an empty cell for short rows and absent columns.
pub fn cell_at(row: &[Cell], column: Option<usize>) -> &Cell {
    column.and_then(|idx| row.get(idx)).unwrap_or(&EMPTY)
}

/// The two regions a ledger is made of.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSource {
    pub metadata: Table,
    pub line_items: Table,
}

impl LedgerSource {
    pub fn new(metadata: Table, line_items: Table) -> Self {
        Self {
            metadata,
            line_items,
        }
    }

    /// Open a workbook file, or a directory holding one CSV file per region.
    pub fn open(
        path: &Path,
        metadata_sheet: &str,
        line_items_sheet: &str,
    ) -> Result<Self, AppError> {
        if path.is_dir() {
            log::info!("Reading CSV regions from {}", path.display());
            return Ok(Self::new(
                read_csv_table(path, metadata_sheet)?,
                read_csv_table(path, line_items_sheet)?,
            ));
        }

        if is_workbook(path) {
            log::info!("Reading workbook {}", path.display());
            let mut sheets = read_workbook(path)?;
            let mut take = |name: &str| {
                sheets
                    .iter()
                    .position(|t| t.name == name)
                    .map(|idx| sheets.swap_remove(idx))
                    .ok_or_else(|| AppError::MissingSheet(name.to_string()))
            };
            let metadata = take(metadata_sheet)?;
            let line_items = take(line_items_sheet)?;
            return Ok(Self::new(metadata, line_items));
        }

        Err(AppError::Source(anyhow!(
            "Unsupported input {} (expected a workbook or a directory of CSV files)",
            path.display()
        )))
    }
}

/// Size and header row of one region, for `inspect`.
#[derive(Debug, Clone)]
pub struct SheetOverview {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub header: Vec<String>,
}

impl From<&Table> for SheetOverview {
    fn from(table: &Table) -> Self {
        Self {
            name: table.name.clone(),
            rows: table.rows.len(),
            columns: table.width(),
            header: table.header(),
        }
    }
}

/// List every region the input offers.
pub fn inspect(path: &Path) -> Result<Vec<SheetOverview>, AppError> {
    let tables = if path.is_dir() {
        let mut names: Vec<String> = fs::read_dir(path)
            .with_context(|| format!("Cannot read directory {}", path.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("csv"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        names.sort();
        names
            .iter()
            .map(|name| read_csv_table(path, name))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        read_workbook(path)?
    };

    Ok(tables.iter().map(SheetOverview::from).collect())
}

fn is_workbook(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
}

fn read_workbook(path: &Path) -> Result<Vec<Table>, AppError> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Cannot open workbook {}", path.display()))?;

    let mut tables = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Cannot read sheet '{}' in {}", name, path.display()))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from_data).collect())
            .collect();
        log::debug!("Sheet '{}': {:?}", name, range.get_size());
        tables.push(Table::new(name, rows));
    }
    Ok(tables)
}

fn read_csv_table(dir: &Path, name: &str) -> Result<Table, AppError> {
    let path = dir.join(format!("{}.csv", name));
    if !path.is_file() {
        return Err(AppError::MissingSheet(name.to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .with_context(|| format!("Cannot open {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("CSV parse error in {} at row {}", path.display(), idx + 1)
        })?;
        let row: Vec<Cell> = record
            .iter()
            .map(|field| Cell::from(field.trim_start_matches('\u{feff}')))
            .collect();
        rows.push(row);
    }

    Ok(Table::new(name, rows))
}
