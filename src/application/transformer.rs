use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::{
    Amount, IdAllocator, MetadataField, Report, ReportMetadata, TransactionId, TransactionRecord,
    TransactionType, amount_from_float, default_fallback_date, excel_serial_to_date,
    parse_amount, parse_ledger_date,
};
use crate::io::source::{Cell, LedgerSource, Table, cell_at};

use super::AppError;

pub const DEFAULT_INCOME_MARKER: &str = "収入";
pub const DEFAULT_METADATA_SHEET: &str = "META DATA";
pub const DEFAULT_LINE_ITEMS_SHEET: &str = "LINE ITEMS";

const LABEL_ALIASES: &[&str] = &["項目", "LABEL", "KEY"];
const VALUE_ALIASES: &[&str] = &["内容", "VALUE"];

/// Knobs of the transformer. Defaults match the political-funds workbooks.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub income_marker: String,
    pub fallback_date: NaiveDate,
    pub metadata_sheet: String,
    pub line_items_sheet: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            income_marker: DEFAULT_INCOME_MARKER.to_string(),
            fallback_date: default_fallback_date(),
            metadata_sheet: DEFAULT_METADATA_SHEET.to_string(),
            line_items_sheet: DEFAULT_LINE_ITEMS_SHEET.to_string(),
        }
    }
}

impl TransformOptions {
    pub fn with_income_marker(mut self, marker: impl Into<String>) -> Self {
        self.income_marker = marker.into();
        self
    }

    pub fn with_fallback_date(mut self, date: NaiveDate) -> Self {
        self.fallback_date = date;
        self
    }

    pub fn with_metadata_sheet(mut self, name: impl Into<String>) -> Self {
        self.metadata_sheet = name.into();
        self
    }

    pub fn with_line_items_sheet(mut self, name: impl Into<String>) -> Self {
        self.line_items_sheet = name.into();
        self
    }
}

/// Column roles of the line-item table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Type,
    Date,
    Category,
    Counterparty,
    Amount,
    Subcategory,
    Location,
    Url,
}

impl Column {
    /// Required roles first so they claim their headers before optional ones.
    pub const ALL: [Column; 8] = [
        Column::Type,
        Column::Date,
        Column::Category,
        Column::Counterparty,
        Column::Amount,
        Column::Subcategory,
        Column::Location,
        Column::Url,
    ];

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Type => &["タイプ", "TYPE"],
            Column::Date => &["年月日", "日付", "DATE"],
            Column::Category => &["カテゴリー", "CATEGORY"],
            Column::Counterparty => &[
                "支出先/寄附者",
                "寄付者・受給者",
                "寄附者",
                "支出先",
                "RECIPIENT",
                "DESCRIPTION",
            ],
            Column::Amount => &["金額（円）", "金額", "AMOUNT"],
            Column::Subcategory => &["飲食ジャンル", "サブカテゴリー", "ジャンル", "SUBCATEGORY"],
            Column::Location => &["住所", "LOCATION", "ADDRESS"],
            Column::Url => &["URL", "ウェブサイト"],
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, Column::Subcategory | Column::Location | Column::Url)
    }
}

/// Header position of each column role found in a line-item table.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    positions: HashMap<Column, usize>,
}

impl ColumnMap {
    pub fn resolve(table: &Table) -> Result<Self, AppError> {
        let header = table.header();
        let mut positions = HashMap::new();

        for column in Column::ALL {
            let taken: Vec<usize> = positions.values().copied().collect();
            match find_header(&header, column.aliases(), &taken) {
                Some(idx) => {
                    positions.insert(column, idx);
                }
                None if column.is_required() => {
                    return Err(AppError::MissingColumn {
                        sheet: table.name.clone(),
                        column: column.aliases()[0].to_string(),
                    });
                }
                None => log::debug!("Optional column {:?} absent", column),
            }
        }

        Ok(Self { positions })
    }

    pub fn get(&self, column: Column) -> Option<usize> {
        self.positions.get(&column).copied()
    }
}

/// Exact match on any alias first, then the first header containing one.
fn find_header(header: &[String], aliases: &[&str], taken: &[usize]) -> Option<usize> {
    let free = |idx: &usize| !taken.contains(idx);

    for alias in aliases {
        if let Some(idx) = (0..header.len())
            .filter(free)
            .find(|idx| header[*idx].trim().eq_ignore_ascii_case(alias))
        {
            return Some(idx);
        }
    }

    for alias in aliases {
        let alias = alias.to_uppercase();
        if let Some(idx) = (0..header.len())
            .filter(free)
            .find(|idx| !header[*idx].is_empty() && header[*idx].to_uppercase().contains(&alias))
        {
            return Some(idx);
        }
    }

    None
}

/// A line item whose date could not be read and was defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFallback {
    /// 1-based sheet row
    pub row: usize,
    pub id: TransactionId,
    pub raw: String,
}

/// Normalized record plus whether its date was substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub record: TransactionRecord,
    pub date_fallback: bool,
}

/// Output of a full transform.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub report: Report,
    pub fallbacks: Vec<DateFallback>,
}

/// Turns the two regions of a ledger into a [`Report`].
pub struct LedgerTransformer {
    options: TransformOptions,
}

impl LedgerTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Read the metadata region into typed fields.
    pub fn load_metadata(&self, table: &Table) -> Result<ReportMetadata, AppError> {
        let header = table.header();
        let missing_column = |column: &str| AppError::MissingColumn {
            sheet: table.name.clone(),
            column: column.to_string(),
        };
        let label_col =
            find_header(&header, LABEL_ALIASES, &[]).ok_or_else(|| missing_column(LABEL_ALIASES[0]))?;
        let value_col = find_header(&header, VALUE_ALIASES, &[label_col])
            .ok_or_else(|| missing_column(VALUE_ALIASES[0]))?;

        let mut values: HashMap<MetadataField, &Cell> = HashMap::new();
        for (row_number, row) in table.data_rows() {
            let label = cell_at(row, Some(label_col)).text();
            if label.is_empty() {
                continue;
            }
            match MetadataField::ALL.into_iter().find(|f| f.matches(&label)) {
                Some(field) => {
                    // Later rows override earlier ones
                    if values.insert(field, cell_at(row, Some(value_col))).is_some() {
                        log::debug!("Metadata row {} repeats {}", row_number, field.label());
                    }
                }
                None => log::debug!("Ignoring metadata row {}: {}", row_number, label),
            }
        }

        let text = |field: MetadataField| -> Result<String, AppError> {
            values
                .get(&field)
                .map(|cell| cell.text())
                .ok_or_else(|| AppError::MissingMetadata(field.label().to_string()))
        };
        let number = |field: MetadataField| -> Result<Option<i64>, AppError> {
            match values.get(&field) {
                Some(cell) => integer_from_cell(cell).map(Some).ok_or_else(|| {
                    AppError::InvalidNumeric {
                        label: field.label().to_string(),
                        value: cell.text(),
                    }
                }),
                None if field.is_required() => {
                    Err(AppError::MissingMetadata(field.label().to_string()))
                }
                None => Ok(None),
            }
        };
        let required = |field: MetadataField| -> Result<i64, AppError> {
            number(field)?.ok_or_else(|| AppError::MissingMetadata(field.label().to_string()))
        };

        Ok(ReportMetadata {
            politician: text(MetadataField::Politician)?,
            organization: text(MetadataField::Organization)?,
            fiscal_year: required(MetadataField::FiscalYear)?,
            party: text(MetadataField::Party)?,
            hereditary: text(MetadataField::Hereditary)?,
            election_count: number(MetadataField::ElectionCount)?,
            income_total: required(MetadataField::IncomeTotal)?,
            this_year_income: required(MetadataField::ThisYearIncome)?,
            this_year_expense: required(MetadataField::ThisYearExpense)?,
            carried_from_prev: required(MetadataField::CarriedFromPrev)?,
            carried_to_next: required(MetadataField::CarriedToNext)?,
        })
    }

    /// Normalize one non-blank line-item row.
    pub fn normalize_row(
        &self,
        row_number: usize,
        row: &[Cell],
        columns: &ColumnMap,
        ids: &mut IdAllocator,
    ) -> Result<NormalizedRow, AppError> {
        let field = |column: Column| cell_at(row, columns.get(column));

        let kind = TransactionType::classify(&field(Column::Type).text(), &self.options.income_marker);

        let amount_cell = field(Column::Amount);
        let amount = integer_from_cell(amount_cell).ok_or_else(|| AppError::InvalidAmount {
            row: row_number,
            value: amount_cell.text(),
        })?;

        let (date, date_fallback) = match date_from_cell(field(Column::Date)) {
            Some(date) => (date, false),
            None => (self.options.fallback_date, true),
        };

        let record = TransactionRecord::new(ids.next(kind), amount, date)
            .with_category(field(Column::Category).text())
            .with_subcategory(field(Column::Subcategory).text())
            .with_counterparty(field(Column::Counterparty).text())
            .with_location(field(Column::Location).text())
            .with_url(field(Column::Url).text());

        Ok(NormalizedRow {
            record,
            date_fallback,
        })
    }

    /// Load metadata, normalize every line item in order, and collect date fallbacks.
    pub fn transform(&self, source: &LedgerSource) -> Result<Conversion, AppError> {
        let metadata = self.load_metadata(&source.metadata)?;
        log::info!(
            "Metadata loaded for {} ({})",
            metadata.politician,
            metadata.fiscal_year
        );

        let table = &source.line_items;
        let columns = ColumnMap::resolve(table)?;

        let mut ids = IdAllocator::new();
        let mut transactions = Vec::new();
        let mut fallbacks = Vec::new();

        for (row_number, row) in table.data_rows() {
            if row.iter().all(Cell::is_blank) {
                log::debug!("Skipping blank row {}", row_number);
                continue;
            }

            let normalized = self.normalize_row(row_number, row, &columns, &mut ids)?;
            if normalized.date_fallback {
                let raw = cell_at(row, columns.get(Column::Date)).text();
                log::warn!(
                    "Row {}: unreadable date {:?}, using {}",
                    row_number,
                    raw,
                    self.options.fallback_date
                );
                fallbacks.push(DateFallback {
                    row: row_number,
                    id: normalized.record.id,
                    raw,
                });
            }

            log::debug!("Row {} -> {}", row_number, normalized.record.id);
            transactions.push(normalized.record);
        }

        if transactions.is_empty() {
            return Err(AppError::EmptyLineItems(table.name.clone()));
        }

        log::info!(
            "Normalized {} line items ({} income, {} expense)",
            transactions.len(),
            ids.issued(TransactionType::Income),
            ids.issued(TransactionType::Expense)
        );

        Ok(Conversion {
            report: Report::new(metadata, transactions),
            fallbacks,
        })
    }
}

/// Integer value of a numeric cell or numeric text.
fn integer_from_cell(cell: &Cell) -> Option<Amount> {
    match cell {
        Cell::Int(i) => Some(*i),
        Cell::Float(f) => amount_from_float(*f).ok(),
        Cell::Text(s) => parse_amount(s).ok(),
        Cell::Empty | Cell::Bool(_) | Cell::Date(_) => None,
    }
}

fn date_from_cell(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(date) => Some(*date),
        Cell::Int(serial) => excel_serial_to_date(*serial as f64),
        Cell::Float(serial) => excel_serial_to_date(*serial),
        Cell::Text(s) => parse_ledger_date(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}
