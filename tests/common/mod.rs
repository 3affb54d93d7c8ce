// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tabula::application::{ConvertRequest, TransformOptions};
use tabula::io::export::ExportOptions;
use tabula::io::source::{LedgerSource, Table};
use tempfile::TempDir;

pub static METADATA_HEADER: [&str; 2] = ["項目", "内容"];

pub static ITEMS_HEADER: [&str; 8] = [
    "タイプ",
    "年月日",
    "カテゴリー",
    "飲食ジャンル",
    "支出先/寄附者",
    "金額（円）",
    "住所",
    "URL",
];

/// Metadata of a complete fiscal-year ledger
pub fn sample_metadata() -> Vec<[&'static str; 2]> {
    vec![
        ["政治家", "林芳正"],
        ["政治団体", "林芳正を支える会"],
        ["年度", "2023"],
        ["政党", "自民"],
        ["世襲", "4代目"],
        ["収入合計", "52000000"],
        ["今年の収入", "30000000"],
        ["今年の支出", "28000000"],
        ["昨年からの繰越", "22000000"],
        ["余ったお金の繰越", "24000000"],
    ]
}

/// Line items covering the date formats and an escaped counterparty
pub fn sample_items() -> Vec<[&'static str; 8]> {
    vec![
        [
            "収入",
            "2023-04-01 00:00:00",
            "個人からの寄附",
            "",
            "山田太郎",
            "150000",
            "山口県下関市",
            "",
        ],
        [
            "支出",
            "2023/04/01 - 2023/04/03",
            "組織活動費",
            "和食",
            "O'Brien's café",
            "32000",
            "東京都港区",
            "https://example.com/obrien",
        ],
        ["支出", "N/A", "政治活動費", "", "事務所", "5000", "", ""],
        [
            "収入",
            "2023/12/31",
            "政治団体からの寄附",
            "",
            "自民党山口県支部",
            "1000000",
            "",
            "",
        ],
    ]
}

/// Write one sheet as `<dir>/<name>.csv`
pub fn write_sheet<R: AsRef<[&'static str]>>(
    dir: &Path,
    name: &str,
    header: &[&str],
    rows: &[R],
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(dir.join(format!("{}.csv", name)))?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row.as_ref())?;
    }
    writer.flush()?;
    Ok(())
}

/// Helper to create a ledger directory with both sheets
pub fn write_ledger<M, I>(metadata: &[M], items: &[I]) -> Result<(TempDir, PathBuf)>
where
    M: AsRef<[&'static str]>,
    I: AsRef<[&'static str]>,
{
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("hayashi");
    std::fs::create_dir(&input)?;
    write_sheet(&input, "META DATA", &METADATA_HEADER, metadata)?;
    write_sheet(&input, "LINE ITEMS", &ITEMS_HEADER, items)?;
    Ok((temp_dir, input))
}

/// Write the ledger as `hayashi.xlsx`. Dates become date-formatted cells and
/// numbers become numeric cells, the way a hand-kept workbook stores them.
/// `items: None` leaves the line-item sheet out.
pub fn write_workbook(
    metadata: &[[&'static str; 2]],
    items: Option<&[[&'static str; 8]]>,
) -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("hayashi.xlsx");
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("META DATA")?;
    write_rows(sheet, &METADATA_HEADER, metadata, &date_format)?;

    if let Some(items) = items {
        let sheet = workbook.add_worksheet().set_name("LINE ITEMS")?;
        write_rows(sheet, &ITEMS_HEADER, items, &date_format)?;
    }

    workbook.save(&path)?;
    Ok((temp_dir, path))
}

pub fn sample_workbook() -> Result<(TempDir, PathBuf)> {
    write_workbook(&sample_metadata(), Some(sample_items().as_slice()))
}

fn write_rows<R: AsRef<[&'static str]>>(
    sheet: &mut Worksheet,
    header: &[&str],
    rows: &[R],
    date_format: &Format,
) -> Result<()> {
    for (col, title) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let row_num = idx as u32 + 1;
        for (col, value) in row.as_ref().iter().enumerate() {
            let col = col as u16;
            if value.is_empty() {
                continue;
            }
            if let Some(date) = fixture_date(value) {
                let date =
                    ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8)?;
                sheet.write_datetime_with_format(row_num, col, &date, date_format)?;
            } else if let Ok(number) = value.parse::<f64>() {
                sheet.write_number(row_num, col, number)?;
            } else {
                sheet.write_string(row_num, col, *value)?;
            }
        }
    }
    Ok(())
}

/// Single dates of the fixtures; ranges and placeholders stay text.
fn fixture_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y/%m/%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

pub fn sample_ledger() -> Result<(TempDir, PathBuf)> {
    write_ledger(&sample_metadata(), &sample_items())
}

/// The sample ledger as an in-memory source
pub fn sample_source() -> LedgerSource {
    let metadata_rows = sample_metadata();
    let metadata: Vec<&[&str]> = std::iter::once(&METADATA_HEADER[..])
        .chain(metadata_rows.iter().map(|row| &row[..]))
        .collect();
    let items_rows = sample_items();
    let items: Vec<&[&str]> = std::iter::once(&ITEMS_HEADER[..])
        .chain(items_rows.iter().map(|row| &row[..]))
        .collect();
    LedgerSource::new(
        Table::from_strings("META DATA", &metadata),
        Table::from_strings("LINE ITEMS", &items),
    )
}

pub fn request(input: &Path, output: &Path) -> ConvertRequest {
    ConvertRequest {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        transform: TransformOptions::default(),
        export: ExportOptions::new("hayashi").with_source_label("hayashi.xlsx"),
    }
}
