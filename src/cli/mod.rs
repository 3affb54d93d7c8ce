use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use crate::application::{
    ConvertRequest, DEFAULT_INCOME_MARKER, DEFAULT_LINE_ITEMS_SHEET, DEFAULT_METADATA_SHEET,
    TransformOptions, convert,
};
use crate::domain::{DEFAULT_FALLBACK_DATE, TransactionType, format_amount};
use crate::io::export::{ExportOptions, OutputFormat};
use crate::io::{import, source};

/// Tabula - political-funds ledger converter
#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Turns a political-funds ledger workbook into a static report data module")]
#[command(version)]
pub struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a ledger workbook (or a directory of CSV sheets) into a report artifact
    Convert {
        /// Workbook file (.xlsx, .xls, .ods, ...) or directory with one CSV per sheet
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Prefix of the exported constants (e.g. "hayashi" -> hayashiStaticReport)
        #[arg(short, long)]
        name: String,

        /// Display name of the politician (defaults to the metadata value)
        #[arg(short, long)]
        entity: Option<String>,

        /// Headshot image URL added to the politician block
        #[arg(long)]
        headshot: Option<String>,

        /// Format: ts, json (default: from the output extension)
        #[arg(short, long)]
        format: Option<String>,

        /// Type label that marks income rows
        #[arg(long, default_value = DEFAULT_INCOME_MARKER)]
        income_marker: String,

        /// Date used when a row's date cannot be read (YYYY-MM-DD)
        #[arg(long, default_value = DEFAULT_FALLBACK_DATE)]
        fallback_date: String,

        /// Name of the metadata sheet
        #[arg(long, default_value = DEFAULT_METADATA_SHEET)]
        metadata_sheet: String,

        /// Name of the line-item sheet
        #[arg(long, default_value = DEFAULT_LINE_ITEMS_SHEET)]
        items_sheet: String,
    },

    /// List the sheets of an input with their size and header row
    Inspect {
        /// Workbook file or directory of CSV sheets
        input: PathBuf,
    },

    /// Read a generated artifact back and check its transactions
    Verify {
        /// Artifact file
        artifact: PathBuf,

        /// Format: ts, json (default: from the file extension)
        #[arg(short, long)]
        format: Option<String>,
    },
}

impl Cli {
    /// Log filter for the verbosity flag. `RUST_LOG` still wins when set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    pub fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.log_level());
        env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .init();
    }

    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Convert {
                input,
                output,
                name,
                entity,
                headshot,
                format,
                income_marker,
                fallback_date,
                metadata_sheet,
                items_sheet,
            } => {
                let fallback_date = parse_date(&fallback_date).with_context(|| {
                    format!("Invalid fallback date '{}'. Use YYYY-MM-DD", fallback_date)
                })?;
                let format = resolve_format(format.as_deref(), &output)?;

                let mut export = ExportOptions::new(name).with_format(format);
                if let Some(entity) = entity {
                    export = export.with_display_name(entity);
                }
                if let Some(url) = headshot {
                    export = export.with_headshot_url(url);
                }

                let request = ConvertRequest {
                    input,
                    output,
                    transform: TransformOptions::default()
                        .with_income_marker(income_marker)
                        .with_fallback_date(fallback_date)
                        .with_metadata_sheet(metadata_sheet)
                        .with_line_items_sheet(items_sheet),
                    export,
                };
                run_convert_command(&request)?;
            }

            Commands::Inspect { input } => {
                run_inspect_command(&input)?;
            }

            Commands::Verify { artifact, format } => {
                let format = resolve_format(format.as_deref(), &artifact)?;
                run_verify_command(&artifact, format)?;
            }
        }

        Ok(())
    }
}

fn run_convert_command(request: &ConvertRequest) -> Result<()> {
    let summary = convert(request)
        .with_context(|| format!("Failed converting {}", request.input.display()))?;

    println!(
        "Successfully created {} ({} bytes)",
        summary.output.display(),
        summary.bytes_written
    );
    println!("Total transactions: {}", summary.total);
    println!(
        "Income transactions: {} ({})",
        summary.income,
        format_amount(summary.income_amount)
    );
    println!(
        "Expense transactions: {} ({})",
        summary.expense,
        format_amount(summary.expense_amount)
    );

    if !summary.fallbacks.is_empty() {
        println!(
            "\nDefaulted dates ({} -> {}):",
            summary.fallbacks.len(),
            request.transform.fallback_date
        );
        for fallback in summary.fallbacks.iter().take(10) {
            println!(
                "  Row {} ({}): {:?}",
                fallback.row, fallback.id, fallback.raw
            );
        }
        if summary.fallbacks.len() > 10 {
            println!("  ... and {} more", summary.fallbacks.len() - 10);
        }
    }

    Ok(())
}

fn run_inspect_command(input: &Path) -> Result<()> {
    let sheets = source::inspect(input)
        .with_context(|| format!("Failed inspecting {}", input.display()))?;

    println!("Sheets ({}):", sheets.len());
    for sheet in &sheets {
        println!("\n== {} ==", sheet.name);
        println!("  size: rows={}, cols={}", sheet.rows, sheet.columns);
        if sheet.header.iter().all(String::is_empty) {
            println!("  header: (none)");
        } else {
            println!("  header: {}", sheet.header.join(" | "));
        }
    }

    Ok(())
}

fn run_verify_command(artifact: &Path, format: OutputFormat) -> Result<()> {
    let text = fs::read_to_string(artifact)
        .with_context(|| format!("Failed to read artifact: {}", artifact.display()))?;

    let report = import::read_report(&text, format)?;
    let records = import::transactions_of(&report)?;

    let income: i64 = records.iter().filter(|r| r.is_income()).map(|r| r.amount).sum();
    let expense: i64 = records.iter().filter(|r| !r.is_income()).map(|r| r.amount).sum();

    println!(
        "{} ({} fiscal year)",
        report.politician.name, report.politician.fiscal_year
    );
    println!("  Transactions: {}", records.len());
    println!(
        "  Income:       {} ({})",
        report.count(TransactionType::Income),
        format_amount(income)
    );
    println!(
        "  Expense:      {} ({})",
        report.count(TransactionType::Expense),
        format_amount(expense)
    );
    println!("Identifiers OK");

    Ok(())
}

fn resolve_format(format: Option<&str>, path: &Path) -> Result<OutputFormat> {
    match format {
        Some(s) => OutputFormat::from_str(s)
            .ok_or_else(|| anyhow::anyhow!("Invalid format '{}'. Valid formats: ts, json", s)),
        None => Ok(OutputFormat::from_path(path)),
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_arguments() {
        let cli = Cli::try_parse_from([
            "tabula",
            "convert",
            "aso.xlsx",
            "-o",
            "lib/data/aso-static-data.ts",
            "--name",
            "aso",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.log_level(), "debug");
        match cli.command {
            Commands::Convert {
                input,
                name,
                income_marker,
                fallback_date,
                metadata_sheet,
                items_sheet,
                ..
            } => {
                assert_eq!(input, PathBuf::from("aso.xlsx"));
                assert_eq!(name, "aso");
                assert_eq!(income_marker, "収入");
                assert_eq!(fallback_date, "2023-01-01");
                assert_eq!(metadata_sheet, "META DATA");
                assert_eq!(items_sheet, "LINE ITEMS");
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_convert_requires_output_and_name() {
        assert!(Cli::try_parse_from(["tabula", "convert", "aso.xlsx"]).is_err());
        assert!(Cli::try_parse_from(["tabula", "convert", "aso.xlsx", "-o", "out.ts"]).is_err());
    }

    #[test]
    fn test_resolve_format() {
        let ts = Path::new("out.ts");
        assert_eq!(resolve_format(None, ts).unwrap(), OutputFormat::TypeScript);
        assert_eq!(resolve_format(Some("json"), ts).unwrap(), OutputFormat::Json);
        assert!(resolve_format(Some("xml"), ts).is_err());
    }
}
