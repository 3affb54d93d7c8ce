use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::application::AppError;
use crate::domain::{Amount, Report, TransactionId, TransactionRecord, TransactionType};

/// Target format of the generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// TypeScript module exporting the report as object literals
    #[default]
    TypeScript,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::TypeScript => "ts",
            OutputFormat::Json => "json",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ts" | "typescript" => Some(OutputFormat::TypeScript),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    /// Guess from a file extension; anything but `.json` is TypeScript.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::TypeScript,
        }
    }
}

/// Naming and decoration of the generated artifact.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Prefix of the exported constants: `<name>StaticReport`, `<name>SummaryData`
    pub export_name: String,
    /// Display name of the entity, defaults to the metadata politician
    pub display_name: Option<String>,
    pub headshot_url: Option<String>,
    /// Source file named in the header comment
    pub source_label: Option<String>,
    pub format: OutputFormat,
}

impl ExportOptions {
    pub fn new(export_name: impl Into<String>) -> Self {
        Self {
            export_name: export_name.into(),
            display_name: None,
            headshot_url: None,
            source_label: None,
            format: OutputFormat::default(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_headshot_url(mut self, url: impl Into<String>) -> Self {
        self.headshot_url = Some(url.into());
        self
    }

    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = Some(label.into());
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliticianEntry {
    pub name: String,
    pub organization: String,
    pub fiscal_year: String,
    pub party: String,
    pub hereditary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub election_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headshot_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub income_total: Amount,
    pub expense_total: Amount,
    pub this_year_expense: Amount,
    pub balance: Amount,
    pub carried_from_prev_year: Amount,
    pub carried_to_next_year: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsEntry {
    pub categories: Vec<Value>,
    pub total: Amount,
}

/// Wire shape of one transaction. Field order is fixed for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub recipient: String,
    pub amount: Amount,
    pub date: String,
    pub location: String,
    pub url: String,
}

impl From<&TransactionRecord> for TransactionEntry {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            kind: record.kind,
            category: record.category.clone(),
            subcategory: record.subcategory.clone(),
            // One canonical counterparty, published under both names
            description: record.counterparty.clone(),
            recipient: record.counterparty.clone(),
            amount: record.amount,
            date: record.date.format("%Y-%m-%d").to_string(),
            location: record.location.clone(),
            url: record.url.clone(),
        }
    }
}

impl TryFrom<TransactionEntry> for TransactionRecord {
    type Error = String;

    fn try_from(entry: TransactionEntry) -> Result<Self, Self::Error> {
        let id: TransactionId = entry.id.parse()?;
        if id.kind != entry.kind {
            return Err(format!("id {} does not match type {}", entry.id, entry.kind));
        }
        let date = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d")
            .map_err(|e| format!("bad date {:?} on {}: {}", entry.date, entry.id, e))?;

        Ok(TransactionRecord::new(id, entry.amount, date)
            .with_category(entry.category)
            .with_subcategory(entry.subcategory)
            .with_counterparty(entry.description)
            .with_location(entry.location)
            .with_url(entry.url))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub politician: PoliticianEntry,
    pub summary: SummaryEntry,
    pub income: TotalsEntry,
    pub expenses: TotalsEntry,
    pub transactions: Vec<TransactionEntry>,
}

impl ReportEntry {
    pub fn from_report(report: &Report, headshot_url: Option<&str>) -> Self {
        let meta = &report.metadata;
        Self {
            politician: PoliticianEntry {
                name: meta.politician.clone(),
                organization: meta.organization.clone(),
                fiscal_year: meta.fiscal_year.to_string(),
                party: meta.party.clone(),
                hereditary: meta.hereditary.clone(),
                election_count: meta.election_count,
                headshot_url: headshot_url.map(String::from),
            },
            summary: SummaryEntry {
                income_total: meta.income_total,
                expense_total: meta.this_year_expense,
                this_year_expense: meta.this_year_expense,
                balance: meta.carried_to_next,
                carried_from_prev_year: meta.carried_from_prev,
                carried_to_next_year: meta.carried_to_next,
            },
            income: TotalsEntry {
                categories: Vec::new(),
                total: meta.this_year_income,
            },
            expenses: TotalsEntry {
                categories: Vec::new(),
                total: meta.this_year_expense,
            },
            transactions: report.transactions.iter().map(TransactionEntry::from).collect(),
        }
    }

    pub fn count(&self, kind: TransactionType) -> usize {
        self.transactions.iter().filter(|t| t.kind == kind).count()
    }
}

/// Render the report in the configured format. The result is complete text, ready to write once.
pub fn render(report: &Report, options: &ExportOptions) -> Result<String, AppError> {
    let entry = ReportEntry::from_report(report, options.headshot_url.as_deref());
    let tree = serde_json::to_value(&entry).context("Cannot build report tree")?;

    match options.format {
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(&tree).context("Cannot encode JSON")?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::TypeScript => render_typescript(report, &tree, options),
    }
}

fn render_typescript(
    report: &Report,
    tree: &Value,
    options: &ExportOptions,
) -> Result<String, AppError> {
    let name = &options.export_name;
    if !is_identifier(name) {
        return Err(AppError::InvalidExportName(name.clone()));
    }
    let display_name = options
        .display_name
        .as_deref()
        .unwrap_or(&report.metadata.politician);

    let mut out = String::new();
    out.push_str("import { ExpenseReport } from '../types';\n\n");
    out.push_str("/**\n");
    out.push_str(&format!(
        " * Static data for {} ({} fiscal year)\n",
        comment_text(display_name),
        report.metadata.fiscal_year
    ));
    if let Some(label) = &options.source_label {
        out.push_str(&format!(" * Data extracted from {}\n", comment_text(label)));
    }
    out.push_str(" */\n");
    out.push_str(&format!(
        "export const {}StaticReport: Omit<ExpenseReport, 'monthlyData' | 'metadata'> = ",
        name
    ));
    write_literal(&mut out, tree, 0);
    out.push_str(";\n\n");

    out.push_str("// Summary data for the landing page table\n");
    out.push_str(&format!("export const {}SummaryData = ", name));
    write_literal(&mut out, &summary_tree(report, display_name, options), 0);
    out.push_str(";\n");

    Ok(out)
}

fn summary_tree(report: &Report, display_name: &str, options: &ExportOptions) -> Value {
    let meta = &report.metadata;

    let mut politician = Map::new();
    politician.insert("name".into(), display_name.into());
    if let Some(url) = &options.headshot_url {
        politician.insert("headshotUrl".into(), url.as_str().into());
    }
    politician.insert("party".into(), meta.party.as_str().into());
    politician.insert("hereditary".into(), meta.hereditary.as_str().into());

    let mut summary = Map::new();
    summary.insert("expenseTotal".into(), meta.this_year_expense.into());

    let mut root = Map::new();
    root.insert("politician".into(), Value::Object(politician));
    root.insert("summary".into(), Value::Object(summary));
    Value::Object(root)
}

/// Write a value as a JavaScript object literal with two-space indentation and trailing commas.
pub fn write_literal(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('\'');
            out.push_str(&escape_text(s));
            out.push('\'');
        }
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) => {
            out.push_str("[\n");
            for item in items {
                indent(out, depth + 1);
                write_literal(out, item, depth + 1);
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push(']');
        }
        Value::Object(fields) if fields.is_empty() => out.push_str("{}"),
        Value::Object(fields) => {
            out.push_str("{\n");
            for (key, field) in fields {
                indent(out, depth + 1);
                if is_identifier(key) {
                    out.push_str(key);
                } else {
                    out.push('\'');
                    out.push_str(&escape_text(key));
                    out.push('\'');
                }
                out.push_str(": ");
                write_literal(out, field, depth + 1);
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push('}');
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

/// Escape text for a single-quoted literal: backslashes and quotes are
/// backslash-escaped, every line break becomes one space.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' | '\u{2028}' | '\u{2029}' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}

/// Text safe inside a `/** */` comment.
fn comment_text(text: &str) -> String {
    escape_text(text).replace("*/", "* /")
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}
