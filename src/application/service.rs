use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{Amount, TransactionType};
use crate::io::export::{ExportOptions, render};
use crate::io::source::LedgerSource;

use super::{AppError, DateFallback, LedgerTransformer, TransformOptions};

/// Everything needed for one conversion run.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub transform: TransformOptions,
    pub export: ExportOptions,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub output: PathBuf,
    pub total: usize,
    pub income: usize,
    pub expense: usize,
    /// Line-item sums, which may differ from the metadata totals
    pub income_amount: Amount,
    pub expense_amount: Amount,
    pub fallbacks: Vec<DateFallback>,
    pub bytes_written: usize,
}

/// Read the ledger, transform it and write the artifact.
/// Nothing is written unless the whole payload was built.
pub fn convert(request: &ConvertRequest) -> Result<ConversionSummary, AppError> {
    let transformer = LedgerTransformer::new(request.transform.clone());
    let source = LedgerSource::open(
        &request.input,
        &transformer.options().metadata_sheet,
        &transformer.options().line_items_sheet,
    )?;

    let conversion = transformer.transform(&source)?;
    let report = &conversion.report;

    let mut export = request.export.clone();
    if export.source_label.is_none() {
        export.source_label = file_label(&request.input);
    }
    let payload = render(report, &export)?;

    write_artifact(&request.output, &payload)?;
    log::info!(
        "Wrote {} bytes to {}",
        payload.len(),
        request.output.display()
    );

    Ok(ConversionSummary {
        output: request.output.clone(),
        total: report.transactions.len(),
        income: report.count(TransactionType::Income),
        expense: report.count(TransactionType::Expense),
        income_amount: report.sum(TransactionType::Income),
        expense_amount: report.sum(TransactionType::Expense),
        fallbacks: conversion.fallbacks,
        bytes_written: payload.len(),
    })
}

fn write_artifact(path: &Path, payload: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {}", parent.display()))?;
    }
    fs::write(path, payload).with_context(|| format!("Cannot write {}", path.display()))?;
    Ok(())
}

fn file_label(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(String::from)
}
