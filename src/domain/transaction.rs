use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Donations, party grants and other money received
    Income,
    /// Everything else recorded in the line-item table
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            _ => None,
        }
    }

    /// Classify a source-language type label. Only the income marker means income.
    pub fn classify(label: &str, income_marker: &str) -> Self {
        if label.trim() == income_marker {
            TransactionType::Income
        } else {
            TransactionType::Expense
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type-scoped identifier, rendered as `income-0`, `expense-12`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId {
    pub kind: TransactionType,
    pub sequence: usize,
}

impl TransactionId {
    pub fn new(kind: TransactionType, sequence: usize) -> Self {
        Self { kind, sequence }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.sequence)
    }
}

impl FromStr for TransactionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, sequence) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("malformed transaction id: {}", s))?;
        let kind = TransactionType::from_str(kind)
            .ok_or_else(|| format!("unknown transaction type in id: {}", s))?;
        let sequence = sequence
            .parse()
            .map_err(|_| format!("malformed sequence in id: {}", s))?;
        Ok(Self { kind, sequence })
    }
}

/// Hands out identifiers in row order, one zero-based counter per type.
#[derive(Debug, Default)]
pub struct IdAllocator {
    income: usize,
    expense: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, kind: TransactionType) -> TransactionId {
        let counter = match kind {
            TransactionType::Income => &mut self.income,
            TransactionType::Expense => &mut self.expense,
        };
        let id = TransactionId::new(kind, *counter);
        *counter += 1;
        id
    }

    pub fn issued(&self, kind: TransactionType) -> usize {
        match kind {
            TransactionType::Income => self.income,
            TransactionType::Expense => self.expense,
        }
    }
}

/// One normalized line item. Built once per source row and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub kind: TransactionType,
    pub category: String,
    /// Empty when the source has no subcategory
    pub subcategory: String,
    /// Donor or payee. Emitted as both `description` and `recipient`.
    pub counterparty: String,
    pub amount: Amount,
    pub date: NaiveDate,
    pub location: String,
    pub url: String,
}

impl TransactionRecord {
    pub fn new(id: TransactionId, amount: Amount, date: NaiveDate) -> Self {
        Self {
            id,
            kind: id.kind,
            category: String::new(),
            subcategory: String::new(),
            counterparty: String::new(),
            amount,
            date,
            location: String::new(),
            url: String::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = subcategory.into();
        self
    }

    pub fn with_counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = counterparty.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }
}
