use std::collections::HashMap;

use super::{Amount, ReportMetadata, TransactionRecord, TransactionType};

/// Metadata plus line items in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub transactions: Vec<TransactionRecord>,
}

impl Report {
    pub fn new(metadata: ReportMetadata, transactions: Vec<TransactionRecord>) -> Self {
        Self {
            metadata,
            transactions,
        }
    }

    pub fn count(&self, kind: TransactionType) -> usize {
        self.transactions.iter().filter(|t| t.kind == kind).count()
    }

    /// Sum of the line items of one type. Not necessarily equal to the metadata totals.
    pub fn sum(&self, kind: TransactionType) -> Amount {
        self.transactions
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    }
}

/// Verify that ids are unique per type and count up from 0 in row order.
pub fn check_identifiers(transactions: &[TransactionRecord]) -> Result<(), IdentifierError> {
    let mut expected: HashMap<TransactionType, usize> = HashMap::new();

    for (position, record) in transactions.iter().enumerate() {
        if record.id.kind != record.kind {
            return Err(IdentifierError::KindMismatch {
                position,
                id: record.id.to_string(),
            });
        }
        let next = expected.entry(record.kind).or_insert(0);
        if record.id.sequence != *next {
            return Err(IdentifierError::OutOfSequence {
                position,
                id: record.id.to_string(),
                expected: *next,
            });
        }
        *next += 1;
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    KindMismatch {
        position: usize,
        id: String,
    },
    OutOfSequence {
        position: usize,
        id: String,
        expected: usize,
    },
}

impl std::fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierError::KindMismatch { position, id } => {
                write!(f, "Transaction {} ({}) has an id of another type", position, id)
            }
            IdentifierError::OutOfSequence {
                position,
                id,
                expected,
            } => {
                write!(
                    f,
                    "Transaction {} has id {} but sequence {} was expected",
                    position, id, expected
                )
            }
        }
    }
}

impl std::error::Error for IdentifierError {}
