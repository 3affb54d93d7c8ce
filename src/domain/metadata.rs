use super::Amount;

/// A field of the metadata sheet, found under any of its labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Politician,
    Organization,
    FiscalYear,
    Party,
    Hereditary,
    IncomeTotal,
    ThisYearIncome,
    ThisYearExpense,
    CarriedFromPrev,
    CarriedToNext,
    ElectionCount,
}

impl MetadataField {
    pub const ALL: [MetadataField; 11] = [
        MetadataField::Politician,
        MetadataField::Organization,
        MetadataField::FiscalYear,
        MetadataField::Party,
        MetadataField::Hereditary,
        MetadataField::IncomeTotal,
        MetadataField::ThisYearIncome,
        MetadataField::ThisYearExpense,
        MetadataField::CarriedFromPrev,
        MetadataField::CarriedToNext,
        MetadataField::ElectionCount,
    ];

    /// Accepted labels. The first one is the workbook label and is used in error messages.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            MetadataField::Politician => &["政治家", "POLITICIAN"],
            MetadataField::Organization => &["政治団体", "ORGANIZATION"],
            MetadataField::FiscalYear => &["年度", "YEAR", "FISCAL_YEAR"],
            MetadataField::Party => &["政党", "PARTY"],
            MetadataField::Hereditary => &["世襲", "HEREDITARY"],
            MetadataField::IncomeTotal => &["収入合計", "INCOME_TOTAL"],
            MetadataField::ThisYearIncome => &["今年の収入", "THIS_YEAR_INCOME"],
            MetadataField::ThisYearExpense => &["今年の支出", "THIS_YEAR_EXPENSE"],
            MetadataField::CarriedFromPrev => &["昨年からの繰越", "CARRIED_FROM_PREV"],
            MetadataField::CarriedToNext => &["余ったお金の繰越", "CARRIED_TO_NEXT"],
            MetadataField::ElectionCount => &["当選回数", "ELECTION_COUNT"],
        }
    }

    pub fn label(&self) -> &'static str {
        self.labels()[0]
    }

    pub fn matches(&self, label: &str) -> bool {
        let label = label.trim();
        self.labels()
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(label))
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, MetadataField::ElectionCount)
    }
}

/// Typed view of the metadata sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMetadata {
    pub politician: String,
    pub organization: String,
    pub fiscal_year: i64,
    pub party: String,
    /// Free text such as "4代目" or "なし"
    pub hereditary: String,
    pub election_count: Option<i64>,
    pub income_total: Amount,
    pub this_year_income: Amount,
    pub this_year_expense: Amount,
    pub carried_from_prev: Amount,
    pub carried_to_next: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_matches_japanese_and_english_labels() {
        assert!(MetadataField::FiscalYear.matches("年度"));
        assert!(MetadataField::FiscalYear.matches("year"));
        assert!(MetadataField::FiscalYear.matches(" FISCAL_YEAR "));
        assert!(!MetadataField::FiscalYear.matches("年"));
        assert!(MetadataField::CarriedToNext.matches("余ったお金の繰越"));
    }

    #[test]
    fn test_labels_are_not_shared_between_fields() {
        for field in MetadataField::ALL {
            for other in MetadataField::ALL.iter().filter(|o| **o != field) {
                for label in field.labels() {
                    assert!(!other.matches(label), "{} matches {:?}", label, other);
                }
            }
        }
    }

    #[test]
    fn test_only_election_count_is_optional() {
        let optional: Vec<_> = MetadataField::ALL
            .into_iter()
            .filter(|f| !f.is_required())
            .collect();
        assert_eq!(optional, vec![MetadataField::ElectionCount]);
    }
}
