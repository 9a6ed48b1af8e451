//! Quality gate that decides whether fast-tier output needs the strong tier.

use super::policy::{
    AMOUNT_SANITY_CEILING, ESCALATION_INVALID_ROW_THRESHOLD, SMALL_AMOUNT_FLOOR,
    TRANSACTIONAL_KEYWORDS,
};
use crate::models::CandidateRow;
use rust_decimal::Decimal;

/// Why the strong tier was (or was not) consulted. Used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationDecision {
    Keep,
    EmptyResult,
    InvalidRows(usize),
    /// The model stopped at its token limit, so trailing rows are missing.
    Truncated,
}

impl EscalationDecision {
    pub fn escalate(&self) -> bool {
        !matches!(self, Self::Keep)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Keep => "none",
            Self::EmptyResult => "empty",
            Self::InvalidRows(_) => "invalid_rows",
            Self::Truncated => "truncated",
        }
    }
}

fn has_transactional_keyword(description: &str) -> bool {
    let lowered = description.to_lowercase();
    TRANSACTIONAL_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// A row whose amount looks like an extraction mistake.
pub fn is_invalid_looking(row: &CandidateRow) -> bool {
    let magnitude = row.amount.abs();

    row.amount.is_zero()
        || (magnitude < Decimal::from(SMALL_AMOUNT_FLOOR)
            && has_transactional_keyword(&row.description))
        || magnitude > Decimal::from(AMOUNT_SANITY_CEILING)
        || !(row.amount * Decimal::ONE_HUNDRED).fract().is_zero()
}

pub fn count_invalid(rows: &[CandidateRow]) -> usize {
    rows.iter().filter(|row| is_invalid_looking(row)).count()
}

/// An empty result always escalates; otherwise escalate at the invalid-row
/// threshold.
pub fn evaluate(rows: &[CandidateRow]) -> EscalationDecision {
    if rows.is_empty() {
        return EscalationDecision::EmptyResult;
    }

    let invalid = count_invalid(rows);
    if invalid >= ESCALATION_INVALID_ROW_THRESHOLD {
        EscalationDecision::InvalidRows(invalid)
    } else {
        EscalationDecision::Keep
    }
}

/// Boolean form of [`evaluate`].
pub fn should_escalate(rows: &[CandidateRow]) -> bool {
    evaluate(rows).escalate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(description: &str, amount: &str) -> CandidateRow {
        CandidateRow::new("2025-01-15", description, Decimal::from_str(amount).unwrap())
    }

    #[test]
    fn two_zero_rows_escalate() {
        let rows = vec![
            row("Coffee", "0"),
            row("Lunch", "0.00"),
            row("Groceries", "-54.20"),
        ];
        assert!(should_escalate(&rows));
        assert_eq!(evaluate(&rows), EscalationDecision::InvalidRows(2));
    }

    #[test]
    fn zero_or_one_invalid_row_keeps_fast_output() {
        let clean = vec![row("Coffee", "-4.50"), row("Rent", "-1200.00")];
        assert!(!should_escalate(&clean));

        let one_bad = vec![row("Coffee", "0"), row("Rent", "-1200.00")];
        assert!(!should_escalate(&one_bad));
    }

    #[test]
    fn empty_result_always_escalates() {
        assert_eq!(evaluate(&[]), EscalationDecision::EmptyResult);
        assert!(should_escalate(&[]));
    }

    #[test]
    fn small_amounts_only_count_with_transactional_keywords() {
        assert!(is_invalid_looking(&row("Zelle Payment", "0.50")));
        assert!(!is_invalid_looking(&row("Interest earned", "0.42")));
    }

    #[test]
    fn balances_and_extra_precision_are_invalid() {
        assert!(is_invalid_looking(&row("Transfer", "150000.00")));
        assert!(is_invalid_looking(&row("Coffee", "4.505")));
        assert!(!is_invalid_looking(&row("Coffee", "4.50")));
    }
}
