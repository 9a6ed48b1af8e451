//! Deterministic ledger parser used when no model output is available.

use super::normalizer::{self, first_amount_offset, parse_amount_token};
use crate::models::{CandidateRow, Category, TransactionType};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

static LOGICAL_LINE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d{2}/\d{2}").expect("line start pattern is valid"));

/// `MM/DD`, a non-greedy description, then the first currency number.
static LEDGER_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{2}/\d{2})\s+(.+?)\s+(-?\$?(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})\b")
        .expect("ledger row pattern is valid")
});

static ZELLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)zelle").expect("zelle pattern is valid"));

/// Join wrapped physical lines: a logical line starts at every `MM/DD` token
/// and absorbs following lines until the next one. Text before the first
/// dated line is dropped.
pub fn merge_logical_lines(text: &str) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if LOGICAL_LINE_START.is_match(line) {
            merged.push(trimmed.to_string());
        } else if let Some(current) = merged.last_mut() {
            current.push(' ');
            current.push_str(trimmed);
        }
    }

    merged
}

/// Coarse default direction and category; the categorizer overrides it.
/// Salary, deposits and unlabelled credits all land in `Income`.
pub fn classify(description: &str, amount: Decimal) -> (TransactionType, Category) {
    if amount.is_sign_negative() && !amount.is_zero() {
        (TransactionType::Expense, Category::Other)
    } else if ZELLE.is_match(description) {
        (TransactionType::Income, Category::Transfers)
    } else {
        (TransactionType::Income, Category::Income)
    }
}

fn parse_logical_line(line: &str) -> Option<CandidateRow> {
    let caps = LEDGER_ROW.captures(line)?;
    let date = caps.get(1)?.as_str();
    let description = caps.get(2)?.as_str().trim();
    let amount = parse_amount_token(caps.get(3)?.as_str())?;

    let (kind, category) = classify(description, amount);
    Some(CandidateRow::new(date, description, amount).with_category(kind, category))
}

/// Parse statement text taking the first number after each description as
/// the amount. Lines are expected to be already free of balance columns.
pub fn parse_statement(text: &str) -> Vec<CandidateRow> {
    merge_logical_lines(text)
        .iter()
        .filter_map(|line| parse_logical_line(line))
        .collect()
}

/// Parse a raw ledger where lines may carry a running balance. Lines with two
/// or more numbers go through the smaller-magnitude rule; the rest are parsed
/// like [`parse_statement`].
pub fn parse_ledger(text: &str) -> Vec<CandidateRow> {
    merge_logical_lines(text)
        .iter()
        .filter_map(|line| {
            let row = parse_logical_line(line)?;
            let rest = &line[first_amount_offset(line)?..];
            if normalizer::amount_tokens(rest).len() < 2 {
                return Some(row);
            }

            let amounts = normalizer::split_ledger_amounts(rest)?;
            let (kind, category) = classify(&row.description, amounts.amount);
            Some(
                CandidateRow::new(row.date, row.description, amounts.amount)
                    .with_category(kind, category),
            )
        })
        .collect()
}
