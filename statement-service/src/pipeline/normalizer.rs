//! Amount and date normalization for statement rows.
//!
//! Two amount policies live here on purpose:
//! - [`first_amount`] is used for rows coming back from the LLM, where the
//!   running balance has already been dropped by the model.
//! - [`split_ledger_amounts`] is used for raw ledger lines, where the smaller
//!   magnitude number is the transaction and the largest is the balance.

use super::policy::AMOUNT_SANITY_CEILING;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Currency-formatted number: optional sign and `$`, optional thousands
/// separators, exactly two decimals.
static AMOUNT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\$?(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2}\b").expect("amount pattern is valid")
});

static LEADING_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{2}/\d{2})\b").expect("leading date pattern is valid"));

static STATEMENT_PERIOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s*(\d{4})\s+through\b",
    )
    .expect("statement period pattern is valid")
});

/// A row with a resolved calendar date and a validated amount.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub balance: Option<Decimal>,
}

/// Amount and optional running balance found on a ledger line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerAmounts {
    pub amount: Decimal,
    pub balance: Option<Decimal>,
}

/// Parse one currency token (`-1,234.56`, `$45.99`) into a decimal.
pub fn parse_amount_token(token: &str) -> Option<Decimal> {
    let cleaned: String = token
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    Decimal::from_str(&cleaned).ok()
}

/// All currency tokens in reading order.
pub fn amount_tokens(text: &str) -> Vec<Decimal> {
    AMOUNT_TOKEN
        .find_iter(text)
        .filter_map(|m| parse_amount_token(m.as_str()))
        .collect()
}

/// Byte offset of the first currency token, if any.
pub fn first_amount_offset(text: &str) -> Option<usize> {
    AMOUNT_TOKEN.find(text).map(|m| m.start())
}

/// LLM-row policy: the first currency token is the amount.
pub fn first_amount(text: &str) -> Option<Decimal> {
    amount_tokens(text).into_iter().next()
}

/// Raw-ledger policy: a single token is the amount; with two or more, the
/// smallest magnitude is the amount and the largest is the running balance.
pub fn split_ledger_amounts(text: &str) -> Option<LedgerAmounts> {
    let tokens = amount_tokens(text);
    match tokens.as_slice() {
        [] => None,
        [amount] => Some(LedgerAmounts {
            amount: *amount,
            balance: None,
        }),
        _ => {
            let amount = tokens.iter().min_by(|a, b| a.abs().cmp(&b.abs()))?;
            let balance = tokens.iter().max_by(|a, b| a.abs().cmp(&b.abs()))?;
            Some(LedgerAmounts {
                amount: *amount,
                balance: Some(*balance),
            })
        }
    }
}

/// Parse the amount segment of an LLM row. Plain numbers are taken as-is;
/// anything noisier falls back to the first currency token in the segment.
pub fn parse_extracted_amount(segment: &str) -> Option<Decimal> {
    let cleaned = segment
        .trim()
        .trim_matches('"')
        .trim()
        .trim_start_matches('+')
        .replace('$', "");

    Decimal::from_str(cleaned.trim())
        .ok()
        .or_else(|| first_amount(segment))
}

/// Whether an amount can be a single transaction rather than a balance or ID.
pub fn is_plausible_amount(amount: Decimal) -> bool {
    amount.abs() <= Decimal::from(AMOUNT_SANITY_CEILING)
}

/// Resolve `YYYY-MM-DD`, `MM/DD/YYYY`, `MM/DD/YY` or `MM/DD` (using `year`).
pub fn normalize_date(token: &str, year: i32) -> Option<NaiveDate> {
    let token = token.trim();

    if token.contains('-') {
        return NaiveDate::parse_from_str(token, "%Y-%m-%d").ok();
    }

    let parts: Vec<&str> = token.split('/').map(str::trim).collect();
    let (month, day, year) = match parts.as_slice() {
        [month, day] => (*month, *day, year),
        [month, day, y] if y.len() == 4 => (*month, *day, y.parse().ok()?),
        [month, day, y] if y.len() == 2 => (*month, *day, 2000 + y.parse::<i32>().ok()?),
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Year from a `"<Month> <Day>, <Year> through"` statement header.
pub fn infer_statement_year(text: &str) -> Option<i32> {
    STATEMENT_PERIOD
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Statement year, defaulting to the current calendar year.
pub fn statement_year(text: &str) -> i32 {
    infer_statement_year(text).unwrap_or_else(|| chrono::Local::now().year())
}

/// Normalize a raw ledger line (`MM/DD description amount [balance]`).
pub fn normalize_ledger_line(line: &str, year: i32) -> Option<NormalizedRow> {
    let caps = LEADING_DATE.captures(line)?;
    let date_match = caps.get(1)?;
    let date = normalize_date(date_match.as_str(), year)?;

    let rest = &line[date_match.end()..];
    let amounts = split_ledger_amounts(rest)?;
    if !is_plausible_amount(amounts.amount) {
        return None;
    }

    Some(NormalizedRow {
        date,
        amount: amounts.amount.round_dp(2),
        balance: amounts.balance,
    })
}

/// Normalize a candidate row's raw date and amount; `None` means skip the row.
pub fn normalize_candidate(date: &str, amount: Decimal, year: i32) -> Option<NormalizedRow> {
    if !is_plausible_amount(amount) {
        return None;
    }

    Some(NormalizedRow {
        date: normalize_date(date, year)?,
        amount: amount.round_dp(2),
        balance: None,
    })
}
