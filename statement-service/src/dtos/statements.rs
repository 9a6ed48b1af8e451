use crate::models::PreviewTransaction;
use crate::pipeline::normalizer::parse_extracted_amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub transactions: Vec<PreviewTransaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FileWarning>,
}

/// A file that contributed no rows to the preview, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWarning {
    pub file_name: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub transactions: Vec<ConfirmRow>,
}

/// A reviewed row. Every field is optional on the wire so one bad row is
/// filtered out instead of failing the whole request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default, alias = "cardId")]
    pub card_id: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub selected: Option<bool>,
}

/// Amounts arrive as JSON numbers or, from edited spreadsheets, as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(value) => Decimal::try_from(*value).ok(),
            Self::Text(text) => parse_extracted_amount(text),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub inserted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn amount_accepts_numbers_and_numeric_strings() {
        let row: ConfirmRow = serde_json::from_str(r#"{"amount": -45.99}"#).unwrap();
        assert_eq!(
            row.amount.unwrap().to_decimal().map(|d| d.round_dp(2)),
            Some(Decimal::from_str("-45.99").unwrap())
        );

        let row: ConfirmRow = serde_json::from_str(r#"{"amount": "1,200.50"}"#).unwrap();
        assert_eq!(
            row.amount.unwrap().to_decimal(),
            Some(Decimal::from_str("1200.50").unwrap())
        );

        let row: ConfirmRow = serde_json::from_str(r#"{"amount": "n/a"}"#).unwrap();
        assert_eq!(row.amount.unwrap().to_decimal(), None);
    }

    #[test]
    fn card_id_accepts_camel_case() {
        let row: ConfirmRow = serde_json::from_str(r#"{"cardId": "card-1"}"#).unwrap();
        assert_eq!(row.card_id.as_deref(), Some("card-1"));
    }
}
