//! Business thresholds for extraction, escalation and categorization.
//!
//! These values were tuned against real statement layouts; change them only
//! together with the tests that pin them.

/// Absolute amounts above this are a leaked running balance or an ID.
pub const AMOUNT_SANITY_CEILING: i64 = 100_000;

/// Fast-tier results with at least this many invalid-looking rows are re-run
/// on the strong tier.
pub const ESCALATION_INVALID_ROW_THRESHOLD: usize = 2;

/// Amounts below this magnitude are suspicious when the description names a
/// real money movement.
pub const SMALL_AMOUNT_FLOOR: i64 = 1;

/// Descriptions naming a money movement; used by the small-amount check.
pub const TRANSACTIONAL_KEYWORDS: [&str; 7] = [
    "zelle", "salary", "deposit", "payment", "purchase", "credit", "debit",
];

pub const RULE_CONFIDENCE: f64 = 0.9;
pub const AI_CACHE_CONFIDENCE: f64 = 0.7;
pub const EMPTY_DESCRIPTION_CONFIDENCE: f64 = 0.2;
pub const CATEGORIZATION_FAILURE_CONFIDENCE: f64 = 0.2;

/// Rule results below this confidence are sent to the model.
pub const ESCALATE_CATEGORY_BELOW: f64 = 0.5;

/// Extracted text shorter than this means a scanned PDF without a text layer.
pub const MIN_EXTRACTED_TEXT_CHARS: usize = 50;
