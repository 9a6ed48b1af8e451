//! Two-phase statement workflow: preview (extract + categorize, no
//! persistence) and confirm (validate + persist).

use super::categorizer::Categorizer;
use super::extraction::ExtractionClient;
use super::normalizer::{normalize_candidate, normalize_date, statement_year};
use super::policy::{MIN_EXTRACTED_TEXT_CHARS, RULE_CONFIDENCE};
use super::sign::apply_sign_rules;
use super::statement_parser;
use crate::config::QuotaConfig;
use crate::dtos::{ConfirmRow, FileWarning};
use crate::error::PipelineError;
use crate::models::{
    Account, CandidateRow, Category, CategoryAssignment, CategorySource, NewTransaction,
    PreviewTransaction, QuotaKind, Transaction, TransactionType, UploadedFile,
};
use crate::services::metrics::{
    record_extraction_rows, record_preview, record_transactions_inserted,
};
use crate::services::stores::{AccountStore, CardRegistry, TransactionStore};
use crate::services::text_extractor::TextExtractor;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Collaborators injected at startup.
pub struct PipelineDeps {
    pub extraction: ExtractionClient,
    pub categorizer: Categorizer,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub accounts: Arc<dyn AccountStore>,
    pub cards: Arc<dyn CardRegistry>,
    pub transactions: Arc<dyn TransactionStore>,
    pub quotas: QuotaConfig,
    pub extraction_timeout: Duration,
}

#[derive(Debug)]
pub struct PreviewOutcome {
    pub transactions: Vec<PreviewTransaction>,
    pub warnings: Vec<FileWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RejectionKind {
    Unsupported,
    NoText,
    Failed,
    Empty,
}

struct FileRejection {
    kind: RejectionKind,
    message: String,
}

impl FileRejection {
    fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Quota state read at the start of a request.
struct QuotaTicket {
    day: NaiveDate,
    metered: bool,
}

/// A confirm row that passed field validation.
struct AcceptedRow {
    date: NaiveDate,
    description: String,
    amount: Decimal,
    card_id: String,
    currency: String,
    category: Option<Category>,
    confidence: Option<f64>,
    source: Option<CategorySource>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Field validation for a reviewed row; `None` drops the row.
fn accept_row(row: ConfirmRow, year: i32) -> Option<AcceptedRow> {
    if row.selected == Some(false) {
        return None;
    }

    let date = normalize_date(&non_empty(row.date)?, year)?;
    let description = non_empty(row.description)?;
    let amount = row.amount.as_ref()?.to_decimal()?.round_dp(2);
    let card_id = non_empty(row.card_id)?;
    let currency = non_empty(row.currency)?.to_ascii_uppercase();
    let source = row.source.as_deref().and_then(CategorySource::from_name);

    // A category sent with an impossible confidence is re-derived server-side.
    let confidence_valid = row.confidence.map_or(true, |c| (0.0..=1.0).contains(&c));
    let category = row
        .category
        .as_deref()
        .and_then(Category::from_name)
        .filter(|_| confidence_valid || source == Some(CategorySource::Manual));

    Some(AcceptedRow {
        date,
        description,
        amount,
        card_id,
        currency,
        category,
        confidence: row.confidence.filter(|_| confidence_valid),
        source,
    })
}

pub struct StatementPipeline {
    extraction: ExtractionClient,
    categorizer: Categorizer,
    text_extractor: Arc<dyn TextExtractor>,
    accounts: Arc<dyn AccountStore>,
    cards: Arc<dyn CardRegistry>,
    transactions: Arc<dyn TransactionStore>,
    quotas: QuotaConfig,
    extraction_timeout: Duration,
}

impl StatementPipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        Self {
            extraction: deps.extraction,
            categorizer: deps.categorizer,
            text_extractor: deps.text_extractor,
            accounts: deps.accounts,
            cards: deps.cards,
            transactions: deps.transactions,
            quotas: deps.quotas,
            extraction_timeout: deps.extraction_timeout,
        }
    }

    fn limit(&self, kind: QuotaKind) -> u32 {
        match kind {
            QuotaKind::Preview => self.quotas.daily_previews,
            QuotaKind::Upload => self.quotas.daily_uploads,
        }
    }

    async fn check_quota(&self, user_id: &str, kind: QuotaKind) -> Result<QuotaTicket, PipelineError> {
        let account = self
            .accounts
            .find_account(user_id)
            .await?
            .unwrap_or_else(|| Account::new_free(user_id));
        let day = account.local_today(Utc::now());

        if account.is_paying() {
            return Ok(QuotaTicket { day, metered: false });
        }

        let limit = self.limit(kind);
        let used = account.used_on(kind, day);
        if used >= limit {
            tracing::info!(user_id = %user_id, kind = kind.as_str(), used, limit, "Daily quota exhausted");
            return Err(PipelineError::QuotaExceeded { kind, limit });
        }

        Ok(QuotaTicket { day, metered: true })
    }

    async fn consume_quota(&self, user_id: &str, kind: QuotaKind, ticket: &QuotaTicket) {
        if !ticket.metered {
            return;
        }
        if let Err(e) = self.accounts.increment_quota(user_id, kind, ticket.day).await {
            tracing::error!(user_id = %user_id, kind = kind.as_str(), error = %e, "Failed to increment quota counter");
        }
    }

    /// Extract, categorize and sign-correct every uploaded file. Nothing is
    /// persisted except category cache entries and the preview counter.
    pub async fn preview(
        &self,
        user_id: &str,
        files: Vec<UploadedFile>,
    ) -> Result<PreviewOutcome, PipelineError> {
        let result = self.run_preview(user_id, files).await;
        match &result {
            Ok(outcome) => {
                record_preview("ok");
                tracing::info!(
                    user_id = %user_id,
                    rows = outcome.transactions.len(),
                    skipped_files = outcome.warnings.len(),
                    "Preview completed"
                );
            }
            Err(e) => record_preview(e.outcome()),
        }
        result
    }

    async fn run_preview(
        &self,
        user_id: &str,
        files: Vec<UploadedFile>,
    ) -> Result<PreviewOutcome, PipelineError> {
        let ticket = self.check_quota(user_id, QuotaKind::Preview).await?;

        let mut transactions = Vec::new();
        let mut warnings = Vec::new();
        let mut rejections = Vec::new();

        for file in &files {
            match self.preview_file(file).await {
                Ok(rows) => transactions.extend(rows),
                Err(rejection) => {
                    tracing::warn!(
                        user_id = %user_id,
                        file_name = %file.file_name,
                        reason = %rejection.message,
                        "File skipped in preview"
                    );
                    warnings.push(FileWarning {
                        file_name: file.file_name.clone(),
                        message: rejection.message.clone(),
                    });
                    rejections.push(rejection);
                }
            }
        }

        if transactions.is_empty() {
            return Err(Self::empty_preview_error(rejections));
        }

        self.consume_quota(user_id, QuotaKind::Preview, &ticket).await;

        Ok(PreviewOutcome {
            transactions,
            warnings,
        })
    }

    fn empty_preview_error(rejections: Vec<FileRejection>) -> PipelineError {
        let all = |kind: RejectionKind| !rejections.is_empty() && rejections.iter().all(|r| r.kind == kind);

        if all(RejectionKind::Unsupported) {
            PipelineError::UnsupportedFile(
                "Only PDF statements can be previewed. Upload CSV or XLSX files through confirm."
                    .to_string(),
            )
        } else if all(RejectionKind::NoText) {
            PipelineError::NoExtractableText(
                "The statement has no readable text. Scanned PDFs are not supported; try a different file."
                    .to_string(),
            )
        } else {
            PipelineError::NoTransactionsFound
        }
    }

    async fn preview_file(&self, file: &UploadedFile) -> Result<Vec<PreviewTransaction>, FileRejection> {
        if !file.is_pdf() {
            return Err(FileRejection::new(
                RejectionKind::Unsupported,
                "Only PDF files can be previewed",
            ));
        }

        let (text, rows) = tokio::time::timeout(self.extraction_timeout, self.extract_rows(file))
            .await
            .map_err(|_| {
                FileRejection::new(
                    RejectionKind::Failed,
                    format!(
                        "Extraction timed out after {}s",
                        self.extraction_timeout.as_secs_f64()
                    ),
                )
            })??;

        let year = statement_year(&text);
        let mut previews = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(preview) = self.preview_row(row, year, &file.file_name).await {
                previews.push(preview);
            }
        }

        if previews.is_empty() {
            return Err(FileRejection::new(RejectionKind::Empty, "No transactions found"));
        }
        Ok(previews)
    }

    async fn extract_rows(&self, file: &UploadedFile) -> Result<(String, Vec<CandidateRow>), FileRejection> {
        let text = self
            .text_extractor
            .extract_text(&file.file_name, &file.bytes)
            .await
            .map_err(|e| FileRejection::new(RejectionKind::Failed, format!("Could not read file: {}", e)))?;

        if text.trim().chars().count() < MIN_EXTRACTED_TEXT_CHARS {
            return Err(FileRejection::new(
                RejectionKind::NoText,
                "No extractable text (scanned PDF?)",
            ));
        }

        let outcome = self.extraction.extract_escalating(&text).await;
        if !outcome.rows.is_empty() {
            return Ok((text, outcome.rows));
        }

        let rows = statement_parser::parse_ledger(&text);
        record_extraction_rows("regex", rows.len());
        tracing::info!(
            file_name = %file.file_name,
            rows = rows.len(),
            "Both extraction tiers returned nothing, used ledger parser"
        );
        Ok((text, rows))
    }

    async fn preview_row(&self, row: CandidateRow, year: i32, file_name: &str) -> Option<PreviewTransaction> {
        let Some(normalized) = normalize_candidate(&row.date, row.amount, year) else {
            tracing::debug!(date = %row.date, amount = %row.amount, "Dropped row that failed normalization");
            return None;
        };

        let assignment = self.categorizer.categorize(&row.description).await;
        let amount = apply_sign_rules(&row.description, normalized.amount);

        Some(PreviewTransaction {
            id: Uuid::new_v4().to_string(),
            date: normalized.date,
            description: row.description,
            amount,
            kind: TransactionType::from_amount(amount),
            category: assignment.category,
            confidence: assignment.confidence,
            source: assignment.source,
            selected: true,
            file_name: Some(file_name.to_string()),
        })
    }

    /// Persist reviewed rows. Returns the number of rows actually stored.
    pub async fn confirm(&self, user_id: &str, rows: Vec<ConfirmRow>) -> Result<u64, PipelineError> {
        let ticket = self.check_quota(user_id, QuotaKind::Upload).await?;

        let submitted = rows.len();
        let year = Utc::now().year();
        let accepted: Vec<AcceptedRow> = rows
            .into_iter()
            .filter_map(|row| accept_row(row, year))
            .collect();

        if accepted.is_empty() {
            return Err(PipelineError::InvalidBatch(
                "No valid transactions to save. Each row needs a date, description, amount, card and currency."
                    .to_string(),
            ));
        }

        let mut card_ids: Vec<String> = Vec::new();
        for row in &accepted {
            if !card_ids.contains(&row.card_id) {
                card_ids.push(row.card_id.clone());
            }
        }

        let owned = self.cards.owned_cards(user_id, &card_ids).await?;
        if let Some(foreign) = card_ids.iter().find(|id| !owned.contains(*id)) {
            tracing::warn!(user_id = %user_id, card_id = %foreign, "Confirm referenced a card the user does not own");
            return Err(PipelineError::CardOwnership);
        }

        let mut seen: HashSet<(NaiveDate, String, Decimal, String)> = HashSet::new();
        let unique: Vec<AcceptedRow> = accepted
            .into_iter()
            .filter(|row| {
                seen.insert((
                    row.date,
                    row.description.clone(),
                    row.amount.normalize(),
                    row.card_id.clone(),
                ))
            })
            .collect();

        let mut transactions = Vec::with_capacity(unique.len());
        for row in unique {
            let assignment = self.resolve_category(&row).await;
            transactions.push(Transaction::new(
                user_id,
                NewTransaction {
                    card_id: row.card_id,
                    date: row.date,
                    description: row.description,
                    amount: row.amount,
                    currency: row.currency,
                    category: assignment.category,
                    confidence: assignment.confidence,
                    category_source: assignment.source,
                },
            ));
        }

        let batch = transactions.len();
        let inserted = self.transactions.insert_unordered(transactions).await?;
        if inserted > 0 {
            self.consume_quota(user_id, QuotaKind::Upload, &ticket).await;
            record_transactions_inserted(inserted);
        }

        tracing::info!(
            user_id = %user_id,
            submitted,
            batch,
            inserted,
            "Confirm completed"
        );
        Ok(inserted)
    }

    /// Keep what the user reviewed; categorize rows that arrive without a
    /// usable category.
    async fn resolve_category(&self, row: &AcceptedRow) -> CategoryAssignment {
        match (row.category, row.source) {
            (Some(category), Some(CategorySource::Manual)) => {
                CategoryAssignment::new(category, 1.0, CategorySource::Manual)
            }
            (Some(category), source) => CategoryAssignment::new(
                category,
                row.confidence.unwrap_or(RULE_CONFIDENCE),
                source.unwrap_or(CategorySource::Rule),
            ),
            (None, _) => self.categorizer.categorize(&row.description).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::AmountInput;

    fn row(date: &str, description: &str, amount: f64, card: &str) -> ConfirmRow {
        ConfirmRow {
            date: Some(date.to_string()),
            description: Some(description.to_string()),
            amount: Some(AmountInput::Number(amount)),
            card_id: Some(card.to_string()),
            currency: Some("usd".to_string()),
            ..ConfirmRow::default()
        }
    }

    #[test]
    fn accept_row_requires_all_fields() {
        assert!(accept_row(row("2025-01-15", "Coffee", -4.5, "card-1"), 2025).is_some());

        let mut missing_currency = row("2025-01-15", "Coffee", -4.5, "card-1");
        missing_currency.currency = Some("  ".to_string());
        assert!(accept_row(missing_currency, 2025).is_none());

        let mut missing_card = row("2025-01-15", "Coffee", -4.5, "card-1");
        missing_card.card_id = None;
        assert!(accept_row(missing_card, 2025).is_none());

        let mut bad_amount = row("2025-01-15", "Coffee", -4.5, "card-1");
        bad_amount.amount = Some(AmountInput::Text("abc".to_string()));
        assert!(accept_row(bad_amount, 2025).is_none());

        assert!(accept_row(row("", "Coffee", -4.5, "card-1"), 2025).is_none());
        assert!(accept_row(row("2025-01-15", "", -4.5, "card-1"), 2025).is_none());
    }

    #[test]
    fn deselected_rows_are_dropped() {
        let mut deselected = row("2025-01-15", "Coffee", -4.5, "card-1");
        deselected.selected = Some(false);
        assert!(accept_row(deselected, 2025).is_none());
    }

    #[test]
    fn accepted_row_is_normalized() {
        let mut input = row("01/15/2025", "  Coffee  ", -4.499, "card-1");
        input.category = Some("food & dining".to_string());
        input.source = Some("manual".to_string());

        let accepted = accept_row(input, 2025).unwrap();
        assert_eq!(accepted.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(accepted.description, "Coffee");
        assert_eq!(accepted.amount.to_string(), "-4.50");
        assert_eq!(accepted.currency, "USD");
        assert_eq!(accepted.category, Some(Category::FoodAndDining));
        assert_eq!(accepted.source, Some(CategorySource::Manual));
    }

    #[test]
    fn out_of_range_confidence_drops_the_client_category() {
        for bad in [42.0, -0.1, f64::NAN] {
            let mut input = row("2025-01-15", "Coffee", -4.5, "card-1");
            input.category = Some("Shopping".to_string());
            input.confidence = Some(bad);
            input.source = Some("ai".to_string());

            let accepted = accept_row(input, 2025).unwrap();
            assert_eq!(accepted.category, None);
            assert_eq!(accepted.confidence, None);
        }

        let mut manual = row("2025-01-15", "Coffee", -4.5, "card-1");
        manual.category = Some("Shopping".to_string());
        manual.confidence = Some(42.0);
        manual.source = Some("manual".to_string());
        assert_eq!(accept_row(manual, 2025).unwrap().category, Some(Category::Shopping));
    }
}
