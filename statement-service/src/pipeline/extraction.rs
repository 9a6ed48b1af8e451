//! LLM extraction of CSV-like transaction rows, with fast/strong tiers.

use super::escalation::{self, EscalationDecision};
use super::normalizer::parse_extracted_amount;
use crate::models::CandidateRow;
use crate::services::metrics::{record_escalation, record_extraction_rows, record_provider_latency};
use crate::services::providers::{FinishReason, GenerationParams, TextProvider};
use std::sync::Arc;
use std::time::Instant;

const EXTRACTION_INSTRUCTIONS: &str = "\
You extract transactions from bank and credit card statement text.
Output one line per transaction in the form: date,description,amount
Rules:
- date is YYYY-MM-DD.
- amount is signed: money out is negative, money in is positive.
- amount has no currency symbol and no thousands separators.
- Never output running balances, totals, fee schedules, disclosures or headers.
- Output each real transaction at most once.
- Output nothing else: no explanations, no code fences.";

const EXTRACTION_MAX_TOKENS: i32 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fast,
    Strong,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Strong => "strong",
        }
    }
}

/// Rows from one statement plus how they were obtained.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub rows: Vec<CandidateRow>,
    pub tier: Tier,
    pub decision: EscalationDecision,
}

/// Rows from a single tier call.
#[derive(Debug, Clone, Default)]
pub struct TierOutput {
    pub rows: Vec<CandidateRow>,
    /// The model hit its token limit before finishing.
    pub truncated: bool,
}

/// Text up to and including the last newline. A response cut at the token
/// limit can end mid-row (`-1200.00` becoming `-12`), so that tail is dropped.
pub fn complete_lines(text: &str) -> &str {
    match text.rfind('\n') {
        Some(end) => &text[..=end],
        None => "",
    }
}

/// Parse `date,description,amount` lines. The first comma ends the date and
/// the last comma starts the amount, so descriptions may contain commas.
/// Lines with fewer than two commas or a non-numeric amount are dropped.
pub fn parse_rows(response: &str) -> Vec<CandidateRow> {
    response
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.matches(',').count() < 2 {
                return None;
            }

            let first = line.find(',')?;
            let last = line.rfind(',')?;
            let amount = parse_extracted_amount(&line[last + 1..])?;

            let date = line[..first].trim().trim_matches('"').trim();
            let description = line[first + 1..last].trim().trim_matches('"').trim();
            Some(CandidateRow::new(date, description, amount))
        })
        .collect()
}

pub struct ExtractionClient {
    fast: Arc<dyn TextProvider>,
    strong: Arc<dyn TextProvider>,
}

impl ExtractionClient {
    pub fn new(fast: Arc<dyn TextProvider>, strong: Arc<dyn TextProvider>) -> Self {
        Self { fast, strong }
    }

    fn provider(&self, tier: Tier) -> &Arc<dyn TextProvider> {
        match tier {
            Tier::Fast => &self.fast,
            Tier::Strong => &self.strong,
        }
    }

    /// Extract rows at one tier. Provider failures yield zero rows.
    pub async fn extract(&self, text: &str, tier: Tier) -> TierOutput {
        let provider = self.provider(tier);
        let params = GenerationParams {
            temperature: Some(0.0),
            max_tokens: Some(EXTRACTION_MAX_TOKENS),
            system_instruction: Some(EXTRACTION_INSTRUCTIONS.to_string()),
        };
        let prompt = format!("Statement text:\n{}", text);

        let started = Instant::now();
        let result = provider.generate(&prompt, &params).await;
        record_provider_latency(tier.as_str(), started.elapsed().as_secs_f64());

        match result {
            Ok(response) => {
                let truncated = response.finish_reason == FinishReason::Length;
                let body = if truncated {
                    complete_lines(&response.text)
                } else {
                    response.text.as_str()
                };

                let rows = parse_rows(body);
                record_extraction_rows(tier.as_str(), rows.len());
                tracing::info!(
                    tier = tier.as_str(),
                    model = %provider.model(),
                    rows = rows.len(),
                    truncated,
                    output_tokens = response.output_tokens,
                    "Extraction completed"
                );
                TierOutput { rows, truncated }
            }
            Err(e) => {
                tracing::warn!(
                    tier = tier.as_str(),
                    model = %provider.model(),
                    error = %e,
                    transient = e.is_transient(),
                    "Extraction failed, treating as zero rows"
                );
                TierOutput::default()
            }
        }
    }

    /// Fast tier first; the strong tier runs only when the fast result is
    /// empty, truncated or fails the quality gate, and replaces it only if
    /// non-empty.
    pub async fn extract_escalating(&self, text: &str) -> ExtractionOutcome {
        let TierOutput {
            rows: fast,
            truncated,
        } = self.extract(text, Tier::Fast).await;
        let decision = match escalation::evaluate(&fast) {
            EscalationDecision::Keep if truncated => EscalationDecision::Truncated,
            decision => decision,
        };

        if !decision.escalate() {
            return ExtractionOutcome {
                rows: fast,
                tier: Tier::Fast,
                decision,
            };
        }

        record_escalation(decision.reason());
        tracing::info!(
            reason = decision.reason(),
            fast_rows = fast.len(),
            "Escalating extraction to strong tier"
        );

        let strong = self.extract(text, Tier::Strong).await.rows;
        if strong.is_empty() {
            ExtractionOutcome {
                rows: fast,
                tier: Tier::Fast,
                decision,
            }
        } else {
            ExtractionOutcome {
                rows: strong,
                tier: Tier::Strong,
                decision,
            }
        }
    }
}
