//! Statement-to-transaction pipeline.
//!
//! Leaf-first: `normalizer` and `statement_parser` are pure text handling,
//! `extraction` + `escalation` wrap the LLM tiers, `categorizer` + `merchant`
//! assign categories, `sign` applies the final sign correction, and
//! `orchestrator` drives preview and confirm.

pub mod categorizer;
pub mod escalation;
pub mod extraction;
pub mod merchant;
pub mod normalizer;
pub mod orchestrator;
pub mod policy;
pub mod sign;
pub mod statement_parser;

pub use categorizer::{CategorizationError, Categorizer};
pub use extraction::{ExtractionClient, Tier};
pub use orchestrator::{PipelineDeps, PreviewOutcome, StatementPipeline};
