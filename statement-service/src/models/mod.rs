//! Domain models for the statement service.

pub mod account;
pub mod cache;
pub mod card;
pub mod category;
pub mod transaction;
pub mod upload;

pub use account::{Account, Plan, QuotaKind};
pub use cache::CategoryCacheEntry;
pub use card::Card;
pub use category::{Category, CategoryAssignment, CategorySource};
pub use transaction::{CandidateRow, NewTransaction, PreviewTransaction, Transaction, TransactionType};
pub use upload::UploadedFile;
