pub mod database;
pub mod memory;
pub mod metrics;
pub mod providers;
pub mod stores;
pub mod text_extractor;

pub use database::StatementDb;
pub use memory::InMemoryStore;
pub use providers::{
    GeminiConfig, GeminiTextProvider, GenerationParams, MockTextProvider, ProviderError,
    TextProvider,
};
pub use stores::{AccountStore, CardRegistry, CategoryCache, TransactionStore};
pub use text_extractor::{CommandExecutor, PdfTextExtractor, TextExtractor};
