pub mod admin;
pub mod health;
pub mod statements;
pub mod transactions;

pub use admin::invalidate_category_cache;
pub use health::{health_check, metrics, readiness};
pub use statements::{confirm_statement, preview_statement};
pub use transactions::override_category;
