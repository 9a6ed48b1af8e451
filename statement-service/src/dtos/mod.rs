pub mod statements;
pub mod transactions;

pub use statements::{
    AmountInput, ConfirmRequest, ConfirmResponse, ConfirmRow, FileWarning, PreviewResponse,
};
pub use transactions::{CategoryOverrideRequest, CategoryOverrideResponse};
