pub mod admin;
pub mod user_id;

pub use admin::AdminGuard;
pub use user_id::UserId;
