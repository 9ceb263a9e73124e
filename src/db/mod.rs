mod article;
pub mod core;
mod schema;
mod source;
mod story;

pub use self::article::{normalize_url, ArticleInsert};
pub use self::core::Database;
pub use self::core::DbLockErrorExt;
