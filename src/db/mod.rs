mod article;
pub mod core;
mod schema;
mod stopword;

pub use self::article::{Article, NewArticle};
pub use self::core::Database;
pub use self::stopword::Stopword;
pub use sqlx::Row;
