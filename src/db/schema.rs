use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                classification TEXT NOT NULL,
                image_url TEXT,
                source_feed TEXT NOT NULL,
                source TEXT NOT NULL,
                published_at TEXT,
                summary TEXT,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_articles_source_published ON articles (source, published_at);
            CREATE INDEX IF NOT EXISTS idx_articles_classification_created ON articles (classification, created_at);
            CREATE INDEX IF NOT EXISTS idx_articles_expires_at ON articles (expires_at);

            CREATE TABLE IF NOT EXISTS stopwords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word TEXT NOT NULL,
                classification TEXT NOT NULL,
                source_article_id INTEGER,
                created_at TEXT NOT NULL,
                UNIQUE(word, classification),
                FOREIGN KEY (source_article_id) REFERENCES articles (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_stopwords_classification ON stopwords (classification);
            "#,
        )
        .execute(&mut *conn)
        .await?;

        info!(target: TARGET_DB, "Database schema initialized");
        Ok(())
    }
}
