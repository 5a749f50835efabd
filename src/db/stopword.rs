use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use super::core::{from_db_time, to_db_time, Database};
use crate::classification::Classification;
use crate::db::Row;
use crate::TARGET_DB;

/// A discriminative keyword associated with one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Stopword {
    pub id: i64,
    pub word: String,
    pub classification: Classification,
    pub source_article_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Database {
    /// Records a keyword for a label. Returns `false` when the pair already exists.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn insert_stopword(
        &self,
        word: &str,
        classification: Classification,
        source_article_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let word = word.trim().to_lowercase();
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO stopwords (word, classification, source_article_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&word)
        .bind(classification.as_str())
        .bind(source_article_id)
        .bind(to_db_time(&now))
        .execute(self.pool())
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!(target: TARGET_DB, "Stopword {:?} for {}: inserted={}", word, classification, inserted);
        Ok(inserted)
    }

    pub async fn all_stopwords(&self) -> Result<Vec<Stopword>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, word, classification, source_article_id, created_at FROM stopwords ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let label: String = row.get("classification");
                let Some(classification) = Classification::from_label(&label) else {
                    warn!(target: TARGET_DB, "Skipping stopword with unknown classification {:?}", label);
                    return None;
                };
                Some(Stopword {
                    id: row.get("id"),
                    word: row.get("word"),
                    classification,
                    source_article_id: row.get("source_article_id"),
                    created_at: from_db_time(&row.get::<String, _>("created_at")),
                })
            })
            .collect())
    }
}
