use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteRow;
use tracing::{debug, info, instrument, warn};

use super::core::{from_db_time, to_db_time, Database};
use crate::classification::Classification;
use crate::db::Row;
use crate::TARGET_DB;

/// How long a stored article stays active.
pub const ARTICLE_TTL_HOURS: i64 = 48;

/// Insert-time fields of an article.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub link: String,
    pub classification: Classification,
    pub image_url: Option<String>,
    pub source_feed: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// A stored article row.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub link: String,
    pub classification: Classification,
    pub image_url: Option<String>,
    pub source_feed: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

const ARTICLE_COLUMNS: &str = "id, title, content, link, classification, image_url, source_feed, \
     source, published_at, summary, expires_at, created_at";

/// Maps a row to an [`Article`], skipping rows whose label or timestamps no
/// longer parse.
fn article_from_row(row: &SqliteRow) -> Option<Article> {
    let id: i64 = row.get("id");
    let label: String = row.get("classification");
    let Some(classification) = Classification::from_label(&label) else {
        warn!(target: TARGET_DB, "Skipping article {} with unknown classification {:?}", id, label);
        return None;
    };

    let expires_at: String = row.get("expires_at");
    let created_at: String = row.get("created_at");
    let (Some(expires_at), Some(created_at)) = (from_db_time(&expires_at), from_db_time(&created_at))
    else {
        warn!(target: TARGET_DB, "Skipping article {} with unreadable timestamps", id);
        return None;
    };

    Some(Article {
        id,
        title: row.get("title"),
        content: row.get("content"),
        link: row.get("link"),
        classification,
        image_url: row.get("image_url"),
        source_feed: row.get("source_feed"),
        source: row.get("source"),
        published_at: row
            .get::<Option<String>, _>("published_at")
            .as_deref()
            .and_then(from_db_time),
        summary: row.get("summary"),
        expires_at,
        created_at,
    })
}

impl Database {
    /// Stores a classified article, active for [`ARTICLE_TTL_HOURS`] from `now`.
    #[instrument(target = "db", level = "info", skip(self, article), fields(link = %article.link))]
    pub async fn insert_article(
        &self,
        article: &NewArticle,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let expires_at = now + Duration::hours(ARTICLE_TTL_HOURS);

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO articles (title, content, link, classification, image_url, source_feed,
                                  source, published_at, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING id
            "#,
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.link)
        .bind(article.classification.as_str())
        .bind(&article.image_url)
        .bind(&article.source_feed)
        .bind(&article.source)
        .bind(article.published_at.as_ref().map(to_db_time))
        .bind(to_db_time(&expires_at))
        .bind(to_db_time(&now))
        .fetch_one(self.pool())
        .await?;

        debug!(target: TARGET_DB, "Stored article {} as {}", id, article.classification);
        Ok(id)
    }

    pub async fn has_link(&self, link: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM articles WHERE link = ?1")
            .bind(link)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Whether this source already has an article published at exactly this time.
    pub async fn has_source_published_at(
        &self,
        source: &str,
        published_at: &DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM articles WHERE source = ?1 AND published_at = ?2")
            .bind(source)
            .bind(to_db_time(published_at))
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Newest publication date stored for `source`.
    pub async fn latest_published_at(
        &self,
        source: &str,
    ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let latest = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MAX(published_at) FROM articles WHERE source = ?1",
        )
        .bind(source)
        .fetch_one(self.pool())
        .await?;
        Ok(latest.as_deref().and_then(from_db_time))
    }

    /// The `limit` most recently stored unexpired articles of one label,
    /// newest first.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn recent_active_by_classification(
        &self,
        classification: Classification,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Article>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM articles WHERE classification = ?1 AND expires_at > ?2 \
             ORDER BY created_at DESC, id DESC LIMIT ?3",
            ARTICLE_COLUMNS
        ))
        .bind(classification.as_str())
        .bind(to_db_time(&now))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().filter_map(article_from_row).collect())
    }

    pub async fn update_summary(&self, article_id: i64, summary: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE articles SET summary = ?1 WHERE id = ?2")
            .bind(summary)
            .bind(article_id)
            .execute(self.pool())
            .await?;
        debug!(target: TARGET_DB, "Stored summary on article {}", article_id);
        Ok(())
    }

    pub async fn all_articles(&self) -> Result<Vec<Article>, sqlx::Error> {
        let rows = sqlx::query(&format!("SELECT {} FROM articles ORDER BY id", ARTICLE_COLUMNS))
            .fetch_all(self.pool())
            .await?;
        Ok(rows.iter().filter_map(article_from_row).collect())
    }

    /// Number of stored articles per label; every label is present.
    pub async fn count_by_classification(&self) -> Result<Vec<(Classification, i64)>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT classification, COUNT(*) AS total FROM articles GROUP BY classification",
        )
        .fetch_all(self.pool())
        .await?;

        let mut counts: Vec<(Classification, i64)> =
            Classification::ALL.iter().map(|c| (*c, 0)).collect();
        for row in rows {
            let label: String = row.get("classification");
            if let Some(class) = Classification::from_label(&label) {
                if let Some(entry) = counts.iter_mut().find(|(c, _)| *c == class) {
                    entry.1 = row.get("total");
                }
            }
        }
        Ok(counts)
    }

    /// Removes every article whose `expires_at` is at or before `now`.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn delete_expired_articles(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE expires_at <= ?1")
            .bind(to_db_time(&now))
            .execute(self.pool())
            .await?;

        let deleted = result.rows_affected();
        info!(target: TARGET_DB, "Deleted {} expired articles", deleted);
        Ok(deleted)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sample_article(link: &str, class: Classification) -> NewArticle {
        NewArticle {
            title: format!("Title for {}", link),
            content: "Body".to_string(),
            link: link.to_string(),
            classification: class,
            image_url: None,
            source_feed: "https://feeds.example.com/rss".to_string(),
            source: "Example".to_string(),
            published_at: None,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_sets_expiry_and_reads_back() {
        let db = Database::connect_in_memory().await.unwrap();
        let mut article = sample_article("https://example.com/a", Classification::Immigration);
        article.published_at = Some(at(6));
        article.image_url = Some("https://example.com/a.jpg".to_string());

        let id = db.insert_article(&article, at(10)).await.unwrap();

        let stored = db.all_articles().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].classification, Classification::Immigration);
        assert_eq!(stored[0].published_at, Some(at(6)));
        assert_eq!(stored[0].created_at, at(10));
        assert_eq!(stored[0].expires_at, at(10) + Duration::hours(48));
        assert_eq!(stored[0].summary, None);
    }

    #[tokio::test]
    async fn test_duplicate_link_is_rejected() {
        let db = Database::connect_in_memory().await.unwrap();
        let article = sample_article("https://example.com/a", Classification::Lgbtqia);

        db.insert_article(&article, at(1)).await.unwrap();
        assert!(db.has_link("https://example.com/a").await.unwrap());
        assert!(!db.has_link("https://example.com/b").await.unwrap());
        assert!(db.insert_article(&article, at(2)).await.is_err());
    }

    #[tokio::test]
    async fn test_source_dates() {
        let db = Database::connect_in_memory().await.unwrap();
        assert_eq!(db.latest_published_at("Example").await.unwrap(), None);

        for (i, hour) in [3, 9, 5].into_iter().enumerate() {
            let mut article = sample_article(&format!("https://example.com/{}", i), Classification::ClimateChange);
            article.published_at = Some(at(hour));
            db.insert_article(&article, at(12)).await.unwrap();
        }

        assert_eq!(db.latest_published_at("Example").await.unwrap(), Some(at(9)));
        assert_eq!(db.latest_published_at("Other").await.unwrap(), None);
        assert!(db.has_source_published_at("Example", &at(5)).await.unwrap());
        assert!(!db.has_source_published_at("Example", &at(4)).await.unwrap());
        assert!(!db.has_source_published_at("Other", &at(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_recent_active_by_classification() {
        let db = Database::connect_in_memory().await.unwrap();
        let mut ids = Vec::new();
        for (i, hour) in [1, 2, 3].into_iter().enumerate() {
            let article = sample_article(&format!("https://example.com/{}", i), Classification::EconomicJustice);
            ids.push(db.insert_article(&article, at(hour)).await.unwrap());
        }
        db.insert_article(&sample_article("https://example.com/other", Classification::Immigration), at(4))
            .await
            .unwrap();

        let now = at(1) + Duration::hours(48) + Duration::minutes(30);
        let recent = db
            .recent_active_by_classification(Classification::EconomicJustice, now, 20)
            .await
            .unwrap();
        let recent_ids: Vec<i64> = recent.iter().map(|a| a.id).collect();
        assert_eq!(recent_ids, vec![ids[2], ids[1]]);

        let limited = db
            .recent_active_by_classification(Classification::EconomicJustice, at(5), 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, ids[2]);
    }

    #[tokio::test]
    async fn test_update_summary_and_counts() {
        let db = Database::connect_in_memory().await.unwrap();
        let id = db
            .insert_article(&sample_article("https://example.com/a", Classification::ReproductiveRights), at(1))
            .await
            .unwrap();

        db.update_summary(id, "A summary").await.unwrap();
        let stored = db.all_articles().await.unwrap();
        assert_eq!(stored[0].summary.as_deref(), Some("A summary"));

        let counts = db.count_by_classification().await.unwrap();
        assert_eq!(counts.len(), 5);
        assert!(counts.contains(&(Classification::ReproductiveRights, 1)));
        assert!(counts.contains(&(Classification::ClimateChange, 0)));
    }

    #[tokio::test]
    async fn test_delete_expired_articles() {
        let db = Database::connect_in_memory().await.unwrap();
        db.insert_article(&sample_article("https://example.com/old", Classification::ClimateChange), at(1))
            .await
            .unwrap();
        db.insert_article(&sample_article("https://example.com/new", Classification::ClimateChange), at(5))
            .await
            .unwrap();

        let deleted = db
            .delete_expired_articles(at(1) + Duration::hours(48))
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        let remaining = db.all_articles().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].link, "https://example.com/new");
    }
}
