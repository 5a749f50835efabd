//! Orchestration of the batch jobs: feed ingestion, summaries, rebalancing and
//! keyword injection.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::classification::Classification;
use crate::classifier::{LabeledDocument, NaiveBayesClassifier};
use crate::db::Database;
use crate::error::ClassifierError;
use crate::rss::{FeedSource, FetchedArticle};
use crate::summarizer::{ArticleText, Summarizer};
use crate::{TARGET_CLASSIFIER, TARGET_LLM_REQUEST, TARGET_WEB_REQUEST};

/// Articles handed to the summarizer per classification.
pub const SUMMARY_ARTICLE_LIMIT: i64 = 20;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub fetched: usize,
    pub classified: usize,
    pub stored: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    pub succeeded: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebalanceReport {
    /// Stored articles per label before retraining.
    pub distribution: Vec<(Classification, usize)>,
    /// Documents trained per label.
    pub per_class: usize,
    /// Class counts in the retrained brain.
    pub class_counts: Vec<(Classification, u64)>,
}

pub struct ArticleProcessor {
    db: Database,
    feed_source: Box<dyn FeedSource>,
    classifier: Mutex<NaiveBayesClassifier>,
}

impl ArticleProcessor {
    pub fn new(
        db: Database,
        feed_source: Box<dyn FeedSource>,
        classifier: NaiveBayesClassifier,
    ) -> Self {
        Self {
            db,
            feed_source,
            classifier: Mutex::new(classifier),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn classifier(&self) -> &Mutex<NaiveBayesClassifier> {
        &self.classifier
    }

    /// Fetches every feed, then classifies and stores what is new.
    ///
    /// Articles are grouped by source across all feeds and each group is
    /// processed newest first. Once a source reaches an article that is already
    /// stored (or older than the newest one stored for that source) every
    /// remaining article of the source is skipped without further checks,
    /// since nothing after that point in the group can be new.
    pub async fn process_feeds(&self, feeds: &[String]) -> Result<ProcessStats> {
        let mut stats = ProcessStats::default();
        let mut by_source: Vec<(String, Vec<FetchedArticle>)> = Vec::new();

        for feed_url in feeds {
            let articles = match self.feed_source.fetch(feed_url).await {
                Ok(articles) => articles,
                Err(err) => {
                    error!(target: TARGET_WEB_REQUEST, "Error fetching feed {}: {:#}", feed_url, err);
                    continue;
                }
            };
            stats.fetched += articles.len();

            for article in articles {
                match by_source.iter_mut().find(|(source, _)| *source == article.source) {
                    Some((_, group)) => group.push(article),
                    None => by_source.push((article.source.clone(), vec![article])),
                }
            }
        }

        for (source, mut articles) in by_source {
            articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            let latest = match self.db.latest_published_at(&source).await {
                Ok(latest) => latest,
                Err(err) => {
                    error!(target: TARGET_WEB_REQUEST, "Skipping source {}: {}", source, err);
                    stats.skipped += articles.len();
                    continue;
                }
            };

            let mut stop = false;
            for article in &articles {
                if stop {
                    stats.skipped += 1;
                    continue;
                }

                if let Err(err) = self
                    .process_article(article, latest, &mut stop, &mut stats)
                    .await
                {
                    error!(target: TARGET_WEB_REQUEST, "Error processing article {:?}: {:#}", article.title, err);
                    stats.skipped += 1;
                }
            }
        }

        info!(
            target: TARGET_WEB_REQUEST,
            "Processed feeds: {} fetched, {} classified, {} stored, {} skipped",
            stats.fetched, stats.classified, stats.stored, stats.skipped
        );
        Ok(stats)
    }

    async fn process_article(
        &self,
        article: &FetchedArticle,
        latest: Option<DateTime<Utc>>,
        stop: &mut bool,
        stats: &mut ProcessStats,
    ) -> Result<()> {
        let reached_known = |published: Option<DateTime<Utc>>| match (latest, published) {
            (Some(latest), Some(published)) => published <= latest,
            _ => false,
        };

        if let (Some(latest), Some(published)) = (latest, article.published_at) {
            if published < latest {
                debug!(target: TARGET_WEB_REQUEST, "Older than the newest stored article of {}, stopping", article.source);
                stats.skipped += 1;
                *stop = true;
                return Ok(());
            }
        }

        if self.db.has_link(&article.link).await? {
            debug!(target: TARGET_WEB_REQUEST, "Already stored: {}", article.link);
            stats.skipped += 1;
            *stop = reached_known(article.published_at);
            return Ok(());
        }

        if let Some(published) = article.published_at {
            if self
                .db
                .has_source_published_at(&article.source, &published)
                .await?
            {
                debug!(target: TARGET_WEB_REQUEST, "{} already has an article published at {}", article.source, published);
                stats.skipped += 1;
                *stop = reached_known(Some(published));
                return Ok(());
            }
        }

        let mut classifier = self.classifier.lock().await;
        let Some(classification) = classifier.classify(&article.title, &article.content) else {
            debug!(target: TARGET_CLASSIFIER, "Unclassified: {:?}", article.title);
            stats.skipped += 1;
            return Ok(());
        };
        stats.classified += 1;

        self.db
            .insert_article(&article.to_new_article(classification), Utc::now())
            .await
            .context("failed to store article")?;
        stats.stored += 1;

        if let Err(err) = classifier.train(&article.title, &article.content, classification) {
            error!(target: TARGET_CLASSIFIER, "Stored {:?} but failed to train on it: {}", article.title, err);
        }
        Ok(())
    }

    /// Summarizes the most recent active articles of `classification` and
    /// records the keywords the summarizer suggests. Returns `false` when the
    /// label has no active articles.
    pub async fn generate_summary_for_classification(
        &self,
        classification: Classification,
        summarizer: &dyn Summarizer,
    ) -> Result<bool> {
        let now = Utc::now();
        let articles = self
            .db
            .recent_active_by_classification(classification, now, SUMMARY_ARTICLE_LIMIT)
            .await?;

        let Some(most_recent) = articles.first() else {
            info!(target: TARGET_LLM_REQUEST, "No articles found for classification: {}", classification);
            return Ok(false);
        };

        let texts: Vec<ArticleText> = articles
            .iter()
            .map(|article| ArticleText {
                title: article.title.clone(),
                content: article.content.clone(),
            })
            .collect();

        if let Some(summary) = summarizer.generate_summary(&texts, classification).await {
            self.db.update_summary(most_recent.id, &summary).await?;
            info!(target: TARGET_LLM_REQUEST, "Stored summary for {} on article {}", classification, most_recent.id);
        }

        let keywords = summarizer.extract_keywords(&texts, classification).await;
        let mut inserted = 0;
        for word in &keywords {
            if self
                .db
                .insert_stopword(word, classification, Some(most_recent.id), now)
                .await?
            {
                inserted += 1;
            }
        }
        info!(target: TARGET_LLM_REQUEST, "Recorded {} new of {} keywords for {}", inserted, keywords.len(), classification);

        Ok(true)
    }

    /// Runs [`generate_summary_for_classification`](Self::generate_summary_for_classification)
    /// for one label, or all of them.
    pub async fn generate_summaries(
        &self,
        only: Option<&str>,
        summarizer: &dyn Summarizer,
    ) -> Result<SummaryReport> {
        let classifications = match only {
            Some(label) => vec![label.parse::<Classification>()?],
            None => Classification::ALL.to_vec(),
        };

        let mut succeeded = 0;
        for classification in &classifications {
            match self
                .generate_summary_for_classification(*classification, summarizer)
                .await
            {
                Ok(true) => succeeded += 1,
                Ok(false) => {}
                Err(err) => {
                    error!(target: TARGET_LLM_REQUEST, "Error generating summary for {}: {:#}", classification, err);
                }
            }
        }

        Ok(SummaryReport {
            succeeded,
            total: classifications.len(),
        })
    }

    /// Retrains the classifier from the stored articles with an equal number
    /// of documents per label.
    pub async fn rebalance(&self) -> Result<RebalanceReport> {
        let articles = self.db.all_articles().await?;

        let distribution: Vec<(Classification, usize)> = Classification::ALL
            .iter()
            .map(|class| {
                let count = articles
                    .iter()
                    .filter(|article| article.classification == *class)
                    .count();
                (*class, count)
            })
            .collect();
        for (class, count) in &distribution {
            info!(target: TARGET_CLASSIFIER, "Current distribution: {} = {}", class, count);
        }

        if let Some((empty, _)) = distribution.iter().find(|(_, count)| *count == 0) {
            return Err(ClassifierError::EmptyClass(empty.to_string()).into());
        }

        let documents: Vec<LabeledDocument> = articles
            .into_iter()
            .map(|article| LabeledDocument {
                title: article.title,
                content: article.content,
                classification: article.classification,
            })
            .collect();

        let mut classifier = self.classifier.lock().await;
        let per_class = classifier.retrain_with_balanced_data(&documents)?;
        let class_counts = Classification::ALL
            .iter()
            .map(|class| (*class, classifier.brain().class_count(*class)))
            .collect();

        Ok(RebalanceReport {
            distribution,
            per_class,
            class_counts,
        })
    }

    /// Feeds every stored keyword into the classifier. Returns how many were
    /// applied.
    pub async fn update_classifier(&self) -> Result<usize> {
        let stopwords = self.db.all_stopwords().await?;
        if stopwords.is_empty() {
            warn!(target: TARGET_CLASSIFIER, "No stopwords found in database");
            return Ok(0);
        }

        let keywords: Vec<(String, Classification)> = stopwords
            .into_iter()
            .map(|stopword| (stopword.word, stopword.classification))
            .collect();

        let mut classifier = self.classifier.lock().await;
        Ok(classifier.update_from_stopwords(&keywords)?)
    }
}
