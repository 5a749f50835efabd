use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use newsfeed::classification::Classification;
use newsfeed::classifier::NaiveBayesClassifier;
use newsfeed::db::Database;
use newsfeed::environment::{self, Settings};
use newsfeed::llm::build_llm_client;
use newsfeed::logging::configure_logging;
use newsfeed::processor::ArticleProcessor;
use newsfeed::rss::{FeedSource, HttpFeedSource, SourceResolver};
use newsfeed::summarizer::LlmSummarizer;
use newsfeed::TARGET_WEB_REQUEST;

#[derive(Parser)]
#[command(author, version, about = "Topical news feed ingestion and classification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the configured feeds, classify and store new articles
    Fetch,

    /// Generate summaries and keywords for recent articles
    Summarize {
        /// Only summarize this classification (e.g. "Climate Change")
        #[arg(short, long)]
        classification: Option<String>,
    },

    /// Retrain the classifier with the same number of stored articles per classification
    Rebalance,

    /// Feed stored keywords into the classifier
    UpdateClassifier,

    /// Replace the classifier brain with an initial training file
    ImportTraining {
        /// Training file; defaults to INITIAL_TRAINING_PATH
        file: Option<PathBuf>,
    },

    /// Delete expired articles
    Cleanup,

    /// Classify a piece of text and show the probability of every label
    Classify {
        #[arg(short, long, default_value = "")]
        title: String,

        #[arg(short, long)]
        content: String,
    },

    /// Teach the classifier the correct label for a piece of text
    Correct {
        #[arg(short, long, default_value = "")]
        title: String,

        #[arg(short, long)]
        content: String,

        /// The correct classification
        #[arg(short = 'l', long)]
        classification: String,
    },

    /// Record a keyword for a classification
    AddKeyword {
        #[arg(short, long)]
        word: String,

        #[arg(short = 'l', long)]
        classification: String,
    },

    /// Show classifier and database statistics
    Stats,

    /// Fetch a single feed and print what would be ingested
    TestFeed {
        /// Feed URL
        url: String,
    },
}

fn load_classifier(settings: &Settings) -> Result<NaiveBayesClassifier> {
    NaiveBayesClassifier::new(&settings.brain_paths(), settings.classifier)
        .context("failed to load classifier")
}

async fn open_database(settings: &Settings) -> Result<Database> {
    Database::new(&settings.database_path)
        .await
        .with_context(|| format!("failed to open database {}", settings.database_path))
}

async fn build_processor(settings: &Settings) -> Result<ArticleProcessor> {
    let resolver = SourceResolver::new(settings.feed_sources.clone());
    Ok(ArticleProcessor::new(
        open_database(settings).await?,
        Box::new(HttpFeedSource::new(resolver)),
        load_classifier(settings)?,
    ))
}

fn print_distribution(scores: &[(Classification, f64)]) {
    for (class, probability) in scores {
        println!("  {:<20} {:.4}", class.as_str(), probability);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_logging(&environment::log_dir());
    let settings = Settings::from_env();

    match cli.command {
        Commands::Fetch => {
            if settings.feeds.is_empty() {
                bail!("No RSS feeds configured");
            }
            let processor = build_processor(&settings).await?;
            let stats = processor.process_feeds(&settings.feeds).await?;
            println!("Fetched: {}", stats.fetched);
            println!("Classified: {}", stats.classified);
            println!("Stored: {}", stats.stored);
            println!("Skipped: {}", stats.skipped);
        }
        Commands::Summarize { classification } => {
            let processor = build_processor(&settings).await?;
            let summarizer = LlmSummarizer::new(build_llm_client(&settings.llm), settings.llm.model.clone());
            let report = processor
                .generate_summaries(classification.as_deref(), &summarizer)
                .await?;
            println!("Summaries generated: {}/{} successful", report.succeeded, report.total);
        }
        Commands::Rebalance => {
            let processor = build_processor(&settings).await?;
            let report = processor.rebalance().await?;
            println!("Current distribution:");
            for (class, count) in &report.distribution {
                println!("  {}: {}", class, count);
            }
            println!("Retrained with {} articles per classification", report.per_class);
            for (class, count) in &report.class_counts {
                println!("  {}: {}", class, count);
            }
        }
        Commands::UpdateClassifier => {
            let processor = build_processor(&settings).await?;
            let applied = processor.update_classifier().await?;
            println!("Updated classifier with {} stopwords", applied);
        }
        Commands::ImportTraining { file } => {
            let paths = settings.brain_paths();
            let file = file.unwrap_or_else(|| paths.initial_training.clone());
            let classifier =
                NaiveBayesClassifier::import_initial_training(&paths, &file, settings.classifier)?;
            let brain = classifier.brain();
            println!("Imported training data from {}", file.display());
            println!("Total documents: {}", brain.total_documents);
            println!("Vocabulary size: {}", brain.vocabulary.len());
            for class in Classification::ALL {
                let unique_words = brain.word_counts.get(&class).map(|w| w.len()).unwrap_or(0);
                println!(
                    "  {}: {} documents, {} unique words",
                    class,
                    brain.class_count(class),
                    unique_words
                );
            }
        }
        Commands::Cleanup => {
            let db = open_database(&settings).await?;
            let deleted = db.delete_expired_articles(Utc::now()).await?;
            println!("Deleted {} expired articles", deleted);
        }
        Commands::Classify { title, content } => {
            let classifier = load_classifier(&settings)?;
            match classifier.classify(&title, &content) {
                Some(class) => println!("Classification: {}", class),
                None => println!("Classification: none"),
            }
            print_distribution(&classifier.confidence_scores(&title, &content));
        }
        Commands::Correct {
            title,
            content,
            classification,
        } => {
            let correct: Classification = classification.parse()?;
            let mut classifier = load_classifier(&settings)?;
            match classifier.learn_from_correction(&title, &content, correct)? {
                Some(wrong) => println!("Corrected {} -> {}", wrong, correct),
                None => println!("Trained as {}", correct),
            }
        }
        Commands::AddKeyword {
            word,
            classification,
        } => {
            let class: Classification = classification.parse()?;
            let db = open_database(&settings).await?;
            if db.insert_stopword(&word, class, None, Utc::now()).await? {
                println!("Added keyword {:?} for {}", word.trim().to_lowercase(), class);
            } else {
                println!("Keyword {:?} already recorded for {}", word.trim().to_lowercase(), class);
            }
        }
        Commands::Stats => {
            let classifier = load_classifier(&settings)?;
            let brain = classifier.brain();
            let db = open_database(&settings).await?;
            let (articles, active, stopwords) = db.collect_stats(Utc::now()).await?;

            println!(
                "newsfeed {} ({}, built {})",
                env!("CARGO_PKG_VERSION"),
                option_env!("GIT_HASH").unwrap_or("unknown"),
                option_env!("BUILD_TIMESTAMP").unwrap_or("unknown")
            );
            println!("Brain: {}", settings.brain_path.display());
            println!("  Total documents: {}", brain.total_documents);
            println!("  Vocabulary size: {}", brain.vocabulary.len());
            for class in Classification::ALL {
                println!(
                    "  {}: {} documents (weight {:.3})",
                    class,
                    brain.class_count(class),
                    classifier.weights().get(class)
                );
            }
            println!("Database: {}", settings.database_path);
            println!("  Articles: {} ({} active)", articles, active);
            for (class, count) in db.count_by_classification().await? {
                println!("  {}: {}", class, count);
            }
            println!("  Stopwords: {}", stopwords);
        }
        Commands::TestFeed { url } => {
            let source = HttpFeedSource::new(SourceResolver::new(settings.feed_sources.clone()));
            let articles = source.fetch(&url).await?;
            info!(target: TARGET_WEB_REQUEST, "Fetched {} entries from {}", articles.len(), url);
            for article in &articles {
                println!(
                    "{} | {} | {}",
                    article
                        .published_at
                        .map(|d| d.to_rfc3339())
                        .unwrap_or_else(|| "undated".to_string()),
                    article.source,
                    article.title
                );
                println!("    {}", article.link);
                if let Some(image) = &article.image_url {
                    println!("    image: {}", image);
                }
            }
            println!("{} entries", articles.len());
        }
    }

    Ok(())
}
