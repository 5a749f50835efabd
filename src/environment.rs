use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::classifier::{BrainPaths, ClassifierConfig};

pub const DEFAULT_DATABASE_PATH: &str = "newsfeed.db";
pub const DEFAULT_BRAIN_PATH: &str = "storage/classifier_brain.json";
pub const DEFAULT_INITIAL_TRAINING_PATH: &str = "storage/initial_training.json";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "deepseek-chat";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost";
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Feeds ingested when `RSS_FEEDS` is not set, with their display names.
pub const DEFAULT_FEEDS: [(&str, &str); 5] = [
    ("https://feeds.nbcnews.com/nbcnews/public/news", "NBC"),
    ("https://abcnews.go.com/abcnews/topstories", "ABC"),
    ("https://www.cbsnews.com/latest/rss/main", "CBS"),
    ("https://www.vox.com/rss/index.xml", "Vox"),
    ("https://feedx.net/rss/ap.xml", "Associated Press"),
];

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// Empty segments are dropped, so an unset variable yields an empty vector.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn get_env_var_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_env_var_parsed<T: std::str::FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable value {:?} for {}", raw, var);
            default
        }),
        _ => default,
    }
}

/// Log directory from `LOG_DIR`; needed before [`Settings::from_env`] runs.
pub fn log_dir() -> String {
    get_env_var_or("LOG_DIR", DEFAULT_LOG_DIR)
}

#[derive(Debug, Clone, PartialEq)]
pub enum LlmBackend {
    OpenAI,
    Ollama,
}

/// LLM connection settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub ollama_host: String,
    pub ollama_port: u16,
}

/// Everything the binary reads from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: String,
    pub brain_path: PathBuf,
    pub initial_training_path: PathBuf,
    pub feeds: Vec<String>,
    pub feed_sources: Vec<(String, String)>,
    pub llm: LlmSettings,
    pub classifier: ClassifierConfig,
    pub log_dir: String,
}

impl Settings {
    pub fn from_env() -> Self {
        let feeds = match get_env_var_as_vec("RSS_FEEDS", ';') {
            feeds if feeds.is_empty() => DEFAULT_FEEDS.iter().map(|(url, _)| url.to_string()).collect(),
            feeds => feeds,
        };

        let feed_sources = match parse_feed_sources(&get_env_var_as_vec("FEED_SOURCES", ';')) {
            sources if sources.is_empty() => DEFAULT_FEEDS
                .iter()
                .map(|(url, name)| (url.to_string(), name.to_string()))
                .collect(),
            sources => sources,
        };

        let backend = match get_env_var_or("LLM_TYPE", "openai").to_lowercase().as_str() {
            "ollama" => LlmBackend::Ollama,
            "openai" => LlmBackend::OpenAI,
            other => {
                warn!("Unknown LLM_TYPE {:?}, using openai", other);
                LlmBackend::OpenAI
            }
        };

        let defaults = ClassifierConfig::default();

        Settings {
            database_path: get_env_var_or("DATABASE_PATH", DEFAULT_DATABASE_PATH),
            brain_path: PathBuf::from(get_env_var_or("BRAIN_PATH", DEFAULT_BRAIN_PATH)),
            initial_training_path: PathBuf::from(get_env_var_or(
                "INITIAL_TRAINING_PATH",
                DEFAULT_INITIAL_TRAINING_PATH,
            )),
            feeds,
            feed_sources,
            llm: LlmSettings {
                backend,
                base_url: get_env_var_or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
                api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()),
                model: get_env_var_or("LLM_MODEL", DEFAULT_LLM_MODEL),
                ollama_host: get_env_var_or("OLLAMA_HOST", DEFAULT_OLLAMA_HOST),
                ollama_port: get_env_var_parsed("OLLAMA_PORT", DEFAULT_OLLAMA_PORT),
            },
            classifier: ClassifierConfig {
                confidence_threshold: get_env_var_parsed(
                    "CLASSIFIER_CONFIDENCE",
                    defaults.confidence_threshold,
                ),
                margin: get_env_var_parsed("CLASSIFIER_MARGIN", defaults.margin),
                ..defaults
            },
            log_dir: log_dir(),
        }
    }

    pub fn brain_paths(&self) -> BrainPaths {
        BrainPaths::new(self.brain_path.clone(), self.initial_training_path.clone())
    }
}

/// Parses `url|name` pairs; malformed entries are skipped with a warning.
pub fn parse_feed_sources(entries: &[String]) -> Vec<(String, String)> {
    entries
        .iter()
        .filter_map(|entry| match entry.split_once('|') {
            Some((url, name)) if !url.trim().is_empty() && !name.trim().is_empty() => {
                Some((url.trim().to_string(), name.trim().to_string()))
            }
            _ => {
                warn!("Ignoring malformed FEED_SOURCES entry {:?}", entry);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feed_sources() {
        let entries = vec![
            "https://a.example/rss|Alpha".to_string(),
            "no-separator".to_string(),
            " https://b.example/rss | Beta ".to_string(),
            "|Nameless".to_string(),
        ];
        assert_eq!(
            parse_feed_sources(&entries),
            vec![
                ("https://a.example/rss".to_string(), "Alpha".to_string()),
                ("https://b.example/rss".to_string(), "Beta".to_string()),
            ]
        );
    }

    #[test]
    fn test_log_dir_matches_settings() {
        assert_eq!(Settings::from_env().log_dir, log_dir());
        assert!(!log_dir().is_empty());
    }

    #[test]
    fn test_get_env_var_as_vec_drops_empty_segments() {
        env::set_var("NEWSFEED_TEST_LIST", "one; two;;three ;");
        assert_eq!(
            get_env_var_as_vec("NEWSFEED_TEST_LIST", ';'),
            vec!["one", "two", "three"]
        );
        assert!(get_env_var_as_vec("NEWSFEED_TEST_UNSET_LIST", ';').is_empty());
    }
}
