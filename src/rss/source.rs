use std::collections::HashMap;

/// Well-known outlets, keyed by the first label of the feed host.
const DOMAIN_NAMES: [(&str, &str); 13] = [
    ("nbcnews", "NBC"),
    ("abcnews", "ABC"),
    ("cbsnews", "CBS"),
    ("vox", "Vox"),
    ("feedx", "Associated Press"),
    ("cnn", "CNN"),
    ("bbc", "BBC"),
    ("reuters", "Reuters"),
    ("ap", "AP"),
    ("theguardian", "The Guardian"),
    ("nytimes", "NY Times"),
    ("washingtonpost", "Washington Post"),
    ("theatlantic", "The Atlantic"),
];

/// Names the outlet behind a feed URL.
#[derive(Debug, Clone, Default)]
pub struct SourceResolver {
    explicit: HashMap<String, String>,
}

impl SourceResolver {
    pub fn new(feed_sources: impl IntoIterator<Item = (String, String)>) -> Self {
        SourceResolver {
            explicit: feed_sources.into_iter().collect(),
        }
    }

    /// Configured name first, then the domain table, then the capitalized
    /// first host label, then `Unknown`.
    pub fn resolve(&self, feed_url: &str) -> String {
        if let Some(name) = self.explicit.get(feed_url) {
            return name.clone();
        }

        let host = url::Url::parse(feed_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_lowercase))
            .unwrap_or_default();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let first_label = host.split('.').next().unwrap_or_default();

        if let Some((_, name)) = DOMAIN_NAMES.iter().find(|(domain, _)| *domain == first_label) {
            return name.to_string();
        }

        let mut chars = first_label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Unknown".to_string(),
        }
    }
}
