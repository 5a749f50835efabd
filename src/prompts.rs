// prompts.rs

use crate::classification::Classification;
use crate::summarizer::ArticleText;

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an expert news analyst. Provide annotated summaries of recent developments, highlighting key points and trends.";

pub const KEYWORD_SYSTEM_PROMPT: &str = "You are a text analysis expert. Extract relevant keywords and terms that would help classify articles. Return only a JSON array of words/phrases, one per line, no explanations.";

/// Characters of each article's content sent for summarization.
pub const SUMMARY_CONTENT_CHARS: usize = 1000;

/// Characters of each article's content sent for keyword extraction.
pub const KEYWORD_CONTENT_CHARS: usize = 500;

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

pub fn summary_prompt(articles: &[ArticleText], classification: Classification) -> String {
    let mut prompt = format!(
        "Please provide an annotated summary of recent developments in {} based on the following articles:\n\n",
        classification
    );

    for (index, article) in articles.iter().enumerate() {
        prompt.push_str(&format!(
            "Article {}:\nTitle: {}\nContent: {}\n\n",
            index + 1,
            article.title,
            truncate_chars(&article.content, SUMMARY_CONTENT_CHARS)
        ));
    }

    prompt.push_str("Provide a comprehensive summary with key points, trends, and notable developments. Use annotations to highlight important information.");
    prompt
}

pub fn keyword_prompt(articles: &[ArticleText], classification: Classification) -> String {
    let mut prompt = format!(
        "Extract relevant keywords and terms from these {} articles that would help classify similar articles in the future. Focus on domain-specific terms, key phrases, and important concepts.\n\n",
        classification
    );

    for (index, article) in articles.iter().enumerate() {
        prompt.push_str(&format!(
            "Article {}: {}\n{}\n\n",
            index + 1,
            article.title,
            truncate_chars(&article.content, KEYWORD_CONTENT_CHARS)
        ));
    }

    prompt.push_str("Return a JSON array of unique keywords/phrases (lowercase, no duplicates).");
    prompt
}
