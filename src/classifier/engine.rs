//! TF-IDF weighted, class-weighted Naive Bayes scoring.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::tokenizer::tokenize;
use super::NaiveBayesClassifier;
use crate::classification::Classification;

/// Added inside the per-token logarithm so that a zero weight never yields -inf.
pub const IDF_EPSILON: f64 = 1e-6;

/// Score given to a class that has nothing to score against.
pub const DEGENERATE_SCORE: f64 = -1000.0;

impl NaiveBayesClassifier {
    /// Picks the most probable classification, or `None` when the text is
    /// empty, the winner is not confident enough, or the runner-up is too close.
    pub fn classify(&self, title: &str, content: &str) -> Option<Classification> {
        let distribution = self.confidence_scores(title, content);
        let (top_class, top_probability) = *distribution.first()?;
        let runner_up = distribution.get(1).map(|(_, p)| *p).unwrap_or(0.0);

        if top_probability > self.config.confidence_threshold
            && top_probability - runner_up >= self.config.margin
        {
            Some(top_class)
        } else {
            None
        }
    }

    /// Probability of every classification, highest first. Empty when the text
    /// has no usable tokens.
    pub fn confidence_scores(&self, title: &str, content: &str) -> Vec<(Classification, f64)> {
        let tokens = tokenize(&format!("{} {}", title, content));
        if tokens.is_empty() {
            return Vec::new();
        }

        let scores: Vec<(Classification, f64)> = Classification::ALL
            .iter()
            .map(|class| (*class, self.log_score(&tokens, *class)))
            .collect();

        let mut distribution = softmax(&scores);
        distribution.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        distribution
    }

    fn log_score(&self, tokens: &BTreeSet<String>, class: Classification) -> f64 {
        let brain = &self.brain;
        let class_total_words = brain.class_total_words(class);
        let vocabulary_size = brain.vocabulary.len() as u64;

        if class_total_words == 0 && vocabulary_size == 0 {
            return DEGENERATE_SCORE;
        }

        let total_documents = brain.total_documents as f64;
        let class_count = brain.class_count(class) as f64;
        let prior = ((class_count + 1.0) / (total_documents + Classification::ALL.len() as f64))
            .ln()
            * self.weights.get(class);

        let denominator = (class_total_words + vocabulary_size).max(1) as f64;

        let likelihood: f64 = tokens
            .iter()
            .map(|token| {
                let tf = (brain.word_count(class, token) as f64 + 1.0) / denominator;
                let document_frequency = brain.document_frequency(token) as f64;
                let idf = ((total_documents + 1.0) / (document_frequency + 1.0)).ln() + 1.0;
                (tf * idf + IDF_EPSILON).ln()
            })
            .sum();

        prior + likelihood
    }
}

/// Normalizes log-scores into probabilities. Exponentials are taken relative
/// to the largest score so long documents do not underflow to zero.
fn softmax(scores: &[(Classification, f64)]) -> Vec<(Classification, f64)> {
    let max = scores
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::NEG_INFINITY, f64::max);

    let exponentials: Vec<(Classification, f64)> = scores
        .iter()
        .map(|(class, score)| (*class, (score - max).exp()))
        .collect();
    let sum: f64 = exponentials.iter().map(|(_, e)| e).sum();

    exponentials
        .into_iter()
        .map(|(class, e)| {
            let probability = if sum > 0.0 && sum.is_finite() {
                e / sum
            } else {
                0.0
            };
            (class, probability)
        })
        .collect()
}
