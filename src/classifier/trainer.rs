//! Online and batch training of the brain.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::brain::Brain;
use super::tokenizer::token_frequencies;
use super::NaiveBayesClassifier;
use crate::classification::Classification;
use crate::error::ClassifierError;
use crate::TARGET_CLASSIFIER;

/// A training example, typically a stored article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledDocument {
    pub title: String,
    pub content: String,
    pub classification: Classification,
}

impl Brain {
    /// Records one document of `class` with the given token frequencies.
    fn absorb(&mut self, class: Classification, frequencies: &BTreeMap<String, u64>, admission_threshold: u64) {
        *self.class_counts.entry(class).or_insert(0) += 1;
        self.total_documents += 1;

        let class_words = self.word_counts.entry(class).or_default();
        for (word, count) in frequencies {
            let global = self.vocabulary_frequency.entry(word.clone()).or_insert(0);
            *global += count;
            *class_words.entry(word.clone()).or_insert(0) += count;

            if *global >= admission_threshold && !self.vocabulary.contains(word) {
                self.vocabulary.insert(word.clone());
            }
        }
    }
}

impl NaiveBayesClassifier {
    /// Learns one labeled document and persists the result.
    pub fn train(
        &mut self,
        title: &str,
        content: &str,
        class: Classification,
    ) -> Result<(), ClassifierError> {
        let frequencies = token_frequencies(&format!("{} {}", title, content));
        self.brain
            .absorb(class, &frequencies, self.config.admission_threshold);
        debug!(target: TARGET_CLASSIFIER, "Trained {} on {} distinct tokens", class, frequencies.len());
        self.commit()
    }

    /// Like [`train`](Self::train) but takes a free-form label; unknown labels
    /// are ignored and reported as `Ok(false)`.
    pub fn train_label(
        &mut self,
        title: &str,
        content: &str,
        label: &str,
    ) -> Result<bool, ClassifierError> {
        match Classification::from_label(label) {
            Some(class) => self.train(title, content, class).map(|_| true),
            None => {
                debug!(target: TARGET_CLASSIFIER, "Ignoring training document with unknown label {:?}", label);
                Ok(false)
            }
        }
    }

    /// Rebuilds the brain from scratch using the same number of documents for
    /// every classification: the size of the smallest class. Surplus documents
    /// are discarded at random.
    ///
    /// Refuses (leaving the current brain untouched) when any classification
    /// has no documents. Returns the per-class sample size.
    pub fn retrain_with_balanced_data(
        &mut self,
        documents: &[LabeledDocument],
    ) -> Result<usize, ClassifierError> {
        let mut grouped: BTreeMap<Classification, Vec<&LabeledDocument>> = Classification::ALL
            .iter()
            .map(|class| (*class, Vec::new()))
            .collect();
        for document in documents {
            grouped
                .entry(document.classification)
                .or_default()
                .push(document);
        }

        let (smallest, min_size) = grouped
            .iter()
            .map(|(class, docs)| (*class, docs.len()))
            .min_by_key(|(_, len)| *len)
            .unwrap_or((Classification::ClimateChange, 0));
        if min_size == 0 {
            return Err(ClassifierError::EmptyClass(smallest.to_string()));
        }

        let stop_words = self.brain.stop_words.take();
        self.brain = Brain::empty();
        self.brain.stop_words = stop_words;

        let mut rng = rand::rng();
        for (class, mut docs) in grouped {
            docs.shuffle(&mut rng);
            for document in docs.into_iter().take(min_size) {
                let frequencies =
                    token_frequencies(&format!("{} {}", document.title, document.content));
                self.brain
                    .absorb(class, &frequencies, self.config.admission_threshold);
            }
        }

        self.commit()?;
        info!(target: TARGET_CLASSIFIER, "Retrained classifier with balanced data. Each class has {} samples.", min_size);
        Ok(min_size)
    }

    /// Applies an operator correction: trains on `correct` and, when the
    /// classifier was predicting a different label, takes one document away
    /// from that label (class and total counts only; word counts stay).
    ///
    /// Returns the label that was penalized, if any.
    pub fn learn_from_correction(
        &mut self,
        title: &str,
        content: &str,
        correct: Classification,
    ) -> Result<Option<Classification>, ClassifierError> {
        let predicted = self.classify(title, content);

        let frequencies = token_frequencies(&format!("{} {}", title, content));
        self.brain
            .absorb(correct, &frequencies, self.config.admission_threshold);

        let penalized = match predicted {
            Some(wrong) if wrong != correct => {
                let count = self.brain.class_counts.entry(wrong).or_insert(0);
                *count = count.saturating_sub(1);
                self.brain.total_documents = self.brain.total_documents.saturating_sub(1);
                info!(target: TARGET_CLASSIFIER, "Correction: {} -> {}", wrong, correct);
                Some(wrong)
            }
            _ => None,
        };

        self.commit()?;
        Ok(penalized)
    }

    /// Injects externally supplied discriminative keywords straight into the
    /// vocabulary and per-class word counts, one count per pair.
    pub fn update_from_stopwords(
        &mut self,
        keywords: &[(String, Classification)],
    ) -> Result<usize, ClassifierError> {
        let mut applied = 0;
        for (word, class) in keywords {
            let word = word.trim().to_lowercase();
            if word.is_empty() {
                continue;
            }
            self.brain.vocabulary.insert(word.clone());
            *self
                .brain
                .word_counts
                .entry(*class)
                .or_default()
                .entry(word)
                .or_insert(0) += 1;
            applied += 1;
        }

        self.commit()?;
        info!(target: TARGET_CLASSIFIER, "Updated classifier with {} keywords", applied);
        Ok(applied)
    }
}
