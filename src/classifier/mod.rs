//! Persistent Naive Bayes classifier for the five article classifications.
//!
//! The classifier owns a single [`Brain`] for its whole lifetime. Scoring
//! (`engine`) is a pure read; every training path (`trainer`) mutates the
//! brain, refreshes the class weights and writes the brain back to disk before
//! returning.

pub mod brain;
mod engine;
mod trainer;
pub mod tokenizer;
pub mod weights;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub use self::brain::{migrate_legacy, Brain, BrainPaths};
pub use self::trainer::LabeledDocument;
pub use self::weights::ClassWeights;

use crate::error::ClassifierError;
use crate::TARGET_CLASSIFIER;

/// Minimum top-class probability for a classification to be accepted.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Minimum gap between the top two class probabilities.
pub const DEFAULT_MARGIN: f64 = 0.1;

/// Global occurrences a token needs before training admits it to the vocabulary.
pub const DEFAULT_ADMISSION_THRESHOLD: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    pub confidence_threshold: f64,
    pub margin: f64,
    pub admission_threshold: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            margin: DEFAULT_MARGIN,
            admission_threshold: DEFAULT_ADMISSION_THRESHOLD,
        }
    }
}

pub struct NaiveBayesClassifier {
    brain: Brain,
    weights: ClassWeights,
    config: ClassifierConfig,
    brain_path: PathBuf,
}

impl NaiveBayesClassifier {
    /// Loads (or bootstraps) the brain described by `paths`.
    pub fn new(paths: &BrainPaths, config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let brain = Brain::load(paths)?;
        let weights = ClassWeights::from_counts(&brain.class_counts);
        Ok(NaiveBayesClassifier {
            brain,
            weights,
            config,
            brain_path: paths.brain.clone(),
        })
    }

    /// Replaces the current brain with the contents of `training_file`.
    ///
    /// The existing brain file is removed and the training file is copied to
    /// `paths.initial_training`, so the regular load path adopts it.
    pub fn import_initial_training(
        paths: &BrainPaths,
        training_file: &Path,
        config: ClassifierConfig,
    ) -> Result<Self, ClassifierError> {
        if !training_file.exists() {
            return Err(ClassifierError::TrainingFileNotFound(
                training_file.to_path_buf(),
            ));
        }

        if paths.brain.exists() {
            fs::remove_file(&paths.brain)?;
        }

        if training_file != paths.initial_training.as_path() {
            if let Some(parent) = paths
                .initial_training
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                fs::create_dir_all(parent)?;
            }
            fs::copy(training_file, &paths.initial_training)?;
        }

        info!(target: TARGET_CLASSIFIER, "Importing initial training data from {}", training_file.display());
        NaiveBayesClassifier::new(paths, config)
    }

    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    pub fn weights(&self) -> &ClassWeights {
        &self.weights
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Refreshes the class weights and writes the brain through to disk.
    fn commit(&mut self) -> Result<(), ClassifierError> {
        self.weights = ClassWeights::from_counts(&self.brain.class_counts);
        self.brain.save(&self.brain_path)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::classifier_in;
    use super::*;
    use crate::classification::Classification;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_import_initial_training_replaces_brain() {
        let dir = TempDir::new().unwrap();
        let mut classifier = classifier_in(&dir);
        classifier
            .train("Border wall", "asylum hearing", Classification::Immigration)
            .unwrap();

        let source = dir.path().join("corpus.json");
        fs::write(
            &source,
            json!({
                "total_documents": 2,
                "category_counts": {"Climate Change": 2},
                "word_counts": {"Climate Change": {"glacier": 2}}
            })
            .to_string(),
        )
        .unwrap();

        let paths = BrainPaths::new(
            dir.path().join("classifier_brain.json"),
            dir.path().join("initial_training.json"),
        );
        let imported =
            NaiveBayesClassifier::import_initial_training(&paths, &source, ClassifierConfig::default())
                .unwrap();

        assert_eq!(imported.brain().total_documents, 2);
        assert_eq!(imported.brain().class_count(Classification::Immigration), 0);
        assert!(imported.brain().vocabulary.contains("glacier"));
        assert!(paths.initial_training.exists());
    }

    #[test]
    fn test_import_missing_training_file_fails() {
        let dir = TempDir::new().unwrap();
        let paths = BrainPaths::new(
            dir.path().join("classifier_brain.json"),
            dir.path().join("initial_training.json"),
        );
        let result = NaiveBayesClassifier::import_initial_training(
            &paths,
            &dir.path().join("missing.json"),
            ClassifierConfig::default(),
        );
        assert!(matches!(result, Err(ClassifierError::TrainingFileNotFound(_))));
    }
}
