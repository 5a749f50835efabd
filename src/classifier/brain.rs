//! The persisted Naive Bayes parameters ("brain") and their on-disk format.
//!
//! The brain is stored as one pretty-printed JSON document. Older releases
//! wrote `vocabulary_size` instead of the vocabulary itself and
//! `category_counts` instead of `class_counts`; [`migrate_legacy`] upgrades
//! such documents once, at load, so the rest of the classifier only ever sees
//! the canonical shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::classification::Classification;
use crate::error::ClassifierError;
use crate::TARGET_CLASSIFIER;

/// Where the brain lives, and where an initial training corpus may be found
/// when no brain has been written yet.
#[derive(Debug, Clone)]
pub struct BrainPaths {
    pub brain: PathBuf,
    pub initial_training: PathBuf,
}

impl BrainPaths {
    pub fn new(brain: impl Into<PathBuf>, initial_training: impl Into<PathBuf>) -> Self {
        BrainPaths {
            brain: brain.into(),
            initial_training: initial_training.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    pub vocabulary: BTreeSet<String>,
    #[serde(default)]
    pub vocabulary_frequency: BTreeMap<String, u64>,
    pub class_counts: BTreeMap<Classification, u64>,
    pub word_counts: BTreeMap<Classification, BTreeMap<String, u64>>,
    pub total_documents: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_words: Option<Vec<String>>,
}

impl Default for Brain {
    fn default() -> Self {
        Brain::empty()
    }
}

impl Brain {
    /// A brain with zero documents for every class and no vocabulary.
    pub fn empty() -> Self {
        Brain {
            vocabulary: BTreeSet::new(),
            vocabulary_frequency: BTreeMap::new(),
            class_counts: Classification::ALL.iter().map(|c| (*c, 0)).collect(),
            word_counts: Classification::ALL
                .iter()
                .map(|c| (*c, BTreeMap::new()))
                .collect(),
            total_documents: 0,
            stop_words: None,
        }
    }

    pub fn class_count(&self, class: Classification) -> u64 {
        self.class_counts.get(&class).copied().unwrap_or(0)
    }

    pub fn word_count(&self, class: Classification, word: &str) -> u64 {
        self.word_counts
            .get(&class)
            .and_then(|counts| counts.get(word))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of every word count recorded for `class`.
    pub fn class_total_words(&self, class: Classification) -> u64 {
        self.word_counts
            .get(&class)
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    /// Number of classes (not documents) in which `word` has a nonzero count.
    pub fn document_frequency(&self, word: &str) -> usize {
        Classification::ALL
            .iter()
            .filter(|class| self.word_count(**class, word) > 0)
            .count()
    }

    /// Reads the brain at `paths.brain`, healing legacy or damaged documents.
    ///
    /// Falls back to the initial training corpus when no brain exists yet, and
    /// to an empty brain when neither file exists. Whatever shape is adopted is
    /// written back before returning.
    pub fn load(paths: &BrainPaths) -> Result<Self, ClassifierError> {
        if paths.brain.exists() {
            let content = fs::read_to_string(&paths.brain)?;
            match serde_json::from_str::<Value>(&content) {
                Ok(mut value) => {
                    let migrated = migrate_legacy(&mut value);
                    match serde_json::from_value::<Brain>(value) {
                        Ok(brain) => {
                            if migrated {
                                info!(target: TARGET_CLASSIFIER, "Upgraded legacy classifier brain at {}", paths.brain.display());
                                brain.save(&paths.brain)?;
                            }
                            debug!(target: TARGET_CLASSIFIER, "Loaded classifier brain with {} documents", brain.total_documents);
                            return Ok(brain);
                        }
                        Err(err) => {
                            warn!(target: TARGET_CLASSIFIER, "Classifier brain at {} is malformed, resetting: {}", paths.brain.display(), err);
                        }
                    }
                }
                Err(err) => {
                    warn!(target: TARGET_CLASSIFIER, "Classifier brain at {} is not valid JSON, resetting: {}", paths.brain.display(), err);
                }
            }

            let brain = Brain::empty();
            brain.save(&paths.brain)?;
            return Ok(brain);
        }

        if paths.initial_training.exists() {
            let content = fs::read_to_string(&paths.initial_training)?;
            let brain = match serde_json::from_str::<Value>(&content) {
                Ok(value) if value.is_object() => {
                    let brain = Brain::from_initial_training(&value);
                    info!(target: TARGET_CLASSIFIER, "Loaded initial training data into classifier brain ({} documents)", brain.total_documents);
                    brain
                }
                Ok(_) => {
                    warn!(target: TARGET_CLASSIFIER, "Initial training data is not a JSON object, starting empty");
                    Brain::empty()
                }
                Err(err) => {
                    warn!(target: TARGET_CLASSIFIER, "Failed to parse initial training data: {}", err);
                    Brain::empty()
                }
            };
            brain.save(&paths.brain)?;
            return Ok(brain);
        }

        info!(target: TARGET_CLASSIFIER, "No classifier brain found, initializing an empty one at {}", paths.brain.display());
        let brain = Brain::empty();
        brain.save(&paths.brain)?;
        Ok(brain)
    }

    /// Converts an initial training document (`total_documents`,
    /// `category_counts`, per-class `word_counts`, optional `stop_words`).
    pub fn from_initial_training(training: &Value) -> Self {
        let mut brain = Brain::empty();
        brain.total_documents = training
            .get("total_documents")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        for class in Classification::ALL {
            let count = training
                .get("category_counts")
                .and_then(|counts| counts.get(class.as_str()))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            brain.class_counts.insert(class, count);

            let words = training
                .get("word_counts")
                .and_then(|counts| counts.get(class.as_str()))
                .and_then(Value::as_object)
                .map(|words| {
                    words
                        .iter()
                        .filter_map(|(word, count)| count.as_u64().map(|c| (word.clone(), c)))
                        .collect::<BTreeMap<_, _>>()
                })
                .unwrap_or_default();
            brain.vocabulary.extend(words.keys().cloned());
            brain.word_counts.insert(class, words);
        }

        if let Some(stop_words) = training.get("stop_words").and_then(Value::as_array) {
            brain.stop_words = Some(
                stop_words
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_lowercase)
                    .collect(),
            );
        }

        brain
    }

    /// Writes the whole brain to `path`, replacing any previous file in a
    /// single rename.
    pub fn save(&self, path: &Path) -> Result<(), ClassifierError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json)?;
        fs::rename(&staging, path)?;
        Ok(())
    }
}

/// Upgrades a persisted brain document to the canonical shape in place.
///
/// Returns whether anything was changed. Running it on its own output is a
/// no-op.
pub fn migrate_legacy(value: &mut Value) -> bool {
    let Some(doc) = value.as_object_mut() else {
        return false;
    };
    let mut changed = false;

    if !doc.contains_key("vocabulary") {
        let mut vocabulary = BTreeSet::new();
        if doc.remove("vocabulary_size").is_some() {
            if let Some(word_counts) = doc.get("word_counts").and_then(Value::as_object) {
                for counts in word_counts.values().filter_map(Value::as_object) {
                    vocabulary.extend(counts.keys().cloned());
                }
            }
        }
        doc.insert(
            "vocabulary".to_string(),
            Value::Array(vocabulary.into_iter().map(Value::String).collect()),
        );
        changed = true;
    }

    if !doc.contains_key("class_counts") {
        let counts = doc
            .remove("category_counts")
            .unwrap_or_else(|| Value::Object(Map::new()));
        doc.insert("class_counts".to_string(), counts);
        changed = true;
    }

    for key in ["vocabulary_frequency", "word_counts"] {
        if !doc.contains_key(key) {
            doc.insert(key.to_string(), Value::Object(Map::new()));
            changed = true;
        }
    }

    changed |= normalize_class_map(doc, "class_counts", || Value::from(0u64));
    changed |= normalize_class_map(doc, "word_counts", || Value::Object(Map::new()));

    if !doc.contains_key("total_documents") {
        let total: u64 = doc
            .get("class_counts")
            .and_then(Value::as_object)
            .map(|counts| counts.values().filter_map(Value::as_u64).sum())
            .unwrap_or(0);
        doc.insert("total_documents".to_string(), Value::from(total));
        changed = true;
    }

    changed
}

/// Ensures a per-class map has exactly the five known labels as keys.
fn normalize_class_map(doc: &mut Map<String, Value>, key: &str, empty: impl Fn() -> Value) -> bool {
    let Some(map) = doc.get_mut(key).and_then(Value::as_object_mut) else {
        return false;
    };
    let mut changed = false;

    let unknown: Vec<String> = map
        .keys()
        .filter(|label| Classification::from_label(label).is_none())
        .cloned()
        .collect();
    for label in unknown {
        warn!(target: TARGET_CLASSIFIER, "Dropping unknown classification {:?} from {}", label, key);
        map.remove(&label);
        changed = true;
    }

    for class in Classification::ALL {
        if !map.contains_key(class.as_str()) {
            map.insert(class.as_str().to_string(), empty());
            changed = true;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn paths_in(dir: &TempDir) -> BrainPaths {
        BrainPaths::new(
            dir.path().join("classifier_brain.json"),
            dir.path().join("initial_training.json"),
        )
    }

    #[test]
    fn test_missing_files_initialize_and_persist_empty_brain() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);

        let brain = Brain::load(&paths).unwrap();

        assert_eq!(brain, Brain::empty());
        assert!(paths.brain.exists());
        for class in Classification::ALL {
            assert_eq!(brain.class_count(class), 0);
        }
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);

        let mut brain = Brain::empty();
        brain.vocabulary.insert("drought".to_string());
        brain.vocabulary_frequency.insert("drought".to_string(), 3);
        brain.class_counts.insert(Classification::ClimateChange, 2);
        brain.total_documents = 2;
        brain
            .word_counts
            .get_mut(&Classification::ClimateChange)
            .unwrap()
            .insert("drought".to_string(), 3);
        brain.save(&paths.brain).unwrap();

        let reloaded = Brain::load(&paths).unwrap();
        assert_eq!(reloaded, brain);
    }

    #[test]
    fn test_persisted_format_uses_label_keys() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);
        Brain::empty().save(&paths.brain).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&paths.brain).unwrap()).unwrap();
        assert!(raw["class_counts"].get("LGBTQIA+").is_some());
        assert!(raw["word_counts"].get("Climate Change").is_some());
        assert!(raw["vocabulary"].is_array());
        assert!(raw.get("stop_words").is_none());
    }

    #[test]
    fn test_legacy_shape_is_upgraded_and_rewritten() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);
        let legacy = json!({
            "vocabulary_size": 3,
            "category_counts": {"Climate Change": 2, "Immigration": 1},
            "word_counts": {
                "Climate Change": {"emissions": 2, "drought": 1},
                "Immigration": {"asylum": 1, "drought": 1}
            },
            "total_documents": 3
        });
        fs::write(&paths.brain, legacy.to_string()).unwrap();

        let brain = Brain::load(&paths).unwrap();

        let expected: BTreeSet<String> = ["asylum", "drought", "emissions"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(brain.vocabulary, expected);
        assert_eq!(brain.class_count(Classification::ClimateChange), 2);
        assert_eq!(brain.class_count(Classification::Immigration), 1);
        assert_eq!(brain.class_count(Classification::EconomicJustice), 0);

        let raw: Value = serde_json::from_str(&fs::read_to_string(&paths.brain).unwrap()).unwrap();
        assert!(raw.get("vocabulary_size").is_none());
        assert!(raw.get("category_counts").is_none());
        assert!(raw.get("class_counts").is_some());
    }

    #[test]
    fn test_migration_is_idempotent() {
        let mut once = json!({
            "vocabulary_size": 1,
            "category_counts": {"Economic Justice": 4},
            "word_counts": {"Economic Justice": {"wages": 4}},
            "total_documents": 4
        });
        assert!(migrate_legacy(&mut once));

        let mut twice = once.clone();
        assert!(!migrate_legacy(&mut twice));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unknown_classes_are_dropped_during_migration() {
        let mut doc = json!({
            "vocabulary": [],
            "vocabulary_frequency": {},
            "class_counts": {"Sports": 9, "Immigration": 1},
            "word_counts": {"Sports": {"goal": 9}},
            "total_documents": 1
        });
        assert!(migrate_legacy(&mut doc));
        let brain: Brain = serde_json::from_value(doc).unwrap();
        assert_eq!(brain.class_count(Classification::Immigration), 1);
        assert_eq!(brain.class_counts.len(), 5);
        assert_eq!(brain.word_counts.len(), 5);
    }

    #[test]
    fn test_corrupt_brain_resets_to_empty() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);
        fs::write(&paths.brain, "{not json").unwrap();

        let brain = Brain::load(&paths).unwrap();
        assert_eq!(brain, Brain::empty());

        let reloaded = Brain::load(&paths).unwrap();
        assert_eq!(reloaded, Brain::empty());
    }

    #[test]
    fn test_initial_training_is_adopted() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);
        let training = json!({
            "total_documents": 5,
            "category_counts": {"Reproductive Rights": 3, "LGBTQIA+": 2},
            "word_counts": {
                "Reproductive Rights": {"abortion": 4, "clinic": 2},
                "LGBTQIA+": {"transgender": 3, "clinic": 1}
            },
            "stop_words": ["Abortion", "Pride"]
        });
        fs::write(&paths.initial_training, training.to_string()).unwrap();

        let brain = Brain::load(&paths).unwrap();

        assert_eq!(brain.total_documents, 5);
        assert_eq!(brain.class_count(Classification::ReproductiveRights), 3);
        assert_eq!(brain.word_count(Classification::Lgbtqia, "transgender"), 3);
        assert_eq!(brain.vocabulary.len(), 3);
        assert_eq!(
            brain.stop_words,
            Some(vec!["abortion".to_string(), "pride".to_string()])
        );
        assert!(paths.brain.exists());
    }

    #[test]
    fn test_document_frequency_counts_classes() {
        let mut brain = Brain::empty();
        for class in [Classification::ClimateChange, Classification::Immigration] {
            brain
                .word_counts
                .get_mut(&class)
                .unwrap()
                .insert("border".to_string(), 1);
        }
        brain
            .word_counts
            .get_mut(&Classification::EconomicJustice)
            .unwrap()
            .insert("border".to_string(), 0);

        assert_eq!(brain.document_frequency("border"), 2);
        assert_eq!(brain.document_frequency("unseen"), 0);
    }
}
