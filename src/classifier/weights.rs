use std::collections::BTreeMap;

use crate::classification::Classification;

/// Inverse-frequency weights applied to each class prior, so that a class
/// with few training documents is not drowned out by the largest one.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassWeights(BTreeMap<Classification, f64>);

impl ClassWeights {
    pub fn uniform() -> Self {
        ClassWeights(Classification::ALL.iter().map(|c| (*c, 1.0)).collect())
    }

    /// `max_count / count` per class; 1.0 for an empty class, and 1.0 across
    /// the board when nothing has been trained yet.
    pub fn from_counts(class_counts: &BTreeMap<Classification, u64>) -> Self {
        let count_of = |class: &Classification| class_counts.get(class).copied().unwrap_or(0);
        let max_count = Classification::ALL.iter().map(count_of).max().unwrap_or(0);

        if max_count == 0 {
            return ClassWeights::uniform();
        }

        ClassWeights(
            Classification::ALL
                .iter()
                .map(|class| {
                    let count = count_of(class);
                    let weight = if count > 0 {
                        max_count as f64 / count as f64
                    } else {
                        1.0
                    };
                    (*class, weight)
                })
                .collect(),
        )
    }

    pub fn get(&self, class: Classification) -> f64 {
        self.0.get(&class).copied().unwrap_or(1.0)
    }
}

impl Default for ClassWeights {
    fn default() -> Self {
        ClassWeights::uniform()
    }
}
