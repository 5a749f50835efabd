//! The five fixed topical labels an article can be filed under.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClassifierError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Climate Change")]
    ClimateChange,
    #[serde(rename = "Economic Justice")]
    EconomicJustice,
    #[serde(rename = "Reproductive Rights")]
    ReproductiveRights,
    #[serde(rename = "LGBTQIA+")]
    Lgbtqia,
    #[serde(rename = "Immigration")]
    Immigration,
}

impl Classification {
    /// Every label, in canonical order.
    pub const ALL: [Classification; 5] = [
        Classification::ClimateChange,
        Classification::EconomicJustice,
        Classification::ReproductiveRights,
        Classification::Lgbtqia,
        Classification::Immigration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::ClimateChange => "Climate Change",
            Classification::EconomicJustice => "Economic Justice",
            Classification::ReproductiveRights => "Reproductive Rights",
            Classification::Lgbtqia => "LGBTQIA+",
            Classification::Immigration => "Immigration",
        }
    }

    /// Lenient lookup used at string boundaries: `None` for anything that is
    /// not one of the exact labels.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| ClassifierError::UnknownClassification(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_strings() {
        for class in Classification::ALL {
            assert_eq!(class.as_str().parse::<Classification>().unwrap(), class);
        }
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        assert!(Classification::from_label("Sports").is_none());
        assert!(Classification::from_label("climate change").is_none());
        assert!(matches!(
            "Sports".parse::<Classification>(),
            Err(ClassifierError::UnknownClassification(_))
        ));
    }

    #[test]
    fn test_serde_uses_display_labels() {
        let json = serde_json::to_string(&Classification::Lgbtqia).unwrap();
        assert_eq!(json, "\"LGBTQIA+\"");
        let parsed: Classification = serde_json::from_str("\"Economic Justice\"").unwrap();
        assert_eq!(parsed, Classification::EconomicJustice);
    }
}
