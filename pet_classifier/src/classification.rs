use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Name reported for any image that is not recognised as a pet.
pub const NOT_A_PET: &str = "not domestic";

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into(),
            confidence,
        }
    }

    pub fn confidence_percentage(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

/// Highest-confidence candidate. On ties the earlier entry wins, so the
/// engine's own ranking decides.
pub fn best_candidate(candidates: &[Classification]) -> Option<&Classification> {
    candidates.iter().reduce(|best, candidate| {
        if candidate.confidence > best.confidence {
            candidate
        } else {
            best
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Dog,
    Cat,
    Hamster,
    Parrot,
}

impl Species {
    pub const ALL: [Species; 4] = [Species::Dog, Species::Cat, Species::Hamster, Species::Parrot];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Dog => "dog",
            Species::Cat => "cat",
            Species::Hamster => "hamster",
            Species::Parrot => "parrot",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("`{0}` is not a known species")]
pub struct UnknownSpecies(pub String);

impl FromStr for Species {
    type Err = UnknownSpecies;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dog" => Ok(Species::Dog),
            "cat" => Ok(Species::Cat),
            "hamster" => Ok(Species::Hamster),
            "parrot" => Ok(Species::Parrot),
            _ => Err(UnknownSpecies(s.to_string())),
        }
    }
}

/// Outcome of [`crate::PetClassifier::classify`].
///
/// Serialises as `{"name": ..., "isPet": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "AnalysisRecord")]
pub enum AnalysisResponse {
    Pet(Species),
    NotPet,
}

impl AnalysisResponse {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisResponse::Pet(species) => species.as_str(),
            AnalysisResponse::NotPet => NOT_A_PET,
        }
    }

    pub fn is_pet(&self) -> bool {
        matches!(self, AnalysisResponse::Pet(_))
    }

    pub fn species(&self) -> Option<Species> {
        match self {
            AnalysisResponse::Pet(species) => Some(*species),
            AnalysisResponse::NotPet => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRecord {
    name: &'static str,
    is_pet: bool,
}

impl From<AnalysisResponse> for AnalysisRecord {
    fn from(response: AnalysisResponse) -> Self {
        Self {
            name: response.name(),
            is_pet: response.is_pet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Classification::new("pets", 1.7).confidence, 1.0);
        assert_eq!(Classification::new("pets", -0.2).confidence, 0.0);
        assert_eq!(Classification::new("pets", f32::NAN).confidence, 0.0);
    }

    #[test]
    fn test_confidence_percentage() {
        let classification = Classification::new("dog", 0.8756);
        assert_eq!(classification.confidence_percentage(), "87.6%");
    }

    #[test]
    fn test_best_candidate_keeps_first_on_tie() {
        let candidates = vec![
            Classification::new("cat", 0.4),
            Classification::new("dog", 0.6),
            Classification::new("parrot", 0.6),
        ];
        assert_eq!(best_candidate(&candidates).unwrap().label, "dog");
        assert!(best_candidate(&[]).is_none());
    }

    #[test]
    fn test_species_from_label() {
        assert_eq!(" Hamster\n".parse::<Species>(), Ok(Species::Hamster));
        assert_eq!(
            "ferret".parse::<Species>(),
            Err(UnknownSpecies("ferret".to_string()))
        );
        for species in Species::ALL {
            assert_eq!(species.as_str().parse::<Species>(), Ok(species));
        }
    }

    #[test]
    fn test_response_accessors() {
        let pet = AnalysisResponse::Pet(Species::Parrot);
        assert_eq!(pet.name(), "parrot");
        assert!(pet.is_pet());
        assert_eq!(pet.species(), Some(Species::Parrot));

        assert_eq!(AnalysisResponse::NotPet.name(), NOT_A_PET);
        assert!(!AnalysisResponse::NotPet.is_pet());
        assert_eq!(AnalysisResponse::NotPet.species(), None);
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_value(AnalysisResponse::Pet(Species::Dog)).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "dog", "isPet": true }));

        let json = serde_json::to_value(AnalysisResponse::NotPet).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "not domestic", "isPet": false })
        );
    }
}
