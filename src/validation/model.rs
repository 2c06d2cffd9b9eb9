use crate::models::CardModel;
use crate::processing::ClassifierObservation;
use crate::utils::ScanConfig;

/// Card model decided from the classifier, plus whether the user should be
/// warned that the card type could not be recognised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelClassification {
    pub model: CardModel,
    pub warning: bool,
}

pub struct ModelClassifier<'a> {
    config: &'a ScanConfig,
}

impl<'a> ModelClassifier<'a> {
    pub fn new(config: &'a ScanConfig) -> Self {
        ModelClassifier { config }
    }

    pub fn classify(&self, label: &str, confidence_percent: f64) -> ModelClassification {
        if confidence_percent <= self.config.confidence_threshold_percent {
            log::warn!(
                "Card classified as {:?} with only {:.1}% confidence",
                label,
                confidence_percent
            );
            return Self::unknown();
        }

        if label == self.config.new_card_label {
            ModelClassification {
                model: CardModel::New,
                warning: false,
            }
        } else if label == self.config.old_card_label {
            ModelClassification {
                model: CardModel::Old,
                warning: false,
            }
        } else {
            log::warn!("Unrecognised card label {:?}", label);
            Self::unknown()
        }
    }

    /// No observation at all is treated like an unrecognised card.
    pub fn classify_observation(&self, observation: Option<&ClassifierObservation>) -> ModelClassification {
        match observation {
            Some(obs) => self.classify(&obs.label, obs.confidence_percent),
            None => Self::unknown(),
        }
    }

    fn unknown() -> ModelClassification {
        ModelClassification {
            model: CardModel::Unknown,
            warning: true,
        }
    }
}
