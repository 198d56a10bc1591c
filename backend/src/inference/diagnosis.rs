use std::sync::Arc;

use super::labels::LabelCatalog;
use super::model::{InferenceError, InferenceGateway};
use super::policy::ConfidencePolicy;
use super::preprocess::{DecodeError, ImageNormalizer};

#[derive(Debug, thiserror::Error)]
pub enum DiagnoseError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub disease: String,
    pub confidence: f32,
    pub treatment: String,
}

/// Normalizer, gateway, policy and label catalog wired together.
#[derive(Clone)]
pub struct Diagnoser {
    normalizer: ImageNormalizer,
    gateway: InferenceGateway,
    policy: ConfidencePolicy,
    catalog: Arc<LabelCatalog>,
}

impl Diagnoser {
    pub fn new(
        normalizer: ImageNormalizer,
        gateway: InferenceGateway,
        policy: ConfidencePolicy,
        catalog: Arc<LabelCatalog>,
    ) -> Self {
        Self {
            normalizer,
            gateway,
            policy,
            catalog,
        }
    }

    pub fn is_available(&self) -> bool {
        self.gateway.is_available()
    }

    pub fn diagnose(&self, image: &[u8]) -> Result<Diagnosis, DiagnoseError> {
        let batch = self.normalizer.normalize(image)?;
        let probabilities = self.gateway.inference(&batch)?;
        let verdict = self.policy.apply(&probabilities);
        if verdict.fallback {
            log::debug!(
                "Top score below {:.2}, reporting fallback label",
                self.policy.threshold()
            );
        }

        let disease = match verdict.index {
            Some(index) => self.catalog.label(index),
            None => None,
        }
        .unwrap_or_else(|| self.catalog.fallback())
        .to_string();

        let treatment = self
            .catalog
            .treatment(&disease)
            .unwrap_or("No treatment information available.")
            .to_string();

        Ok(Diagnosis {
            disease,
            confidence: verdict.confidence,
            treatment,
        })
    }
}
