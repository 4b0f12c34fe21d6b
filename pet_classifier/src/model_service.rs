use crate::{
    completion::Completion,
    error::{InferenceError, ModelLoadError},
};
use image::RgbImage;
use std::{fmt, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Pet vs not-pet.
    Gate,
    /// Which species, only asked once the gate said pet.
    Species,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Gate => f.write_str("gate"),
            Stage::Species => f.write_str("species"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub stage: Stage,
    pub image: Arc<RgbImage>,
}

/// Callback-style inference engine.
///
/// `perform` either fails synchronously or settles `completion` exactly
/// once, from any thread, with candidates ranked by descending confidence.
pub trait InferenceEngine: Send + Sync + 'static {
    fn perform(
        &self,
        request: InferenceRequest,
        completion: Completion,
    ) -> Result<(), InferenceError>;
}

/// Builds the model handle. Called at most once per classifier.
pub trait ModelLoader: Send + Sync + 'static {
    type Model: InferenceEngine;

    fn load(&self) -> Result<Self::Model, ModelLoadError>;
}
