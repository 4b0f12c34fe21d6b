//! Two-stage pet classification on top of ONNX Runtime.
//!
//! A gate model decides whether an image shows a pet; only then does a
//! species model pick dog, cat, hamster or parrot.

mod classification;
mod classifier;
mod completion;
mod error;
mod image_input;
mod labels;
mod model_service;
mod ort_service;

pub mod config;
pub mod telemetry;

pub use classification::{AnalysisResponse, Classification, Species, UnknownSpecies, NOT_A_PET};
pub use classifier::PetClassifier;
pub use completion::{Completion, InferenceOutcome};
pub use error::{ImageInputError, InferenceError, ModelLoadError};
pub use image_input::ImageInput;
pub use model_service::{InferenceEngine, InferenceRequest, ModelLoader, Stage};
pub use ort_service::{OrtEngine, OrtModelLoader};
