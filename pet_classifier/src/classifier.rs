use crate::{
    classification::{best_candidate, AnalysisResponse, Classification, Species},
    completion::await_completion,
    config::{default_pet_label, Config},
    error::ModelLoadError,
    image_input::ImageInput,
    model_service::{InferenceEngine, InferenceRequest, ModelLoader, Stage},
    ort_service::OrtModelLoader,
};
use image::RgbImage;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::instrument;

/// Holds the model once built. `load` runs under `init` so a loader started
/// by a caller that went away still finishes, and later callers reuse it.
struct ModelSlot<M> {
    model: OnceLock<M>,
    init: Mutex<()>,
}

impl<M> ModelSlot<M> {
    fn new() -> Self {
        Self {
            model: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    fn get(&self) -> Option<&M> {
        self.model.get()
    }

    fn load_with<L>(&self, loader: &L) -> Result<(), ModelLoadError>
    where
        L: ModelLoader<Model = M>,
    {
        let _guard = self.init.lock();
        if self.model.get().is_some() {
            return Ok(());
        }

        tracing::info!("Loading classification models");
        let model = loader.load()?;
        let _ = self.model.set(model);
        Ok(())
    }
}

/// Two-stage pet classifier.
///
/// The model handle is built by `loader` on first use and shared by every
/// later call. A gate stage decides pet vs not-pet; only a positive gate
/// runs the species stage.
pub struct PetClassifier<L: ModelLoader> {
    loader: Arc<L>,
    model: Arc<ModelSlot<L::Model>>,
    pet_label: String,
}

impl PetClassifier<OrtModelLoader> {
    pub fn from_config(config: &Config) -> Self {
        let loader = OrtModelLoader::new(config.model.clone(), config.labels.clone());
        Self::new(loader).with_pet_label(config.labels.pet_label.clone())
    }
}

impl<L: ModelLoader> PetClassifier<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            model: Arc::new(ModelSlot::new()),
            pet_label: default_pet_label(),
        }
    }

    /// Gate label that counts as a pet. Defaults to `pets`.
    pub fn with_pet_label(mut self, pet_label: impl Into<String>) -> Self {
        self.pet_label = pet_label.into();
        self
    }

    /// Loads the model now so a broken artifact stops startup instead of the
    /// first request.
    pub async fn warm_up(&self) -> Result<(), ModelLoadError> {
        self.try_model().await.map(|_| ())
    }

    async fn try_model(&self) -> Result<&L::Model, ModelLoadError> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let loader = Arc::clone(&self.loader);
        let slot = Arc::clone(&self.model);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime
                .spawn_blocking(move || slot.load_with(loader.as_ref()))
                .await
                .map_err(|e| ModelLoadError::Join(e.to_string()))??,
            Err(_) => slot.load_with(loader.as_ref())?,
        }

        self.model
            .get()
            .ok_or_else(|| ModelLoadError::Other("model missing after load".to_string()))
    }

    async fn model(&self) -> &L::Model {
        match self.try_model().await {
            Ok(model) => model,
            Err(err) => {
                tracing::error!("Failed to load classification model: {}", err);
                panic!("failed to load classification model: {err}");
            }
        }
    }

    #[instrument(skip(self, image))]
    pub async fn classify(&self, image: Option<ImageInput>) -> AnalysisResponse {
        let Some(image) = image else {
            tracing::warn!("No image provided for analysis");
            return AnalysisResponse::NotPet;
        };
        let image = match image.into_rgb() {
            Ok(image) => Arc::new(image),
            Err(err) => {
                tracing::warn!("Invalid image provided for analysis: {}", err);
                return AnalysisResponse::NotPet;
            }
        };

        let model = self.model().await;

        let Some(gate) = run_stage(model, Stage::Gate, &image).await else {
            return AnalysisResponse::NotPet;
        };
        if gate.label != self.pet_label {
            tracing::info!(
                label = %gate.label,
                confidence = %gate.confidence_percentage(),
                "Not a pet"
            );
            return AnalysisResponse::NotPet;
        }

        let Some(species) = run_stage(model, Stage::Species, &image).await else {
            return AnalysisResponse::NotPet;
        };
        match species.label.parse::<Species>() {
            Ok(species_kind) => {
                tracing::info!(
                    label = %species.label,
                    confidence = %species.confidence_percentage(),
                    "Pet detected"
                );
                AnalysisResponse::Pet(species_kind)
            }
            Err(err) => {
                tracing::warn!("Species stage returned an unusable label: {}", err);
                AnalysisResponse::NotPet
            }
        }
    }
}

async fn run_stage<E: InferenceEngine>(
    engine: &E,
    stage: Stage,
    image: &Arc<RgbImage>,
) -> Option<Classification> {
    let request = InferenceRequest {
        stage,
        image: Arc::clone(image),
    };

    match await_completion(|completion| engine.perform(request, completion)).await {
        Ok(candidates) => {
            let best = best_candidate(&candidates).cloned();
            if best.is_none() {
                tracing::warn!("{} stage returned no classifications", stage);
            }
            best
        }
        Err(err) => {
            tracing::warn!("{} stage failed: {}", stage, err);
            None
        }
    }
}
