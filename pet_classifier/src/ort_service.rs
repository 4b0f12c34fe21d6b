use crate::{
    classification::Classification,
    completion::{Completion, InferenceOutcome},
    config::{LabelsConfig, ModelConfig, Validatable},
    error::{InferenceError, ModelLoadError},
    labels::{check_gate_labels, check_species_labels, load_labels},
    model_service::{InferenceEngine, InferenceRequest, ModelLoader, Stage},
};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use parking_lot::Mutex;
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// Square centre crop, resized to `size`, as a `[1, 3, size, size]` tensor in `[0, 1]`.
fn transform_image(image: &RgbImage, size: u32) -> Array<f32, Ix4> {
    let (width, height) = image.dimensions();
    let side = width.min(height);
    let cropped = image::imageops::crop_imm(
        image,
        (width - side) / 2,
        (height - side) / 2,
        side,
        side,
    )
    .to_image();
    let img = image::imageops::resize(&cropped, size, size, FilterType::CatmullRom);

    let size = size as usize;
    let mut input = Array::zeros((1, 3, size, size));
    for (x, y, pixel) in img.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b] = pixel.0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    input
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Pairs scores with labels and ranks them by descending confidence.
/// The sort is stable so equal scores keep the model's label order.
fn rank_scores(
    scores: &[f32],
    labels: &[String],
    apply_softmax: bool,
) -> Result<Vec<Classification>, InferenceError> {
    if scores.len() != labels.len() {
        return Err(InferenceError::LabelMismatch {
            scores: scores.len(),
            labels: labels.len(),
        });
    }

    let probabilities = if apply_softmax {
        softmax(scores)
    } else {
        scores.to_vec()
    };

    let mut candidates: Vec<Classification> = labels
        .iter()
        .zip(probabilities)
        .map(|(label, probability)| Classification::new(label.clone(), probability))
        .collect();
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    Ok(candidates)
}

#[derive(Clone)]
struct StageModel {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    labels: Arc<Vec<String>>,
}

impl StageModel {
    fn new(
        model_path: &Path,
        num_instances: usize,
        labels: Vec<String>,
    ) -> Result<Self, ModelLoadError> {
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(model_path)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!(
            "Created {} ONNX sessions for {:?} ({} labels)",
            num_instances,
            model_path,
            labels.len()
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
            labels: Arc::new(labels),
        })
    }

    fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, InferenceError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index].lock();

        tracing::debug!("Handling request with session {}", index);
        let tensor_ref = TensorRef::from_array_view(input.view())?;
        let outputs = session.run(ort::inputs![tensor_ref])?;

        let (_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        if data.is_empty() {
            return Err(InferenceError::Tensor("empty output tensor".to_string()));
        }

        Ok(data.to_vec())
    }
}

/// ONNX Runtime engine holding a gate model and a species model.
#[derive(Clone)]
pub struct OrtEngine {
    gate: StageModel,
    species: StageModel,
    input_size: u32,
    apply_softmax: bool,
}

impl OrtEngine {
    pub fn new(model_config: &ModelConfig, labels_config: &LabelsConfig) -> Result<Self, ModelLoadError> {
        model_config.validate().map_err(ModelLoadError::Config)?;
        labels_config.validate().map_err(ModelLoadError::Config)?;

        ort::init().with_name("pet_classifier").commit()?;

        let gate_labels = load_labels(&labels_config.get_gate_path())?;
        check_gate_labels(&gate_labels, &labels_config.pet_label)?;
        let species_labels = load_labels(&labels_config.get_species_path())?;
        check_species_labels(&species_labels)?;

        let gate = StageModel::new(
            &model_config.get_gate_path(),
            model_config.num_instances,
            gate_labels,
        )?;
        let species = StageModel::new(
            &model_config.get_species_path(),
            model_config.num_instances,
            species_labels,
        )?;

        Ok(Self {
            gate,
            species,
            input_size: model_config.input_size,
            apply_softmax: model_config.apply_softmax,
        })
    }

    fn stage(&self, stage: Stage) -> &StageModel {
        match stage {
            Stage::Gate => &self.gate,
            Stage::Species => &self.species,
        }
    }

    fn classify_blocking(&self, request: &InferenceRequest) -> InferenceOutcome {
        let input = transform_image(&request.image, self.input_size);
        let model = self.stage(request.stage);
        let scores = model.run_inference(&input)?;
        rank_scores(&scores, &model.labels, self.apply_softmax)
    }
}

impl InferenceEngine for OrtEngine {
    fn perform(
        &self,
        request: InferenceRequest,
        completion: Completion,
    ) -> Result<(), InferenceError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| InferenceError::NoRuntime)?;
        let engine = self.clone();

        runtime.spawn_blocking(move || {
            let outcome = engine.classify_blocking(&request);
            completion.complete(outcome);
        });

        Ok(())
    }
}

pub struct OrtModelLoader {
    model: ModelConfig,
    labels: LabelsConfig,
}

impl OrtModelLoader {
    pub fn new(model: ModelConfig, labels: LabelsConfig) -> Self {
        Self { model, labels }
    }
}

impl ModelLoader for OrtModelLoader {
    type Model = OrtEngine;

    fn load(&self) -> Result<OrtEngine, ModelLoadError> {
        OrtEngine::new(&self.model, &self.labels)
    }
}
