use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageInputError {
    #[error("Error decoding image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Error reading image: {0}")]
    Read(#[from] std::io::Error),
    #[error("Image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("No tokio runtime available to run inference")]
    NoRuntime,
    #[error("Inference failed: {0}")]
    Session(#[from] ort::Error),
    #[error("Invalid output tensor: {0}")]
    Tensor(String),
    #[error("Model returned {scores} scores for {labels} labels")]
    LabelMismatch { scores: usize, labels: usize },
    #[error("Inference engine error: {0}")]
    Engine(String),
    #[error("Inference completion dropped without a result")]
    Abandoned,
}

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to build ONNX session: {0}")]
    Session(#[from] ort::Error),
    #[error("Failed to read labels: {0}")]
    Labels(#[from] std::io::Error),
    #[error("Gate labels do not contain the pet label `{0}`")]
    MissingPetLabel(String),
    #[error("Species labels contain unknown species `{0}`")]
    UnknownSpecies(String),
    #[error("Model loader task failed: {0}")]
    Join(String),
    #[error("{0}")]
    Other(String),
}
