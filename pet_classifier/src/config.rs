use serde::Deserialize;
use std::path::{Path, PathBuf};

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub log_level: LogLevel,
    pub model: ModelConfig,
    pub labels: LabelsConfig,
}

impl Validatable for Config {
    fn validate(&self) -> Result<(), String> {
        self.model.validate()?;
        self.labels.validate()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    pub gate_file: String,
    pub species_file: String,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default = "default_apply_softmax")]
    pub apply_softmax: bool,
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

fn default_input_size() -> u32 {
    224
}

fn default_apply_softmax() -> bool {
    true
}

impl ModelConfig {
    pub fn get_gate_path(&self) -> PathBuf {
        self.model_dir.join(&self.gate_file)
    }

    pub fn get_species_path(&self) -> PathBuf {
        self.model_dir.join(&self.species_file)
    }
}

impl Validatable for ModelConfig {
    fn validate(&self) -> Result<(), String> {
        if self.num_instances == 0 {
            return Err("num_instances must be at least 1".to_string());
        }
        if self.input_size == 0 {
            return Err("input_size must be greater than 0".to_string());
        }
        check_file(&self.get_gate_path(), "Gate model")?;
        check_file(&self.get_species_path(), "Species model")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelsConfig {
    pub labels_dir: PathBuf,
    pub gate_labels_file: String,
    pub species_labels_file: String,
    #[serde(default = "default_pet_label")]
    pub pet_label: String,
}

pub(crate) fn default_pet_label() -> String {
    "pets".to_string()
}

impl LabelsConfig {
    pub fn get_gate_path(&self) -> PathBuf {
        self.labels_dir.join(&self.gate_labels_file)
    }

    pub fn get_species_path(&self) -> PathBuf {
        self.labels_dir.join(&self.species_labels_file)
    }
}

impl Validatable for LabelsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.pet_label.trim().is_empty() {
            return Err("pet_label must not be empty".to_string());
        }
        check_file(&self.get_gate_path(), "Gate labels")?;
        check_file(&self.get_species_path(), "Species labels")
    }
}

fn check_file(path: &Path, what: &str) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("{} file not found: {:?}", what, path));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

/// Loads `configuration/base.yaml`, the `APP_ENVIRONMENT` overlay and `APP_*`
/// environment overrides from the current directory, then validates the result.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {}", e)))?;
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    get_configuration_from(&base_path.join("configuration"), &environment)
}

pub fn get_configuration_from(
    configuration_directory: &Path,
    environment: &Environment,
) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Config>()?;
    tracing::debug!("{:?}", settings);
    if let Err(e) = settings.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(config::ConfigError::Message(e));
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
log_level: debug
model:
  model_dir: ./models
  gate_file: gate.onnx
  species_file: species.onnx
  num_instances: 2
labels:
  labels_dir: ./labels
  gate_labels_file: gate.txt
  species_labels_file: species.txt
"#;

    fn parse(yaml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<Config>()
            .unwrap()
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config = parse(BASE);

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.model.num_instances, 2);
        assert_eq!(config.model.input_size, 224);
        assert!(config.model.apply_softmax);
        assert_eq!(config.labels.pet_label, "pets");
        assert_eq!(
            config.model.get_gate_path(),
            PathBuf::from("./models/gate.onnx")
        );
        assert_eq!(
            config.labels.get_species_path(),
            PathBuf::from("./labels/species.txt")
        );
    }

    #[test]
    fn test_validate_reports_missing_model() {
        let config = parse(BASE);
        let err = config.validate().unwrap_err();
        assert!(err.contains("Gate model file not found"));
    }

    #[test]
    fn test_validate_rejects_zero_input_size() {
        let mut config = parse(BASE);
        config.model.input_size = 0;
        assert_eq!(
            config.model.validate().unwrap_err(),
            "input_size must be greater than 0"
        );
    }

    #[test]
    fn test_validate_rejects_zero_instances() {
        let mut config = parse(BASE);
        config.model.num_instances = 0;
        assert_eq!(
            config.model.validate().unwrap_err(),
            "num_instances must be at least 1"
        );
    }

    #[test]
    fn test_bundled_configuration_requires_models() {
        let directory = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configuration");
        let err = get_configuration_from(&directory, &Environment::Local).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_unsupported_log_level_is_rejected() {
        let yaml = BASE.replace("log_level: debug", "log_level: trace");
        let result = config::Config::builder()
            .add_source(config::File::from_str(&yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<Config>();

        assert!(result.is_err());
        assert_eq!(parse(&BASE.replace("debug", "info")).log_level, LogLevel::Info);
    }

    #[test]
    fn test_environment_from_string() {
        let env = Environment::try_from("Production".to_string()).unwrap();
        assert_eq!(env.as_str(), "production");
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
