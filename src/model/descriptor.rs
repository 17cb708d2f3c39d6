use crate::error::{Error, Result};
use crate::model::client::RunInfo;
use crate::model::ArtifactLocator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Run tag under which the tracking store records every model logged to the run.
pub const LOG_MODEL_HISTORY_TAG: &str = "mlflow.log-model.history";

/// Name of the descriptor file every logged model directory carries.
pub const MLMODEL_FILE: &str = "MLmodel";

pub const PYFUNC_FLAVOR: &str = "python_function";

/// Serialization formats each flavor can be written with. Flavors not listed
/// here are accepted without a check.
const SUPPORTED_FORMATS: &[(&str, &[&str])] = &[("sklearn", &["pickle", "cloudpickle"])];

/// The description of a logged model, as written to its `MLmodel` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedModel {
    #[serde(default, deserialize_with = "de_scalar")]
    pub run_id: Option<String>,
    /// Absent when the directory was written by `save_model` and uploaded as
    /// plain artifacts.
    #[serde(default)]
    pub artifact_path: String,
    #[serde(default, deserialize_with = "de_scalar")]
    pub utc_time_created: Option<String>,
    #[serde(default, deserialize_with = "de_scalar")]
    pub model_uuid: Option<String>,
    #[serde(default, deserialize_with = "de_scalar")]
    pub mlflow_version: Option<String>,
    #[serde(default)]
    pub flavors: BTreeMap<String, Value>,
    #[serde(default)]
    pub signature: Option<Signature>,
}

// YAML resolves unquoted values such as `2.1` or `1e10` to numbers.
fn de_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("expected a scalar, found {}", other))),
    }
}

/// Input/output schema as logged; each side is a JSON-encoded column spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub inputs: Option<String>,
    #[serde(default)]
    pub outputs: Option<String>,
}

/// What the `python_function` flavor says about invoking the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictCapability {
    pub loader_module: String,
    pub python_version: Option<String>,
    pub predict_fn: String,
}

impl LoggedModel {
    /// Decodes the YAML document stored as `MLmodel` in a model directory.
    pub fn from_mlmodel(text: &str) -> Result<Self> {
        let model: LoggedModel = serde_yaml::from_str(text)
            .map_err(|e| Error::Serialization(format!("Invalid {} file: {}", MLMODEL_FILE, e)))?;
        Ok(model)
    }

    /// Fills fields the `MLmodel` file left out from the entry the tracking
    /// store recorded for the same model. The file's flavors always win; the
    /// return value is false when the two disagree on them.
    pub fn merge_history(&mut self, recorded: &LoggedModel) -> bool {
        if self.run_id.is_none() {
            self.run_id = recorded.run_id.clone();
        }
        if self.artifact_path.is_empty() {
            self.artifact_path = recorded.artifact_path.clone();
        }
        if self.utc_time_created.is_none() {
            self.utc_time_created = recorded.utc_time_created.clone();
        }
        if self.model_uuid.is_none() {
            self.model_uuid = recorded.model_uuid.clone();
        }
        if self.mlflow_version.is_none() {
            self.mlflow_version = recorded.mlflow_version.clone();
        }
        if self.signature.is_none() {
            self.signature = recorded.signature.clone();
        }

        recorded.flavors.is_empty() || self.flavor_names() == recorded.flavor_names()
    }

    pub fn flavor_names(&self) -> Vec<String> {
        self.flavors.keys().cloned().collect()
    }

    pub fn predict_capability(&self) -> Option<PredictCapability> {
        let pyfunc = self.flavors.get(PYFUNC_FLAVOR)?;
        let loader_module = pyfunc.get("loader_module")?.as_str()?.to_string();

        Some(PredictCapability {
            loader_module,
            python_version: pyfunc
                .get("python_version")
                .and_then(Value::as_str)
                .map(str::to_string),
            predict_fn: pyfunc
                .get("predict_fn")
                .and_then(Value::as_str)
                .unwrap_or("predict")
                .to_string(),
        })
    }

    /// Rejects models written in a serialization format this tool does not
    /// know how to read.
    pub fn check_formats(&self) -> Result<()> {
        if self.flavors.is_empty() {
            return Err(Error::FormatMismatch(format!(
                "model '{}' declares no flavors",
                self.artifact_path
            )));
        }

        for (flavor, formats) in SUPPORTED_FORMATS {
            let Some(conf) = self.flavors.get(*flavor) else {
                continue;
            };
            if let Some(format) = conf.get("serialization_format").and_then(Value::as_str) {
                if !formats.contains(&format) {
                    return Err(Error::FormatMismatch(format!(
                        "{} flavor uses serialization format '{}', expected one of {:?}",
                        flavor, format, formats
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A logged model resolved against the tracking store with its files on
/// local disk.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub locator: ArtifactLocator,
    pub run: RunInfo,
    pub logged: LoggedModel,
    pub local_dir: PathBuf,
    /// Downloaded files, relative to `local_dir`.
    pub files: Vec<PathBuf>,
}

impl LoadedModel {
    pub fn predict_capability(&self) -> Option<PredictCapability> {
        self.logged.predict_capability()
    }

    pub fn mlmodel_path(&self) -> PathBuf {
        self.local_dir.join(MLMODEL_FILE)
    }
}
