use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TRACKING_URI: &str = "http://localhost:5000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub data_dir: PathBuf,
	pub models_dir: PathBuf,
	pub registry_path: PathBuf,
	pub tracking: TrackingConfig,
}

/// Connection settings for the MLflow tracking server, read from the same
/// `MLFLOW_*` variables the MLflow client libraries use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingConfig {
	pub uri: String,
	#[serde(skip_serializing)]
	pub token: Option<String>,
	pub username: Option<String>,
	#[serde(skip_serializing)]
	pub password: Option<String>,
}

impl TrackingConfig {
	pub fn from_env() -> crate::error::Result<Self> {
		let uri = non_empty_var("MLFLOW_TRACKING_URI").unwrap_or_else(|| DEFAULT_TRACKING_URI.to_string());

		if !(uri.starts_with("http://") || uri.starts_with("https://")) {
			return Err(crate::error::Error::ConfigError(format!(
				"Unsupported tracking URI '{}': only http(s) tracking servers are supported",
				uri
			)));
		}

		Ok(Self {
			uri,
			token: non_empty_var("MLFLOW_TRACKING_TOKEN"),
			username: non_empty_var("MLFLOW_TRACKING_USERNAME"),
			password: non_empty_var("MLFLOW_TRACKING_PASSWORD"),
		})
	}

	pub fn with_uri(uri: impl Into<String>) -> Self {
		Self {
			uri: uri.into(),
			..Self::default()
		}
	}
}

fn non_empty_var(key: &str) -> Option<String> {
	std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
	pub fn new() -> crate::error::Result<Self> {
		let project_dirs = ProjectDirs::from("", "", "runfetch")
			.ok_or_else(|| crate::error::Error::ConfigError("Could not determine data directory".to_string()))?;

		Self::with_data_dir(project_dirs.data_dir().to_path_buf(), TrackingConfig::from_env()?)
	}

	pub fn from_env() -> crate::error::Result<Self> {
		if let Some(data_dir) = non_empty_var("RUNFETCH_DATA_DIR") {
			Self::with_data_dir(PathBuf::from(data_dir), TrackingConfig::from_env()?)
		} else {
			Self::new()
		}
	}

	pub fn with_data_dir(data_dir: PathBuf, tracking: TrackingConfig) -> crate::error::Result<Self> {
		let models_dir = data_dir.join("models");
		let registry_path = data_dir.join("models.toml");

		std::fs::create_dir_all(&data_dir)?;
		std::fs::create_dir_all(&models_dir)?;

		Ok(Self {
			data_dir,
			models_dir,
			registry_path,
			tracking,
		})
	}
}
