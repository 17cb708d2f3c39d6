use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Download failed: {0}")]
	DownloadFailed(String),

	#[error("Request to '{url}' returned HTTP {status}")]
	HttpStatus { url: String, status: u16 },

	#[error("Malformed data: {0}")]
	MalformedData(String),

	#[error("Invalid input: {0}")]
	InvalidInput(String),

	#[error("Invalid artifact locator '{0}' (expected runs:/<run_id>/<path>)")]
	InvalidLocator(String),

	#[error("Run not found: {0}")]
	RunNotFound(String),

	#[error("Artifact not found: {0}")]
	ArtifactNotFound(String),

	#[error("Unsupported model format: {0}")]
	FormatMismatch(String),

	#[error("Tracking server error: {0}")]
	TrackingError(String),

	#[error("Configuration error: {0}")]
	ConfigError(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<toml::ser::Error> for Error {
	fn from(err: toml::ser::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<csv::Error> for Error {
	fn from(err: csv::Error) -> Self {
		match err.kind() {
			csv::ErrorKind::Io(_) => Error::Io(std::io::Error::other(err.to_string())),
			_ => Error::MalformedData(err.to_string()),
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
