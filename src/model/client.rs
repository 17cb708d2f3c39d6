//! Minimal client for the MLflow tracking server REST API.
//!
//! Only the read-only endpoints needed to resolve a run and fetch the files
//! logged under it are covered.

use crate::config::TrackingConfig;
use crate::error::{Error, Result};
use crate::http;
use crate::model::descriptor::{LoggedModel, LOG_MODEL_HISTORY_TAG};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub info: RunInfo,
    #[serde(default)]
    pub data: RunData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunInfo {
    #[serde(default)]
    pub run_id: String,
    /// Older servers only send the deprecated `run_uuid` field.
    #[serde(default)]
    pub run_uuid: Option<String>,
    #[serde(default)]
    pub run_name: Option<String>,
    #[serde(default)]
    pub experiment_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub artifact_uri: Option<String>,
    #[serde(default)]
    pub lifecycle_stage: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunData {
    #[serde(default)]
    pub tags: Vec<RunTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunTag {
    pub key: String,
    pub value: String,
}

impl Run {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.data
            .tags
            .iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.value.as_str())
    }

    /// Models recorded by the tracking store when they were logged to this run.
    pub fn logged_models(&self) -> Result<Vec<LoggedModel>> {
        match self.tag(LOG_MODEL_HISTORY_TAG) {
            Some(history) => serde_json::from_str(history).map_err(|e| {
                Error::Serialization(format!("Invalid {} tag: {}", LOG_MODEL_HISTORY_TAG, e))
            }),
            None => Ok(Vec::new()),
        }
    }

    pub fn logged_model(&self, artifact_path: &str) -> Result<Option<LoggedModel>> {
        Ok(self
            .logged_models()?
            .into_iter()
            .rev()
            .find(|m| m.artifact_path.trim_matches('/') == artifact_path))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileInfo {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default, deserialize_with = "de_file_size")]
    pub file_size: Option<u64>,
}

// The REST gateway encodes int64 fields as JSON strings.
fn de_file_size<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(u64),
        Text(String),
    }

    match Option::<Size>::deserialize(deserializer)? {
        Some(Size::Number(n)) => Ok(Some(n)),
        Some(Size::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
struct GetRunResponse {
    run: Run,
}

#[derive(Deserialize)]
struct ListArtifactsResponse {
    #[serde(default)]
    files: Vec<FileInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct TrackingClient {
    client: Client,
    base: Url,
    config: TrackingConfig,
}

impl TrackingClient {
    pub fn new(config: TrackingConfig) -> Result<Self> {
        Self::with_client(http::build_client()?, config)
    }

    pub fn with_client(client: Client, config: TrackingConfig) -> Result<Self> {
        let mut base = Url::parse(&config.uri)
            .map_err(|e| Error::ConfigError(format!("Invalid tracking URI '{}': {}", config.uri, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { client, base, config })
    }

    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| Error::ConfigError(format!("Invalid endpoint '{}': {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(&self, url: Url) -> RequestBuilder {
        let builder = self.client.get(url);
        if let Some(token) = &self.config.token {
            builder.bearer_auth(token)
        } else if let Some(username) = &self.config.username {
            builder.basic_auth(username, self.config.password.as_deref())
        } else {
            builder
        }
    }

    async fn send(&self, url: Url) -> Result<reqwest::Response> {
        tracing::debug!("GET {}", url);
        self.request(url)
            .send()
            .await
            .map_err(|e| Error::TrackingError(http::describe(&e)))
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Run> {
        let url = self.endpoint("api/2.0/mlflow/runs/get", &[("run_id", run_id)])?;
        let response = self.send(url).await?;

        if !response.status().is_success() {
            let status = response.status();
            let api_error = response.json::<ApiError>().await.unwrap_or_default();
            let not_found = status == StatusCode::NOT_FOUND
                || api_error.error_code.as_deref() == Some("RESOURCE_DOES_NOT_EXIST");
            if not_found {
                return Err(Error::RunNotFound(run_id.to_string()));
            }
            return Err(Error::TrackingError(format!(
                "runs/get for '{}' returned HTTP {}: {}",
                run_id,
                status.as_u16(),
                api_error.message.unwrap_or_default()
            )));
        }

        let mut run = response
            .json::<GetRunResponse>()
            .await
            .map_err(|e| Error::TrackingError(format!("Invalid runs/get response: {}", http::describe(&e))))?
            .run;
        if run.info.run_id.is_empty() {
            run.info.run_id = run.info.run_uuid.clone().unwrap_or_else(|| run_id.to_string());
        }
        Ok(run)
    }

    /// Lists the direct children of `path` in the run's artifact store.
    pub async fn list_artifacts(&self, run_id: &str, path: &str) -> Result<Vec<FileInfo>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("run_id", run_id), ("path", path)];
            if let Some(token) = page_token.as_deref() {
                query.push(("page_token", token));
            }
            let url = self.endpoint("api/2.0/mlflow/artifacts/list", &query)?;
            let response = self.send(url).await?;

            if !response.status().is_success() {
                let status = response.status();
                let api_error = response.json::<ApiError>().await.unwrap_or_default();
                return Err(Error::TrackingError(format!(
                    "artifacts/list for '{}/{}' returned HTTP {}: {}",
                    run_id,
                    path,
                    status.as_u16(),
                    api_error.message.unwrap_or_default()
                )));
            }

            let body: ListArtifactsResponse = response.json().await.map_err(|e| {
                Error::TrackingError(format!("Invalid artifacts/list response: {}", http::describe(&e)))
            })?;
            files.extend(body.files);

            match body.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    /// Walks the artifact tree under `path` and returns every file in it.
    pub async fn list_artifacts_recursive(&self, run_id: &str, path: &str) -> Result<Vec<FileInfo>> {
        let mut pending = vec![path.to_string()];
        let mut files = Vec::new();

        while let Some(dir) = pending.pop() {
            for entry in self.list_artifacts(run_id, &dir).await? {
                if entry.is_dir {
                    pending.push(entry.path);
                } else {
                    files.push(entry);
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    pub async fn download_artifact(&self, run_id: &str, path: &str) -> Result<Vec<u8>> {
        let url = self.endpoint("get-artifact", &[("path", path), ("run_uuid", run_id)])?;
        let response = self.send(url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ArtifactNotFound(format!("runs:/{}/{}", run_id, path)));
        }
        let response = http::ensure_success(path, response)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::TrackingError(http::describe(&e)))?;
        Ok(bytes.to_vec())
    }
}
