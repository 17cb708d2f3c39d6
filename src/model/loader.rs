use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::client::{FileInfo, TrackingClient};
use crate::model::descriptor::{LoadedModel, LoggedModel, MLMODEL_FILE};
use crate::model::{ArtifactLocator, ModelInfo, ModelRegistry};
use std::path::{Component, Path, PathBuf};

pub struct ModelLoader {
    config: Config,
    registry: ModelRegistry,
    tracking: TrackingClient,
}

impl ModelLoader {
    pub fn new(config: Config) -> Result<Self> {
        let tracking = TrackingClient::new(config.tracking.clone())?;
        Self::with_tracking(config, tracking)
    }

    pub fn with_tracking(config: Config, tracking: TrackingClient) -> Result<Self> {
        let registry = ModelRegistry::load(&config)?;
        Ok(Self {
            config,
            registry,
            tracking,
        })
    }

    pub async fn load(&mut self, locator: &ArtifactLocator) -> Result<LoadedModel> {
        tracing::info!("Loading model {} from {}", locator, self.tracking.uri());

        let run = self.tracking.get_run(locator.run_id()).await?;
        if run.info.lifecycle_stage.as_deref() == Some("deleted") {
            tracing::warn!("Run {} is marked as deleted", locator.run_id());
        }

        let files = self
            .tracking
            .list_artifacts_recursive(locator.run_id(), locator.artifact_path())
            .await?;
        if files.is_empty() {
            return Err(Error::ArtifactNotFound(locator.to_string()));
        }

        let mlmodel_path = format!("{}/{}", locator.artifact_path(), MLMODEL_FILE);
        if !files.iter().any(|f| f.path == mlmodel_path) {
            return Err(Error::ArtifactNotFound(format!(
                "{} has no {} file",
                locator, MLMODEL_FILE
            )));
        }

        let mlmodel = self
            .tracking
            .download_artifact(locator.run_id(), &mlmodel_path)
            .await?;
        let text = std::str::from_utf8(&mlmodel)
            .map_err(|e| Error::Serialization(format!("{} is not UTF-8: {}", mlmodel_path, e)))?;
        let mut logged = LoggedModel::from_mlmodel(text)?;

        match run.logged_model(locator.artifact_path()) {
            Ok(Some(recorded)) => {
                if !logged.merge_history(&recorded) {
                    tracing::warn!(
                        "{} lists flavors {:?} but the run recorded {:?}; using {}",
                        mlmodel_path,
                        logged.flavor_names(),
                        recorded.flavor_names(),
                        MLMODEL_FILE
                    );
                }
            }
            Ok(None) => tracing::debug!("No logged-model record for {} on run", locator),
            Err(e) => tracing::warn!("Ignoring run's logged-model record: {}", e),
        }
        if logged.artifact_path.is_empty() {
            logged.artifact_path = locator.artifact_path().to_string();
        }
        logged.check_formats()?;

        let local_dir = self
            .config
            .models_dir
            .join(locator.run_id())
            .join(locator.artifact_path());
        let downloaded = self
            .download_all(locator, &files, (mlmodel_path.as_str(), mlmodel.as_slice()), &local_dir)
            .await?;

        let model = LoadedModel {
            locator: locator.clone(),
            run: run.info,
            logged,
            local_dir,
            files: downloaded,
        };

        self.registry.add_model(ModelInfo {
            locator: locator.to_string(),
            run_id: locator.run_id().to_string(),
            artifact_path: locator.artifact_path().to_string(),
            run_name: model.run.run_name.clone(),
            model_path: model.local_dir.clone(),
            flavors: model.logged.flavor_names(),
            loaded_at: chrono::Utc::now().to_rfc3339(),
        });
        self.registry.save(&self.config)?;

        tracing::info!("Model {} loaded into {:?}", locator, model.local_dir);

        Ok(model)
    }

    /// Downloads every file into a staging directory next to `local_dir`
    /// and swaps it in once all downloads succeeded. `fetched` is a file
    /// already downloaded, reused instead of requested again.
    async fn download_all(
        &self,
        locator: &ArtifactLocator,
        files: &[FileInfo],
        fetched: (&str, &[u8]),
        local_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let staging = sibling_dir(local_dir, "part");
        if staging.exists() {
            tokio::fs::remove_dir_all(&staging).await?;
        }
        tokio::fs::create_dir_all(&staging).await?;

        let result = self.download_into(locator, files, fetched, &staging).await;
        let relative = match result {
            Ok(relative) => relative,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&staging).await;
                return Err(e);
            }
        };

        swap_dir(&staging, local_dir).await?;
        Ok(relative)
    }

    async fn download_into(
        &self,
        locator: &ArtifactLocator,
        files: &[FileInfo],
        fetched: (&str, &[u8]),
        dest: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut relative = Vec::with_capacity(files.len());

        for file in files {
            let rel = relative_artifact_path(locator.artifact_path(), &file.path)?;
            let target = dest.join(&rel);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let bytes = if file.path == fetched.0 {
                fetched.1.to_vec()
            } else {
                tracing::info!("Downloading {}", file.path);
                self.tracking
                    .download_artifact(locator.run_id(), &file.path)
                    .await?
            };

            if let Some(expected) = file.file_size {
                if expected != bytes.len() as u64 {
                    tracing::warn!(
                        "{}: listed as {} bytes, received {}",
                        file.path,
                        expected,
                        bytes.len()
                    );
                }
            }

            tokio::fs::write(&target, &bytes).await?;
            tracing::debug!("Wrote {:?}", target);
            relative.push(rel);
        }

        Ok(relative)
    }
}

/// Moves `staging` into place at `target`. An existing `target` is set aside
/// first and put back if the move fails; `staging` never outlives the call.
async fn swap_dir(staging: &Path, target: &Path) -> Result<()> {
    let backup = sibling_dir(target, "old");
    if backup.exists() {
        tokio::fs::remove_dir_all(&backup).await?;
    }

    let had_previous = target.exists();
    if had_previous {
        if let Err(e) = tokio::fs::rename(target, &backup).await {
            let _ = tokio::fs::remove_dir_all(staging).await;
            return Err(e.into());
        }
    }

    if let Err(e) = tokio::fs::rename(staging, target).await {
        let _ = tokio::fs::remove_dir_all(staging).await;
        if had_previous {
            if let Err(restore) = tokio::fs::rename(&backup, target).await {
                tracing::warn!("Could not restore {:?} from {:?}: {}", target, backup, restore);
            }
        }
        return Err(e.into());
    }

    if had_previous {
        if let Err(e) = tokio::fs::remove_dir_all(&backup).await {
            tracing::warn!("Could not remove {:?}: {}", backup, e);
        }
    }
    Ok(())
}

fn sibling_dir(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    dir.with_file_name(name)
}

/// Maps an artifact path reported by the tracking store to a path relative to
/// the model directory, refusing anything that would escape it.
fn relative_artifact_path(prefix: &str, artifact: &str) -> Result<PathBuf> {
    let rel = artifact
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| {
            Error::TrackingError(format!("artifact '{}' is outside of '{}'", artifact, prefix))
        })?;

    let path = PathBuf::from(rel);
    let escapes = rel.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(Error::TrackingError(format!("refusing artifact path '{}'", artifact)));
    }

    Ok(path)
}
