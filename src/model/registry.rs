use crate::config::Config;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub locator: String,
    pub run_id: String,
    pub artifact_path: String,
    pub run_name: Option<String>,
    pub model_path: PathBuf,
    pub flavors: Vec<String>,
    pub loaded_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelInfo>,
}

impl ModelRegistry {
    pub fn load(config: &Config) -> Result<Self> {
        if !config.registry_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config.registry_path)?;
        let registry: ModelRegistry = toml::from_str(&content)?;
        Ok(registry)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(&config.registry_path, content)?;
        Ok(())
    }

    pub fn add_model(&mut self, model: ModelInfo) {
        self.models.insert(model.locator.clone(), model);
    }

    pub fn get_model(&self, locator: &str) -> Option<&ModelInfo> {
        self.models.get(locator)
    }

    pub fn list_models(&self) -> Vec<&ModelInfo> {
        self.models.values().collect()
    }
}
