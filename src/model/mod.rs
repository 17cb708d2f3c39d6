pub mod client;
pub mod descriptor;
pub mod loader;
pub mod locator;
pub mod registry;

pub use client::TrackingClient;
pub use descriptor::{LoadedModel, LoggedModel, PredictCapability};
pub use loader::ModelLoader;
pub use locator::{ArtifactLocator, DEFAULT_ARTIFACT_PATH, DEFAULT_RUN_ID};
pub use registry::{ModelInfo, ModelRegistry};
