use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_RUN_ID: &str = "544c4173775c4af6954bb0b29416626f";
pub const DEFAULT_ARTIFACT_PATH: &str = "model";

const SCHEME: &str = "runs:/";

/// A `runs:/<run_id>/<artifact_path>` reference to an artifact logged under a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactLocator {
    run_id: String,
    artifact_path: String,
}

impl ArtifactLocator {
    pub fn new(run_id: &str, artifact_path: &str) -> Result<Self> {
        let run_id = run_id.trim();
        let artifact_path = artifact_path.trim().trim_matches('/');

        if run_id.is_empty() || run_id.contains(|c: char| c == '/' || c.is_whitespace()) {
            return Err(Error::InvalidLocator(format!("{}{}/{}", SCHEME, run_id, artifact_path)));
        }
        if artifact_path.is_empty()
            || artifact_path
                .split('/')
                .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(Error::InvalidLocator(format!("{}{}/{}", SCHEME, run_id, artifact_path)));
        }

        Ok(Self {
            run_id: run_id.to_string(),
            artifact_path: artifact_path.to_string(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn artifact_path(&self) -> &str {
        &self.artifact_path
    }
}

impl FromStr for ArtifactLocator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| Error::InvalidLocator(s.to_string()))?;
        let (run_id, artifact_path) = rest
            .trim_start_matches('/')
            .split_once('/')
            .ok_or_else(|| Error::InvalidLocator(s.to_string()))?;

        Self::new(run_id, artifact_path).map_err(|_| Error::InvalidLocator(s.to_string()))
    }
}

impl fmt::Display for ArtifactLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", SCHEME, self.run_id, self.artifact_path)
    }
}
