// Lab configuration: where the datasets and derived artifacts live

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LabError, Result};

// ============================================================================
// ARTIFACT FILE NAMES
// ============================================================================

/// Raw laptop price dataset (input of `prepare`, original dataset for sampling)
pub const ORIGINAL_DATASET: &str = "laptop_prices.csv";
/// Cleaned, sampled and category-encoded dataset written by `prepare`
pub const ENCODED_DATASET: &str = "500_laptop_prices.csv";
pub const METADATA: &str = "metadata.json";
pub const MAPPINGS: &str = "mappings.json";
pub const SAMPLED_DATASET: &str = "sampled_dataset.csv";
pub const PRINCIPAL_COMPONENTS: &str = "principal_components.csv";
pub const LOADINGS: &str = "loadings.csv";
pub const EIGENDECOMPOSITION: &str = "eigendecomposition.json";
pub const KMEANS_RESULTS: &str = "kmeans_results.csv";
pub const CLUSTER_DATA: &str = "cluster_data.csv";
pub const MDS_TRANSFORMED: &str = "mds_transformed.csv";
pub const VARS_MDS_TRANSFORMED: &str = "vars_mds_transformed.csv";
pub const CORRELATIONS: &str = "correlations.csv";

/// Default number of rows kept by `prepare`
pub const DEFAULT_PREPARED_ROWS: usize = 500;

/// How to produce the datasets every other step reads
pub const PREPARE_STEP: &str = "`laptop-lab prepare`";

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabConfig {
    /// Directory holding every CSV/JSON file the lab reads or writes
    pub data_dir: PathBuf,
    /// Directory served under /static
    pub static_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Seed for sampling and k-means; None draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            static_dir: PathBuf::from("./web"),
            host: "0.0.0.0".to_string(),
            port: 5000,
            seed: None,
        }
    }
}

impl LabConfig {
    /// Build a config from `LAB_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("LAB_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            static_dir: std::env::var("LAB_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            host: std::env::var("LAB_HOST").unwrap_or(defaults.host),
            port: std::env::var("LAB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            seed: std::env::var("LAB_SEED").ok().and_then(|s| s.parse().ok()),
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.data_dir, self.seed)
    }
}

// ============================================================================
// WORKSPACE
// ============================================================================

/// Resolved view of the data directory handed to every pipeline
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    seed: Option<u64>,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>, seed: Option<u64>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            seed,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Path of an artifact that an earlier step must have produced
    pub fn artifact(&self, file_name: &str, step: &'static str) -> Result<PathBuf> {
        let path = self.path(file_name);
        if path.exists() {
            Ok(path)
        } else {
            Err(LabError::ArtifactMissing { path, step })
        }
    }

    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LabConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_workspace_paths() {
        let ws = LabConfig::default().with_data_dir("/tmp/lab").with_seed(7).workspace();
        assert_eq!(ws.root(), Path::new("/tmp/lab"));
        assert_eq!(ws.path(LOADINGS), PathBuf::from("/tmp/lab/loadings.csv"));
        assert_eq!(ws.seed(), Some(7));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), None);

        let err = ws.artifact(LOADINGS, "pca").unwrap_err();
        assert!(matches!(err, LabError::ArtifactMissing { step: "pca", .. }));

        std::fs::write(ws.path(LOADINGS), "PC1,feature\n").unwrap();
        assert!(ws.artifact(LOADINGS, "pca").is_ok());
    }
}
