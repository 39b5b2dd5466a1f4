// Laptop Lab - Core Library
// Exposes the pipelines for use in the CLI, the API server, and tests

pub mod config;
pub mod error;
pub mod table;

// Numerics
pub mod stats;
pub mod eigen;
pub mod kneedle;
pub mod kmeans;
pub mod smacof;

// Pipelines (one per group of endpoints)
pub mod prepare;
pub mod explorer;
pub mod sampling;
pub mod pca;
pub mod clustering;
pub mod pcp;
pub mod mds;
pub mod correlation;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{LabConfig, Workspace};
pub use error::{LabError, Result};
pub use table::{Cell, Column, ColumnKind, DataTable};
pub use eigen::{symmetric_eigen, EigenDecomposition};
pub use kneedle::{Curve, Direction, KneeLocator};
pub use kmeans::{KMeans, KMeansFit};
pub use smacof::{Mds, MdsFit};
pub use prepare::{prepare_dataset, DatasetMetadata, PrepareSummary};
pub use explorer::VariableType;
pub use sampling::{SampleOptions, SampleSummary};
pub use pca::{Eigen, PcaSummary};
pub use clustering::{ClusterCenter, KmeansRecord, SweepSummary};
pub use pcp::ClusterDataSummary;

#[cfg(feature = "server")]
pub use api::{create_router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
