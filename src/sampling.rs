// Sampled dataset: N random rows of the original dataset

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Workspace, ORIGINAL_DATASET, PREPARE_STEP, SAMPLED_DATASET};
use crate::error::Result;
use crate::table::DataTable;

/// Deterministic RNG when seeded, OS entropy otherwise
pub fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SampleOptions {
    /// Drop sampled rows that have a missing cell
    pub drop_none: bool,
    /// Keep only integer and float columns
    pub drop_categorical: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        SampleOptions {
            drop_none: true,
            drop_categorical: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSummary {
    pub requested: usize,
    pub rows: usize,
    pub columns: Vec<String>,
}

impl SampleSummary {
    pub fn message(&self) -> String {
        format!("Sampled {} rows from the original dataset", self.requested)
    }
}

/// Sample `n` rows of the original dataset into the sampled dataset file.
///
/// Fails with `SampleTooLarge` when `n` exceeds the original row count.
pub fn create_dataset(ws: &Workspace, n: usize, options: SampleOptions) -> Result<SampleSummary> {
    let source = ws.artifact(ORIGINAL_DATASET, PREPARE_STEP)?;
    info!(path = %source.display(), "reading original dataset");
    let original = DataTable::read_csv(&source)?;

    let mut rng = seeded_rng(ws.seed());
    let mut sample = original.sample_rows(n, &mut rng)?;

    if options.drop_none {
        sample = sample.drop_missing_rows();
    }
    if options.drop_categorical {
        sample = sample.numeric_only();
    }

    let target = ws.path(SAMPLED_DATASET);
    sample.write_csv(&target)?;
    info!(
        rows = sample.nrows(),
        columns = sample.ncols(),
        path = %target.display(),
        "exported sampled dataset"
    );

    Ok(SampleSummary {
        requested: n,
        rows: sample.nrows(),
        columns: sample.headers(),
    })
}

/// The sampled dataset as written by `create_dataset`
pub fn load_sampled(ws: &Workspace) -> Result<DataTable> {
    let path = ws.artifact(SAMPLED_DATASET, "/api/data/sample/<n>")?;
    DataTable::read_csv(&path)
}
