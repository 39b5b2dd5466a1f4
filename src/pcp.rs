// Cluster-labelled data for the parallel coordinates plot

use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::{Workspace, CLUSTER_DATA, ORIGINAL_DATASET, PREPARE_STEP};
use crate::error::Result;
use crate::kmeans::KMeans;
use crate::sampling::seeded_rng;
use crate::table::{Column, DataTable};

pub const CLUSTER_COLUMN: &str = "cluster";

/// Features clustered on when none are given
pub const DEFAULT_FEATURES: [&str; 2] = ["Inches", "Ram"];
pub const DEFAULT_CLUSTERS: usize = 3;

/// Number of columns shown next to the cluster label
pub const SHOWN_COLUMNS: usize = 10;
const COLUMN_PICK_SEED: u64 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct ClusterDataSummary {
    pub features: Vec<String>,
    pub clusters: usize,
    pub rows: usize,
}

/// Cluster the original dataset on `features` and write it with a cluster column
pub fn create_cluster_data(
    ws: &Workspace,
    features: &[String],
    clusters: usize,
) -> Result<ClusterDataSummary> {
    let path = ws.artifact(ORIGINAL_DATASET, PREPARE_STEP)?;
    let mut table = DataTable::read_csv(&path)?;
    let data = table.select(features)?.numeric_matrix()?;

    info!(features = ?features, clusters, rows = data.nrows(), "clustering original dataset");
    let fit = KMeans::new(clusters).with_seed(ws.seed()).fit(&data)?;

    if table.has_column(CLUSTER_COLUMN) {
        table.drop_columns(&[CLUSTER_COLUMN])?;
    }
    table.push_column(Column::from_ints(
        CLUSTER_COLUMN,
        fit.labels.iter().map(|&l| l as i64),
    ))?;
    table.write_csv(&ws.path(CLUSTER_DATA))?;

    Ok(ClusterDataSummary {
        features: features.to_vec(),
        clusters,
        rows: table.nrows(),
    })
}

/// Records with `cluster` first and up to ten other columns picked at random
/// (fixed seed, so the selection is stable between requests). Text columns
/// are returned as category codes.
pub fn cluster_data(ws: &Workspace) -> Result<Value> {
    let path = ws.artifact(CLUSTER_DATA, "/api/clusters/create")?;
    let mut table = DataTable::read_csv(&path)?;
    table.encode_categorical();

    let mut candidates: Vec<String> = table
        .headers()
        .into_iter()
        .filter(|h| h != CLUSTER_COLUMN)
        .collect();
    let mut rng = seeded_rng(Some(COLUMN_PICK_SEED));
    candidates.shuffle(&mut rng);
    candidates.truncate(SHOWN_COLUMNS);

    let mut columns = vec![CLUSTER_COLUMN.to_string()];
    columns.extend(candidates);
    Ok(table.select(&columns)?.to_records())
}
