// PCA over the sampled dataset
//
// `create` fits once and persists three artifacts; every query endpoint reads
// them back instead of refitting:
//   principal_components.csv  PC1..PCk, id
//   loadings.csv              PC1..PCk, feature   (one row per input feature)
//   eigendecomposition.json   eigenvalues + eigenvectors (one row per component)

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::{Workspace, EIGENDECOMPOSITION, LOADINGS, PRINCIPAL_COMPONENTS};
use crate::eigen::symmetric_eigen;
use crate::error::{LabError, Result};
use crate::kneedle::KneeLocator;
use crate::sampling::load_sampled;
use crate::stats::{center, covariance_of_centered, standardize};
use crate::table::{Column, DataTable};

const CREATE_STEP: &str = "/api/pca/create";

/// Components returned when the caller names none
pub const DEFAULT_COMPONENTS: &str = "PC1,PC2";

/// Cap on the dimensionality index used to rank attributes
pub const MAX_DIMENSIONALITY_INDEX: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eigen {
    pub eigenvalues: Vec<f64>,
    /// Row i is the eigenvector of eigenvalue i
    pub eigenvectors: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PcaSummary {
    pub samples: usize,
    pub features: usize,
    pub components: usize,
    pub standardized: bool,
    pub explained_variance_ratio: Vec<f64>,
}

pub fn component_name(index: usize) -> String {
    format!("PC{}", index + 1)
}

/// Split a `PC1,PC2` style list, ignoring blanks
pub fn parse_components(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fit PCA on the sampled dataset and persist scores, loadings and the eigendecomposition
pub fn create(ws: &Workspace, standardize_data: bool) -> Result<PcaSummary> {
    let sampled = load_sampled(ws)?;
    let data = sampled.numeric_matrix()?;
    let (n_samples, n_features) = data.dim();
    if n_samples < 2 || n_features == 0 {
        return Err(LabError::InvalidInput(format!(
            "PCA needs at least 2 samples and 1 feature, got {}x{}",
            n_samples, n_features
        )));
    }

    info!(n_samples, n_features, standardize = standardize_data, "fitting PCA");
    let scaled = if standardize_data { standardize(&data) } else { data };
    let centered = center(&scaled);
    let decomp = symmetric_eigen(&covariance_of_centered(&centered))?;

    let k = n_samples.min(n_features);
    let components: Array2<f64> = decomp.eigenvectors.slice(s![.., ..k]).to_owned();
    let eigenvalues: Vec<f64> = decomp.eigenvalues.iter().take(k).map(|v| v.max(0.0)).collect();
    let scores = centered.dot(&components);

    let names: Vec<String> = (0..k).map(component_name).collect();

    let mut pc_table = DataTable::from_matrix(&names, &scores)?;
    pc_table.push_column(Column::from_ints("id", 0..n_samples as i64))?;
    pc_table.write_csv(&ws.path(PRINCIPAL_COMPONENTS))?;

    let mut loadings = DataTable::from_matrix(&names, &components)?;
    loadings.push_column(Column::from_strings("feature", sampled.headers()))?;
    loadings.write_csv(&ws.path(LOADINGS))?;

    let eigen = Eigen {
        eigenvalues: eigenvalues.clone(),
        eigenvectors: components.columns().into_iter().map(|c| c.to_vec()).collect(),
    };
    std::fs::write(ws.path(EIGENDECOMPOSITION), serde_json::to_string(&eigen)?)?;
    info!(components = k, "eigendecomposition completed");

    let total: f64 = decomp.eigenvalues.iter().map(|v| v.max(0.0)).sum();
    let explained_variance_ratio = eigenvalues
        .iter()
        .map(|v| if total > 0.0 { v / total } else { 0.0 })
        .collect();

    Ok(PcaSummary {
        samples: n_samples,
        features: n_features,
        components: k,
        standardized: standardize_data,
        explained_variance_ratio,
    })
}

fn load_table(ws: &Workspace, file_name: &str) -> Result<DataTable> {
    DataTable::read_csv(&ws.artifact(file_name, CREATE_STEP)?)
}

/// Rows of `[id, PCa, PCb, ...]`
pub fn principal_components(ws: &Workspace, components: &[String]) -> Result<Value> {
    let mut columns = vec!["id".to_string()];
    columns.extend_from_slice(components);
    Ok(load_table(ws, PRINCIPAL_COMPONENTS)?.select(&columns)?.to_rows())
}

/// Rows of `[PCa, PCb, ...]` with no id column
pub fn component_scores(ws: &Workspace, components: &[String]) -> Result<Value> {
    Ok(load_table(ws, PRINCIPAL_COMPONENTS)?.select(components)?.to_rows())
}

/// Rows of `[feature, PCa, PCb, ...]`
pub fn loadings(ws: &Workspace, components: &[String]) -> Result<Value> {
    let mut columns = vec!["feature".to_string()];
    columns.extend_from_slice(components);
    Ok(load_table(ws, LOADINGS)?.select(&columns)?.to_rows())
}

pub fn eigen(ws: &Workspace) -> Result<Eigen> {
    let text = std::fs::read_to_string(ws.artifact(EIGENDECOMPOSITION, CREATE_STEP)?)?;
    Ok(serde_json::from_str(&text)?)
}

/// Index of the scree-plot elbow
pub fn elbow_index(ws: &Workspace) -> Result<usize> {
    let eigenvalues = eigen(ws)?.eigenvalues;
    let x: Vec<f64> = (0..eigenvalues.len()).map(|i| i as f64).collect();
    KneeLocator::elbow()
        .find_index(&x, &eigenvalues)
        .ok_or(LabError::NoElbow)
}

/// Features ranked by the sum of squared loadings over PC1..PCd, strongest first.
///
/// `d` is capped at `MAX_DIMENSIONALITY_INDEX` and at the number of components.
pub fn rank_attributes(loadings: &DataTable, d: usize) -> Result<Vec<(String, f64)>> {
    let available = loadings.headers().iter().filter(|h| h.starts_with("PC")).count();
    let d = d.min(MAX_DIMENSIONALITY_INDEX).min(available);

    let features = loadings.column("feature")?;
    let pcs = (0..d)
        .map(|i| loadings.column(&component_name(i)).map(Column::floats))
        .collect::<Result<Vec<_>>>()?;

    let mut ranked: Vec<(String, f64)> = features
        .cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let name = match cell.to_json() {
                Value::String(s) => s,
                other => other.to_string(),
            };
            let squared_sum = pcs
                .iter()
                .map(|pc| pc[row].unwrap_or(0.0).powi(2))
                .sum::<f64>();
            (name, squared_sum)
        })
        .collect();

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(d);
    Ok(ranked)
}

/// Top `d` attributes as `[feature, squared_sum]` pairs.
///
/// The squared loadings are summed over PC1..PCd only, so the ranking
/// follows the chosen dimensionality rather than every component.
pub fn attributes(ws: &Workspace, d: usize) -> Result<Vec<(String, f64)>> {
    rank_attributes(&load_table(ws, LOADINGS)?, d)
}

pub fn top_attributes(ws: &Workspace, d: usize) -> Result<Vec<String>> {
    Ok(attributes(ws, d)?.into_iter().map(|(name, _)| name).collect())
}

/// Sampled rows restricted to the top `d` attributes
pub fn attributes_data(ws: &Workspace, d: usize) -> Result<Value> {
    let top = top_attributes(ws, d)?;
    Ok(load_sampled(ws)?.select(&top)?.to_rows())
}
