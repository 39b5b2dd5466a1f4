// MDS views of the sampled dataset: one point per sample, one per variable

use serde_json::Value;
use tracing::info;

use crate::config::{Workspace, CORRELATIONS, MDS_TRANSFORMED, VARS_MDS_TRANSFORMED};
use crate::correlation::abs_correlations;
use crate::error::Result;
use crate::kmeans::KMeans;
use crate::sampling::load_sampled;
use crate::smacof::Mds;
use crate::stats::standardize;
use crate::table::{Column, DataTable};

/// Seed for both MDS runs so the layout is stable between calls
pub const MDS_SEED: u64 = 42;

/// Clusters drawn over the sample embedding
pub const MDS_CLUSTERS: usize = 3;

/// Embed the standardized samples in 2D and cluster the embedding
pub fn create_data_mds(ws: &Workspace) -> Result<usize> {
    let data = standardize(&load_sampled(ws)?.numeric_only().numeric_matrix()?);
    info!(samples = data.nrows(), features = data.ncols(), "running MDS on samples");

    let fit = Mds::new(2).with_seed(MDS_SEED).fit_euclidean(&data)?;
    info!(stress = fit.stress, iterations = fit.n_iter, "MDS converged");

    let clusters = KMeans::new(MDS_CLUSTERS.min(fit.embedding.nrows()))
        .with_seed(ws.seed())
        .fit(&fit.embedding)?;

    let mut table = DataTable::from_matrix(&["x", "y"], &fit.embedding)?;
    table.push_column(Column::from_ints(
        "cluster",
        clusters.labels.iter().map(|&l| l as i64),
    ))?;
    table.write_csv(&ws.path(MDS_TRANSFORMED))?;

    Ok(table.nrows())
}

pub fn data_mds(ws: &Workspace) -> Result<Value> {
    let path = ws.artifact(MDS_TRANSFORMED, "/api/mds/data/create")?;
    Ok(DataTable::read_csv(&path)?.to_records())
}

/// Embed the variables using `1 - |corr|` as their dissimilarity.
///
/// Also refreshes the correlation matrix used to order the PCP axes.
pub fn create_variables_mds(ws: &Workspace) -> Result<usize> {
    let sampled = load_sampled(ws)?.numeric_only();
    let scaled = DataTable::from_matrix(&sampled.headers(), &standardize(&sampled.numeric_matrix()?))?;
    let correlations = abs_correlations(&scaled)?;
    let distances = correlations.numeric_matrix()?.mapv(|c| 1.0 - c);

    info!(variables = distances.nrows(), "running MDS on variables");
    let fit = Mds::new(2).with_seed(MDS_SEED).fit_precomputed(&distances)?;
    info!(stress = fit.stress, iterations = fit.n_iter, "MDS converged");

    let mut table = DataTable::from_matrix(&["MDS1", "MDS2"], &fit.embedding)?;
    table.push_column(Column::from_strings("variable", sampled.headers()))?;
    table.write_csv(&ws.path(VARS_MDS_TRANSFORMED))?;
    correlations.write_csv(&ws.path(CORRELATIONS))?;

    Ok(table.nrows())
}

pub fn variables_mds(ws: &Workspace) -> Result<Value> {
    let path = ws.artifact(VARS_MDS_TRANSFORMED, "/api/mds/variables/create")?;
    Ok(DataTable::read_csv(&path)?.to_records())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SAMPLED_DATASET;
    use crate::error::LabError;

    fn sampled_workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), Some(9));
        let mut csv = String::from("Inches,Ram,Weight,Price\n");
        let rows = [
            (13.3, 8, 1.2, 1300.0),
            (13.3, 8, 1.3, 1250.0),
            (15.6, 8, 2.1, 700.0),
            (15.6, 4, 2.2, 520.0),
            (15.6, 16, 2.4, 1100.0),
            (17.3, 16, 3.2, 1900.0),
            (17.3, 32, 3.6, 2600.0),
            (14.0, 8, 1.6, 900.0),
        ];
        for (inches, ram, weight, price) in rows {
            csv.push_str(&format!("{inches},{ram},{weight},{price}\n"));
        }
        std::fs::write(ws.path(SAMPLED_DATASET), csv).unwrap();
        (dir, ws)
    }

    #[test]
    fn test_data_mds() {
        let (_dir, ws) = sampled_workspace();
        assert_eq!(create_data_mds(&ws).unwrap(), 8);

        let records = data_mds(&ws).unwrap();
        let records = records.as_array().unwrap();
        assert_eq!(records.len(), 8);
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["x", "y", "cluster"]);
        for record in records {
            let cluster = record["cluster"].as_i64().unwrap();
            assert!((0..MDS_CLUSTERS as i64).contains(&cluster));
            assert!(record["x"].as_f64().unwrap().is_finite());
        }
    }

    #[test]
    fn test_variables_mds() {
        let (_dir, ws) = sampled_workspace();
        assert_eq!(create_variables_mds(&ws).unwrap(), 4);

        let records = variables_mds(&ws).unwrap();
        let variables: Vec<&str> = records
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["variable"].as_str().unwrap())
            .collect();
        assert_eq!(variables, vec!["Inches", "Ram", "Weight", "Price"]);

        let correlations = DataTable::read_csv(&ws.path(CORRELATIONS)).unwrap();
        assert_eq!(correlations.headers(), vec!["Inches", "Ram", "Weight", "Price"]);
    }

    #[test]
    fn test_mds_is_repeatable() {
        let (_dir, ws) = sampled_workspace();
        create_variables_mds(&ws).unwrap();
        let first = variables_mds(&ws).unwrap();
        create_variables_mds(&ws).unwrap();
        assert_eq!(variables_mds(&ws).unwrap(), first);
    }

    #[test]
    fn test_requires_sample() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), None);
        assert!(matches!(create_data_mds(&ws), Err(LabError::ArtifactMissing { .. })));
        assert!(matches!(variables_mds(&ws), Err(LabError::ArtifactMissing { .. })));
    }
}
