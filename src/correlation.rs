// Absolute correlations between sampled variables, used to order PCP axes

use ndarray::Array2;
use tracing::info;

use crate::config::{Workspace, CORRELATIONS};
use crate::error::Result;
use crate::sampling::load_sampled;
use crate::stats::pearson_matrix;
use crate::table::DataTable;

const CREATE_STEP: &str = "/api/correlations/create";

/// |Pearson| between the numeric columns of `table`, one column per variable
pub fn abs_correlations(table: &DataTable) -> Result<DataTable> {
    let numeric = table.numeric_only();
    let corr: Array2<f64> = pearson_matrix(&numeric.numeric_matrix()?).mapv(f64::abs);
    DataTable::from_matrix(&numeric.headers(), &corr)
}

pub fn create(ws: &Workspace) -> Result<usize> {
    let correlations = abs_correlations(&load_sampled(ws)?)?;
    info!(variables = correlations.ncols(), "writing correlation matrix");
    correlations.write_csv(&ws.path(CORRELATIONS))?;
    Ok(correlations.ncols())
}

/// Column names by mean absolute correlation, strongest first
pub fn order(ws: &Workspace) -> Result<Vec<String>> {
    let correlations = DataTable::read_csv(&ws.artifact(CORRELATIONS, CREATE_STEP)?)?;
    let matrix = correlations.numeric_matrix()?;

    let mut ranked: Vec<(String, f64)> = correlations
        .headers()
        .into_iter()
        .zip(matrix.columns())
        .map(|(name, column)| (name, column.mean().unwrap_or(0.0)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(ranked.into_iter().map(|(name, _)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SAMPLED_DATASET;
    use crate::error::LabError;
    use approx::assert_abs_diff_eq;

    fn sampled_workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), None);
        // b = 2a, c = -a, d unrelated
        std::fs::write(
            ws.path(SAMPLED_DATASET),
            "a,b,c,d\n1,2,-1,5\n2,4,-2,1\n3,6,-3,4\n4,8,-4,2\n",
        )
        .unwrap();
        (dir, ws)
    }

    #[test]
    fn test_abs_correlations() {
        let (_dir, ws) = sampled_workspace();
        let corr = abs_correlations(&load_sampled(&ws).unwrap()).unwrap();

        assert_eq!(corr.headers(), vec!["a", "b", "c", "d"]);
        let m = corr.numeric_matrix().unwrap();
        assert_abs_diff_eq!(m[[0, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m[[0, 2]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m[[3, 3]], 1.0, epsilon = 1e-12);
        assert!(m[[0, 3]] < 1.0);
    }

    #[test]
    fn test_order() {
        let (_dir, ws) = sampled_workspace();
        assert_eq!(create(&ws).unwrap(), 4);

        let order = order(&ws).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(order[3], "d");
        let mut strongest = order[..3].to_vec();
        strongest.sort();
        assert_eq!(strongest, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_before_create() {
        let (_dir, ws) = sampled_workspace();
        assert!(matches!(order(&ws), Err(LabError::ArtifactMissing { .. })));
    }
}
