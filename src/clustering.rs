// K-means sweep (k = 1..=10) on the two strongest PCA attributes
//
// One CSV row per (k, sample): the point, its cluster, the run's MSE, the
// cluster center and the point's distance to it. List cells hold JSON arrays.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::config::{Workspace, KMEANS_RESULTS};
use crate::error::{LabError, Result};
use crate::kmeans::KMeans;
use crate::kneedle::KneeLocator;
use crate::pca::top_attributes;
use crate::sampling::load_sampled;
use crate::stats::{euclidean, mean_squared_error};

const CREATE_STEP: &str = "/api/kmeans";

/// Largest k in the sweep
pub const MAX_K: usize = 10;

/// Number of PCA attributes clustered on
pub const CLUSTER_DIMENSIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmeansRecord {
    pub k: usize,
    pub coordinates: Vec<f64>,
    pub cluster_id: usize,
    pub mse: f64,
    pub center: Vec<f64>,
    pub radius: f64,
}

/// On-disk shape of a record
#[derive(Debug, Serialize, Deserialize)]
struct CsvRecord {
    k: usize,
    coordinates: String,
    cluster_id: usize,
    mse: f64,
    center: String,
    radius: f64,
}

impl TryFrom<&KmeansRecord> for CsvRecord {
    type Error = LabError;

    fn try_from(r: &KmeansRecord) -> Result<Self> {
        Ok(CsvRecord {
            k: r.k,
            coordinates: serde_json::to_string(&r.coordinates)?,
            cluster_id: r.cluster_id,
            mse: r.mse,
            center: serde_json::to_string(&r.center)?,
            radius: r.radius,
        })
    }
}

impl TryFrom<CsvRecord> for KmeansRecord {
    type Error = LabError;

    fn try_from(r: CsvRecord) -> Result<Self> {
        Ok(KmeansRecord {
            k: r.k,
            coordinates: serde_json::from_str(&r.coordinates)?,
            cluster_id: r.cluster_id,
            mse: r.mse,
            center: serde_json::from_str(&r.center)?,
            radius: r.radius,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterCenter {
    pub cluster_id: usize,
    /// Mean of the member points
    pub coordinates: Vec<f64>,
    /// Largest member distance to the fitted center
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub attributes: Vec<String>,
    pub max_k: usize,
    pub rows: usize,
}

/// Run the sweep and write kmeans_results.csv
pub fn create(ws: &Workspace) -> Result<SweepSummary> {
    let attributes = top_attributes(ws, CLUSTER_DIMENSIONS)?;
    let data = load_sampled(ws)?.select(&attributes)?.numeric_matrix()?;
    let max_k = MAX_K.min(data.nrows());
    info!(attributes = ?attributes, max_k, "running k-means sweep");

    let mut records = Vec::with_capacity(max_k * data.nrows());
    for k in 1..=max_k {
        let fit = KMeans::new(k).with_seed(ws.seed()).fit(&data)?;
        let centers = fit.assigned_centers();
        let mse = mean_squared_error(&data, &centers);

        for (i, &cluster_id) in fit.labels.iter().enumerate() {
            let point = data.row(i);
            let center = fit.centroids.row(cluster_id);
            records.push(KmeansRecord {
                k,
                coordinates: point.to_vec(),
                cluster_id,
                mse,
                center: center.to_vec(),
                radius: euclidean(point.iter().copied(), center.iter().copied()),
            });
        }
        info!(k, mse, inertia = fit.inertia, "k-means fitted");
    }

    write_records(&ws.path(KMEANS_RESULTS), &records)?;

    Ok(SweepSummary {
        attributes,
        max_k,
        rows: records.len(),
    })
}

fn write_records(path: &std::path::Path, records: &[KmeansRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for record in records {
        wtr.serialize(CsvRecord::try_from(record)?)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn load_records(ws: &Workspace) -> Result<Vec<KmeansRecord>> {
    let path = ws.artifact(KMEANS_RESULTS, CREATE_STEP)?;
    let mut rdr = csv::Reader::from_path(path)?;
    rdr.deserialize::<CsvRecord>()
        .map(|row| KmeansRecord::try_from(row?))
        .collect()
}

/// `[k, mean mse]` for every k in the sweep
pub fn mse(ws: &Workspace) -> Result<Vec<(usize, f64)>> {
    let mut per_k: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
    for record in load_records(ws)? {
        let entry = per_k.entry(record.k).or_insert((0.0, 0));
        entry.0 += record.mse;
        entry.1 += 1;
    }
    Ok(per_k
        .into_iter()
        .map(|(k, (sum, count))| (k, sum / count as f64))
        .collect())
}

/// Elbow of the per-k error curve
pub fn best_k(ws: &Workspace) -> Result<usize> {
    let mut per_k: BTreeMap<usize, f64> = BTreeMap::new();
    for record in load_records(ws)? {
        *per_k.entry(record.k).or_insert(0.0) += record.mse;
    }

    let x: Vec<f64> = per_k.keys().map(|&k| k as f64).collect();
    let y: Vec<f64> = per_k.values().copied().collect();
    KneeLocator::elbow()
        .find(&x, &y)
        .map(|k| k as usize)
        .ok_or(LabError::NoElbow)
}

pub fn results(ws: &Workspace, k: usize) -> Result<Vec<KmeansRecord>> {
    Ok(load_records(ws)?.into_iter().filter(|r| r.k == k).collect())
}

/// Per-cluster mean point and largest radius for one k
pub fn centers(ws: &Workspace, k: usize) -> Result<Vec<ClusterCenter>> {
    let mut groups: BTreeMap<usize, (Vec<f64>, usize, f64)> = BTreeMap::new();

    for record in results(ws, k)? {
        let entry = groups
            .entry(record.cluster_id)
            .or_insert_with(|| (vec![0.0; record.coordinates.len()], 0, f64::NEG_INFINITY));
        for (sum, value) in entry.0.iter_mut().zip(&record.coordinates) {
            *sum += value;
        }
        entry.1 += 1;
        entry.2 = entry.2.max(record.radius);
    }

    Ok(groups
        .into_iter()
        .map(|(cluster_id, (sums, count, radius))| ClusterCenter {
            cluster_id,
            coordinates: sums.into_iter().map(|s| s / count as f64).collect(),
            radius,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn record(k: usize, cluster_id: usize, coordinates: Vec<f64>, mse: f64, radius: f64) -> KmeansRecord {
        KmeansRecord {
            k,
            center: coordinates.clone(),
            coordinates,
            cluster_id,
            mse,
            radius,
        }
    }

    fn workspace_with_records(records: &[KmeansRecord]) -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), Some(0));
        write_records(&ws.path(KMEANS_RESULTS), records).unwrap();
        (dir, ws)
    }

    #[test]
    fn test_records_survive_csv() {
        let records = vec![
            record(1, 0, vec![1.5, -2.0], 3.25, 0.5),
            record(2, 1, vec![0.1, 0.2], 1.0, 0.25),
        ];
        let (_dir, ws) = workspace_with_records(&records);

        let text = std::fs::read_to_string(ws.path(KMEANS_RESULTS)).unwrap();
        assert!(text.starts_with("k,coordinates,cluster_id,mse,center,radius\n"));
        assert!(text.contains("\"[1.5,-2.0]\""));

        assert_eq!(load_records(&ws).unwrap(), records);
    }

    #[test]
    fn test_mse_and_best_k() {
        let curve = [100.0, 40.0, 15.0, 10.0, 8.0, 7.0, 6.5, 6.0, 5.8, 5.6];
        let mut records = Vec::new();
        for (i, &mse) in curve.iter().enumerate() {
            let k = i + 1;
            records.push(record(k, 0, vec![0.0, 0.0], mse, 1.0));
            records.push(record(k, 0, vec![1.0, 1.0], mse, 1.0));
        }
        let (_dir, ws) = workspace_with_records(&records);

        let per_k = mse(&ws).unwrap();
        assert_eq!(per_k.len(), 10);
        assert_eq!(per_k[0], (1, 100.0));
        assert_eq!(per_k[9], (10, 5.6));

        assert_eq!(best_k(&ws).unwrap(), 3);
    }

    #[test]
    fn test_results_and_centers() {
        let records = vec![
            record(2, 0, vec![0.0, 0.0], 1.0, 0.5),
            record(2, 0, vec![2.0, 2.0], 1.0, 1.5),
            record(2, 1, vec![10.0, 10.0], 1.0, 0.0),
            record(3, 0, vec![5.0, 5.0], 0.5, 0.0),
        ];
        let (_dir, ws) = workspace_with_records(&records);

        assert_eq!(results(&ws, 2).unwrap().len(), 3);
        assert!(results(&ws, 7).unwrap().is_empty());

        let centers = centers(&ws, 2).unwrap();
        assert_eq!(centers.len(), 2);
        assert_eq!(centers[0].cluster_id, 0);
        assert_abs_diff_eq!(centers[0].coordinates[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(centers[0].radius, 1.5, epsilon = 1e-12);
        assert_eq!(centers[1].coordinates, vec![10.0, 10.0]);
    }

    #[test]
    fn test_create_requires_pca() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), None);
        assert!(matches!(create(&ws), Err(LabError::ArtifactMissing { .. })));
    }
}
