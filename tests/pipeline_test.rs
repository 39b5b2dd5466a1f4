mod common;

use approx::assert_abs_diff_eq;

use laptop_lab::config::SAMPLED_DATASET;
use laptop_lab::{clustering, correlation, mds, pca, pcp, sampling, LabError, SampleOptions, Workspace};

fn workspace(seed: u64) -> (tempfile::TempDir, Workspace) {
    let dir = tempfile::tempdir().unwrap();
    common::write_original(dir.path());
    let ws = Workspace::new(dir.path(), Some(seed));
    (dir, ws)
}

#[test]
fn test_full_pipeline() {
    let (_dir, ws) = workspace(11);

    let summary = sampling::create_dataset(&ws, 10, SampleOptions::default()).unwrap();
    assert_eq!(summary.rows, 10);
    assert_eq!(summary.message(), "Sampled 10 rows from the original dataset");

    let pca_summary = pca::create(&ws, true).unwrap();
    assert_eq!(pca_summary.components, 4);
    let total: f64 = pca_summary.explained_variance_ratio.iter().sum();
    assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);

    // eigenvalues come back sorted
    let eigen = pca::eigen(&ws).unwrap();
    assert!(eigen.eigenvalues.windows(2).all(|w| w[0] >= w[1]));

    let attributes = pca::top_attributes(&ws, 2).unwrap();
    assert_eq!(attributes.len(), 2);

    let sweep = clustering::create(&ws).unwrap();
    assert_eq!(sweep.attributes, attributes);
    assert_eq!(sweep.max_k, 10);
    assert_eq!(sweep.rows, 100);

    // every point is its own cluster at k = n
    let per_k = clustering::mse(&ws).unwrap();
    assert_abs_diff_eq!(per_k[9].1, 0.0, epsilon = 1e-12);
    assert!(per_k[0].1 >= per_k[9].1);

    assert_eq!(mds::create_data_mds(&ws).unwrap(), 10);
    assert_eq!(mds::create_variables_mds(&ws).unwrap(), 4);

    correlation::create(&ws).unwrap();
    let order = correlation::order(&ws).unwrap();
    assert_eq!(order.len(), 4);
}

#[test]
fn test_seeded_sampling_is_repeatable() {
    let (dir, ws) = workspace(3);

    sampling::create_dataset(&ws, 6, SampleOptions::default()).unwrap();
    let first = std::fs::read_to_string(dir.path().join(SAMPLED_DATASET)).unwrap();
    sampling::create_dataset(&ws, 6, SampleOptions::default()).unwrap();
    let second = std::fs::read_to_string(dir.path().join(SAMPLED_DATASET)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_sample_size_limit() {
    let (_dir, ws) = workspace(1);

    assert!(sampling::create_dataset(&ws, 12, SampleOptions::default()).is_ok());
    let err = sampling::create_dataset(&ws, 13, SampleOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        LabError::SampleTooLarge {
            requested: 13,
            available: 12
        }
    ));
}

#[test]
fn test_sweep_caps_k_at_sample_count() {
    let (_dir, ws) = workspace(5);

    sampling::create_dataset(&ws, 4, SampleOptions::default()).unwrap();
    pca::create(&ws, true).unwrap();
    let sweep = clustering::create(&ws).unwrap();
    assert_eq!(sweep.max_k, 4);
    assert_eq!(clustering::mse(&ws).unwrap().len(), 4);
}

#[test]
fn test_cluster_data_on_original() {
    let (_dir, ws) = workspace(2);

    let features = vec!["Inches".to_string(), "Ram".to_string()];
    let summary = pcp::create_cluster_data(&ws, &features, 3).unwrap();
    assert_eq!(summary.rows, 12);

    let records = pcp::cluster_data(&ws).unwrap();
    for record in records.as_array().unwrap() {
        let cluster = record["cluster"].as_i64().unwrap();
        assert!((0..3).contains(&cluster));
    }
}
