// REST API over the lab pipelines
//
// Every handler locks the shared workspace and runs its routine on the
// blocking pool: the pipelines read and write CSV files and some of them
// (MDS, the k-means sweep) take seconds on the full sample.

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::{LabConfig, Workspace};
use crate::error::{LabError, Result};
use crate::pca::{parse_components, DEFAULT_COMPONENTS, MAX_DIMENSIONALITY_INDEX};
use crate::pcp::{DEFAULT_CLUSTERS, DEFAULT_FEATURES};
use crate::sampling::SampleOptions;
use crate::{clustering, correlation, explorer, mds, pca, pcp, sampling};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    workspace: Arc<Mutex<Workspace>>,
    static_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &LabConfig) -> Self {
        Self {
            workspace: Arc::new(Mutex::new(config.workspace())),
            static_dir: config.static_dir.clone(),
        }
    }

    /// Run `job` against the workspace on the blocking pool
    async fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Workspace) -> Result<T> + Send + 'static,
    {
        let workspace = Arc::clone(&self.workspace);
        tokio::task::spawn_blocking(move || {
            let ws = workspace
                .lock()
                .map_err(|_| LabError::Internal("workspace lock poisoned".to_string()))?;
            job(&ws)
        })
        .await
        .map_err(|e| LabError::Internal(format!("worker task failed: {}", e)))?
    }
}

fn message(text: impl Into<String>) -> Json<Value> {
    Json(json!({ "message": text.into() }))
}

/// `true` unless the caller sent something other than "true" (any case)
fn flag(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map_or(true, |v| v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SampleQuery {
    drop_none: Option<String>,
    drop_categorical: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StandardizeQuery {
    standardize: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComponentsQuery {
    components: Option<String>,
}

impl ComponentsQuery {
    fn names(&self) -> Vec<String> {
        parse_components(self.components.as_deref().unwrap_or(DEFAULT_COMPONENTS))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DimensionalityQuery {
    dimensionality_index: Option<usize>,
}

impl DimensionalityQuery {
    fn d(&self) -> usize {
        self.dimensionality_index.unwrap_or(MAX_DIMENSIONALITY_INDEX)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct KQuery {
    k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClusterQuery {
    /// Comma separated feature names
    features: Option<String>,
    k: Option<usize>,
}

// ============================================================================
// Explorer handlers
// ============================================================================

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

/// GET /api/health - Health check
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

/// GET /data - Every record of the prepared dataset
async fn get_dataset(State(state): State<AppState>) -> Result<Json<Value>> {
    Ok(Json(state.run(explorer::dataset_records).await?))
}

/// GET /headers
async fn get_headers(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.run(explorer::headers).await?))
}

/// GET /data/:column and /api/data/:column
async fn get_column(
    State(state): State<AppState>,
    Path(column): Path<String>,
) -> Result<Json<Value>> {
    let values = state
        .run(move |ws| explorer::column_values(ws, &column))
        .await?;
    Ok(Json(values))
}

/// GET /data/type/:column
async fn get_column_type(
    State(state): State<AppState>,
    Path(column): Path<String>,
) -> Result<Json<Value>> {
    let kind = state.run(move |ws| explorer::column_type(ws, &column)).await?;
    Ok(Json(json!({ "type": kind })))
}

/// GET /data/mapping/:column
async fn get_column_mapping(
    State(state): State<AppState>,
    Path(column): Path<String>,
) -> Result<Json<Value>> {
    let mapping = state
        .run(move |ws| explorer::column_mapping(ws, &column))
        .await?;
    Ok(Json(mapping))
}

/// GET /api/data - Every record of the original dataset
async fn get_original(State(state): State<AppState>) -> Result<Json<Value>> {
    Ok(Json(state.run(explorer::original_records).await?))
}

/// GET /api/headers - Headers of the sampled dataset
async fn get_sampled_headers(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.run(explorer::sampled_headers).await?))
}

// ============================================================================
// Sampling and PCA handlers
// ============================================================================

/// GET|POST /api/data/sample/:n
async fn create_sample(
    State(state): State<AppState>,
    Path(n): Path<usize>,
    Query(query): Query<SampleQuery>,
) -> Result<Json<Value>> {
    let options = SampleOptions {
        drop_none: flag(&query.drop_none),
        drop_categorical: flag(&query.drop_categorical),
    };
    let summary = state
        .run(move |ws| sampling::create_dataset(ws, n, options))
        .await?;
    info!(rows = summary.rows, "sample created");
    Ok(message(summary.message()))
}

/// GET|POST /api/pca/create
async fn create_pca(
    State(state): State<AppState>,
    Query(query): Query<StandardizeQuery>,
) -> Result<Json<Value>> {
    let standardize = flag(&query.standardize);
    state.run(move |ws| pca::create(ws, standardize)).await?;
    Ok(message("Eigendecomposition completed"))
}

/// GET /api/pca?components=PC1,PC2
async fn get_principal_components(
    State(state): State<AppState>,
    Query(query): Query<ComponentsQuery>,
) -> Result<Json<Value>> {
    let components = query.names();
    let rows = state
        .run(move |ws| pca::principal_components(ws, &components))
        .await?;
    Ok(Json(json!({ "principal_components": rows })))
}

/// GET /api/principalcomponents?components=PC1,PC2
async fn get_component_scores(
    State(state): State<AppState>,
    Query(query): Query<ComponentsQuery>,
) -> Result<Json<Value>> {
    let components = query.names();
    let rows = state
        .run(move |ws| pca::component_scores(ws, &components))
        .await?;
    Ok(Json(json!({ "principal_components": rows })))
}

/// GET /api/pca/elbow
async fn get_elbow(State(state): State<AppState>) -> Result<Json<Value>> {
    let index = state.run(pca::elbow_index).await?;
    Ok(Json(json!({ "elbow_index": index })))
}

/// GET /api/pca/loadings?components=PC1,PC2
async fn get_loadings(
    State(state): State<AppState>,
    Query(query): Query<ComponentsQuery>,
) -> Result<Json<Value>> {
    let components = query.names();
    let rows = state
        .run(move |ws| pca::loadings(ws, &components))
        .await?;
    Ok(Json(json!({ "loadings": rows })))
}

/// GET /api/pca/eigenvectors
async fn get_eigen(State(state): State<AppState>) -> Result<Json<pca::Eigen>> {
    Ok(Json(state.run(pca::eigen).await?))
}

/// GET /api/pca/attributes?dimensionality_index=4
async fn get_attributes(
    State(state): State<AppState>,
    Query(query): Query<DimensionalityQuery>,
) -> Result<Json<Value>> {
    let d = query.d();
    let attributes = state.run(move |ws| pca::attributes(ws, d)).await?;
    Ok(Json(json!({ "attributes": attributes })))
}

/// GET /api/pca/attributes/data?dimensionality_index=4
async fn get_attributes_data(
    State(state): State<AppState>,
    Query(query): Query<DimensionalityQuery>,
) -> Result<Json<Value>> {
    let d = query.d();
    let data = state.run(move |ws| pca::attributes_data(ws, d)).await?;
    Ok(Json(json!({ "data": data })))
}

// ============================================================================
// Clustering handlers
// ============================================================================

/// GET|POST /api/kmeans
async fn create_kmeans(State(state): State<AppState>) -> Result<Json<Value>> {
    state.run(clustering::create).await?;
    Ok(message("K-means clustering completed successfully"))
}

/// GET /api/kmeans/mse
async fn get_mse(State(state): State<AppState>) -> Result<Json<Value>> {
    let mse = state.run(clustering::mse).await?;
    Ok(Json(json!({ "mse": mse })))
}

/// GET /api/kmeans/bestk
async fn get_best_k(State(state): State<AppState>) -> Result<Json<Value>> {
    let best_k = state.run(clustering::best_k).await?;
    Ok(Json(json!({ "best_k": best_k })))
}

/// GET /api/kmeans/results?k=1
async fn get_kmeans_results(
    State(state): State<AppState>,
    Query(query): Query<KQuery>,
) -> Result<Json<Vec<clustering::KmeansRecord>>> {
    let k = query.k.unwrap_or(1);
    Ok(Json(state.run(move |ws| clustering::results(ws, k)).await?))
}

/// GET /api/kmeans/centers?k=1
async fn get_centers(
    State(state): State<AppState>,
    Query(query): Query<KQuery>,
) -> Result<Json<Value>> {
    let k = query.k.unwrap_or(1);
    let centers = state.run(move |ws| clustering::centers(ws, k)).await?;
    Ok(Json(json!({ "centers": centers })))
}

/// GET|POST /api/clusters/create?features=Inches,Ram&k=3
async fn create_clusters(
    State(state): State<AppState>,
    Query(query): Query<ClusterQuery>,
) -> Result<Json<Value>> {
    let features = match query.features.as_deref() {
        Some(list) => parse_components(list),
        None => DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect(),
    };
    let k = query.k.unwrap_or(DEFAULT_CLUSTERS);
    state
        .run(move |ws| pcp::create_cluster_data(ws, &features, k))
        .await?;
    Ok(message("Cluster data created"))
}

/// GET /api/clusters
async fn get_clusters(State(state): State<AppState>) -> Result<Json<Value>> {
    Ok(Json(state.run(pcp::cluster_data).await?))
}

// ============================================================================
// MDS and correlation handlers
// ============================================================================

/// GET|POST /api/mds/data/create
async fn create_data_mds(State(state): State<AppState>) -> Result<Json<Value>> {
    state.run(mds::create_data_mds).await?;
    Ok(message("MDS completed successfully"))
}

/// GET /api/mds/data
async fn get_data_mds(State(state): State<AppState>) -> Result<Json<Value>> {
    Ok(Json(state.run(mds::data_mds).await?))
}

/// GET|POST /api/mds/variables/create
async fn create_variables_mds(State(state): State<AppState>) -> Result<Json<Value>> {
    state.run(mds::create_variables_mds).await?;
    Ok(message("Variables MDS completed successfully"))
}

/// GET /api/mds/variables
async fn get_variables_mds(State(state): State<AppState>) -> Result<Json<Value>> {
    Ok(Json(state.run(mds::variables_mds).await?))
}

/// GET|POST /api/correlations/create
async fn create_correlations(State(state): State<AppState>) -> Result<Json<Value>> {
    state.run(correlation::create).await?;
    Ok(message("Correlations computed successfully"))
}

/// GET /api/correlations
async fn get_correlation_order(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.run(correlation::order).await?))
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/data", get(get_original))
        .route("/headers", get(get_sampled_headers))
        .route("/data/:column", get(get_column))
        .route("/data/sample/:n", get(create_sample).post(create_sample))
        .route("/sample/:n", get(create_sample).post(create_sample))
        .route("/pca/create", get(create_pca).post(create_pca))
        .route("/eigendecomposition", get(create_pca).post(create_pca))
        .route("/pca", get(get_principal_components))
        .route("/principalcomponents", get(get_component_scores))
        .route("/pca/elbow", get(get_elbow))
        .route("/pca/loadings", get(get_loadings))
        .route("/pca/eigenvectors", get(get_eigen))
        .route("/eigenvectors", get(get_eigen))
        .route("/pca/attributes", get(get_attributes))
        .route("/pca/attributes/data", get(get_attributes_data))
        .route("/kmeans", get(create_kmeans).post(create_kmeans))
        .route("/kmeans/mse", get(get_mse))
        .route("/kmeans/bestk", get(get_best_k))
        .route("/kmeans/results", get(get_kmeans_results))
        .route("/kmeans/centers", get(get_centers))
        .route("/clusters/create", get(create_clusters).post(create_clusters))
        .route("/clusters", get(get_clusters))
        .route("/mds/data/create", get(create_data_mds).post(create_data_mds))
        .route("/mds/data", get(get_data_mds))
        .route(
            "/mds/variables/create",
            get(create_variables_mds).post(create_variables_mds),
        )
        .route("/mds/variables", get(get_variables_mds))
        .route(
            "/correlations/create",
            get(create_correlations).post(create_correlations),
        )
        .route("/correlations", get(get_correlation_order));

    Router::new()
        .route("/", get(serve_index))
        .route("/data", get(get_dataset))
        .route("/headers", get(get_headers))
        .route("/data/:column", get(get_column))
        .route("/data/type/:column", get(get_column_type))
        .route("/data/mapping/:column", get(get_column_mapping))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert!(flag(&None));
        assert!(flag(&Some("true".to_string())));
        assert!(flag(&Some("TRUE".to_string())));
        assert!(!flag(&Some("false".to_string())));
        assert!(!flag(&Some("0".to_string())));
    }

    #[test]
    fn test_query_defaults() {
        assert_eq!(
            ComponentsQuery::default().names(),
            vec!["PC1".to_string(), "PC2".to_string()]
        );
        assert_eq!(DimensionalityQuery::default().d(), MAX_DIMENSIONALITY_INDEX);
    }
}
