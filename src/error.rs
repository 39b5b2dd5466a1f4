// Error types shared by the pipelines, the CLI and the REST API

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Number of samples exceeds the size of the dataset ({requested} > {available})")]
    SampleTooLarge { requested: usize, available: usize },

    #[error("{} not found; run {step} first", .path.display())]
    ArtifactMissing { path: PathBuf, step: &'static str },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No elbow point found")]
    NoElbow,

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LabError>;

#[cfg(feature = "server")]
mod response {
    use super::LabError;
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use serde_json::json;

    impl LabError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                LabError::ColumnNotFound(_) | LabError::ArtifactMissing { .. } => {
                    StatusCode::NOT_FOUND
                }
                LabError::SampleTooLarge { .. } | LabError::InvalidInput(_) => {
                    StatusCode::BAD_REQUEST
                }
                LabError::NoElbow => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for LabError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            let message = match &self {
                // Keep the exact bodies the frontend scripts check for
                LabError::ColumnNotFound(_) => "Column not found".to_string(),
                LabError::SampleTooLarge { .. } => {
                    "Number of samples exceeds the size of the dataset".to_string()
                }
                // Only the file name leaves the server
                LabError::ArtifactMissing { path, step } => {
                    tracing::warn!(path = %path.display(), step, "Artifact missing");
                    let name = path.file_name().unwrap_or(path.as_os_str());
                    format!("{} not found; run {} first", name.to_string_lossy(), step)
                }
                LabError::InvalidInput(_) | LabError::NoElbow => self.to_string(),
                other => {
                    tracing::error!(detail = %other, "Request failed");
                    "Internal server error".to_string()
                }
            };

            (status, Json(json!({ "error": message }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_missing_names_the_step() {
        let err = LabError::ArtifactMissing {
            path: PathBuf::from("data/loadings.csv"),
            step: "/api/pca/create",
        };
        assert_eq!(
            err.to_string(),
            "data/loadings.csv not found; run /api/pca/create first"
        );
    }

    #[cfg(feature = "server")]
    #[tokio::test]
    async fn test_artifact_missing_body_has_only_the_file_name() {
        use axum::response::IntoResponse;

        let err = LabError::ArtifactMissing {
            path: PathBuf::from("/srv/lab/data/loadings.csv"),
            step: "/api/pca/create",
        };
        let response = err.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"error": "loadings.csv not found; run /api/pca/create first"})
        );
    }

    #[cfg(feature = "server")]
    #[test]
    fn test_status_codes() {
        use axum::http::StatusCode;

        assert_eq!(
            LabError::ColumnNotFound("Foo".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LabError::SampleTooLarge { requested: 10, available: 5 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(LabError::NoElbow.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            LabError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
