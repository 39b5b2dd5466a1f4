// Column explorer over the prepared dataset
//
// Backs the single-variable bar charts and histograms: raw records, a column's
// values, whether it was categorical, and its code -> label mapping.

use serde::Serialize;
use serde_json::Value;

use crate::config::{
    Workspace, ENCODED_DATASET, MAPPINGS, METADATA, ORIGINAL_DATASET, PREPARE_STEP,
};
use crate::error::{LabError, Result};
use crate::prepare::DatasetMetadata;
use crate::sampling::load_sampled;
use crate::table::DataTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Categorical,
    Numerical,
}

fn encoded_dataset(ws: &Workspace) -> Result<DataTable> {
    DataTable::read_csv(&ws.artifact(ENCODED_DATASET, PREPARE_STEP)?)
}

/// Every record of the prepared dataset
pub fn dataset_records(ws: &Workspace) -> Result<Value> {
    Ok(encoded_dataset(ws)?.to_records())
}

/// Values of one column of the prepared dataset
pub fn column_values(ws: &Workspace, name: &str) -> Result<Value> {
    Ok(encoded_dataset(ws)?.column(name)?.to_json())
}

pub fn column_type(ws: &Workspace, name: &str) -> Result<VariableType> {
    let metadata = DatasetMetadata::load(&ws.artifact(METADATA, PREPARE_STEP)?)?;

    if metadata.categorical.iter().any(|c| c == name) {
        Ok(VariableType::Categorical)
    } else if metadata.numerical.iter().any(|c| c == name) {
        Ok(VariableType::Numerical)
    } else {
        Err(LabError::ColumnNotFound(name.to_string()))
    }
}

/// `{"code": label}` for a categorical column
pub fn column_mapping(ws: &Workspace, name: &str) -> Result<Value> {
    let text = std::fs::read_to_string(ws.artifact(MAPPINGS, PREPARE_STEP)?)?;
    let mut mappings: serde_json::Map<String, Value> = serde_json::from_str(&text)?;
    mappings
        .remove(name)
        .ok_or_else(|| LabError::ColumnNotFound(name.to_string()))
}

pub fn headers(ws: &Workspace) -> Result<Vec<String>> {
    Ok(encoded_dataset(ws)?.headers())
}

/// Every record of the original (raw) dataset
pub fn original_records(ws: &Workspace) -> Result<Value> {
    let path = ws.artifact(ORIGINAL_DATASET, PREPARE_STEP)?;
    Ok(DataTable::read_csv(&path)?.to_records())
}

/// Headers of the sampled dataset
pub fn sampled_headers(ws: &Workspace) -> Result<Vec<String>> {
    Ok(load_sampled(ws)?.headers())
}
