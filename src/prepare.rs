// Dataset preparation: raw laptop prices -> cleaned, sampled, encoded dataset
//
// Produces the encoded dataset plus metadata.json (which columns were
// categorical/numerical before encoding) and mappings.json (code -> label).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

use crate::config::{
    Workspace, DEFAULT_PREPARED_ROWS, ENCODED_DATASET, MAPPINGS, METADATA, ORIGINAL_DATASET,
};
use crate::error::Result;
use crate::sampling::seeded_rng;
use crate::stats::round_to;
use crate::table::{Column, DataTable};

/// Column titles applied to the raw CSV, replacing its own header row
pub const RAW_TITLES: [&str; 23] = [
    "Company",
    "Model",
    "Laptop",
    "Screen Size",
    "RAM",
    "OS",
    "Weight",
    "Price_euros",
    "Screen",
    "Screen Width",
    "Screen Height",
    "Touchscreen",
    "IPSPanel",
    "Retina Display",
    "CPU Company",
    "CPU Frequency",
    "CPU Model",
    "Primary Storage",
    "Secondary Storage",
    "Primary Storage Type",
    "Secondary Storage Type",
    "GPU Company",
    "GPU Model",
];

/// Boolean-ish columns that carry no signal for the plots
pub const DROPPED_COLUMNS: [&str; 4] = [
    "Touchscreen",
    "IPSPanel",
    "Retina Display",
    "Secondary Storage Type",
];

/// Euro -> dollar rate applied to Price_euros
pub const EUR_TO_USD: f64 = 1.19;

/// Column split recorded before categorical encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub categorical: Vec<String>,
    pub numerical: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl DatasetMetadata {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepareSummary {
    pub rows: usize,
    pub columns: usize,
    pub mappings: usize,
    pub categorical: usize,
    pub numerical: usize,
}

/// Clean, sample and encode the raw dataset at `raw_path` into the workspace.
///
/// The raw file is also kept, untouched, as the original dataset that
/// sampling and the cluster views read. `rows` is capped at the number of
/// complete rows available.
pub fn prepare_dataset(ws: &Workspace, raw_path: &Path, rows: Option<usize>) -> Result<PrepareSummary> {
    ws.ensure_root()?;

    info!(path = %raw_path.display(), "reading raw dataset");
    let mut table = DataTable::read_csv_with_names(raw_path, &RAW_TITLES)?;

    let original = ws.path(ORIGINAL_DATASET);
    if !same_file(raw_path, &original) {
        std::fs::copy(raw_path, &original)?;
        info!(path = %original.display(), "copied raw dataset");
    }

    info!("dropping rows with missing values");
    table = table.drop_missing_rows();

    info!(columns = ?DROPPED_COLUMNS, "dropping boolean columns");
    table.drop_columns(&DROPPED_COLUMNS)?;

    let wanted = rows.unwrap_or(DEFAULT_PREPARED_ROWS).min(table.nrows());
    info!(rows = wanted, available = table.nrows(), "sampling");
    let mut rng = seeded_rng(ws.seed());
    table = table.sample_rows(wanted, &mut rng)?;

    info!("converting Price_euros to Price in dollars");
    let prices: Vec<f64> = table
        .column("Price_euros")?
        .floats()
        .into_iter()
        .map(|p| round_to(p.unwrap_or(f64::NAN) * EUR_TO_USD, 2))
        .collect();
    table.drop_columns(&["Price_euros"])?;
    table.push_column(Column::from_floats("Price", prices))?;

    let metadata = DatasetMetadata {
        categorical: table.text_columns(),
        numerical: table.numeric_columns(),
        generated_at: Some(Utc::now()),
    };

    info!(columns = metadata.categorical.len(), "converting text columns to categorical codes");
    let mappings: Map<String, Value> = table.encode_categorical();

    let encoded_path = ws.path(ENCODED_DATASET);
    info!(path = %encoded_path.display(), "exporting encoded dataset");
    table.write_csv(&encoded_path)?;

    std::fs::write(ws.path(METADATA), serde_json::to_string_pretty(&metadata)?)?;
    std::fs::write(ws.path(MAPPINGS), serde_json::to_string_pretty(&mappings)?)?;
    info!("exported metadata and mappings");

    Ok(PrepareSummary {
        rows: table.nrows(),
        columns: table.ncols(),
        mappings: mappings.len(),
        categorical: metadata.categorical.len(),
        numerical: metadata.numerical.len(),
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnKind;
    use serde_json::json;

    const HEADER: &str = "company,product,type,inches,ram,os,weight,price_euros,screen,sw,sh,touch,ips,retina,cpu_company,cpu_freq,cpu_model,primary,secondary,primary_type,secondary_type,gpu_company,gpu_model";

    fn raw_row(company: &str, price: &str, touch: &str) -> String {
        format!(
            "{company},XPS,Ultrabook,13.3,8,Windows 10,1.2,{price},Full HD,1920,1080,{touch},Yes,No,Intel,2.5,Core i5,256,0,SSD,No,Intel,UHD 620"
        )
    }

    fn raw_fixture(dir: &Path) -> std::path::PathBuf {
        let rows = vec![
            raw_row("Dell", "1000", "No"),
            raw_row("Apple", "1299", "No"),
            raw_row("Acer", "", "Yes"),
            raw_row("HP", "500", "Yes"),
        ];
        let path = dir.join("raw.csv");
        std::fs::write(&path, format!("{}\n{}\n", HEADER, rows.join("\n"))).unwrap();
        path
    }

    #[test]
    fn test_prepare_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_fixture(dir.path());
        let ws = Workspace::new(dir.path().join("data"), Some(1));

        let summary = prepare_dataset(&ws, &raw, None).unwrap();
        assert_eq!(summary.rows, 3);
        // 23 titles - 4 dropped columns (Price_euros replaced by Price)
        assert_eq!(summary.columns, 19);

        let encoded = DataTable::read_csv(&ws.path(ENCODED_DATASET)).unwrap();
        assert_eq!(encoded.headers().last().map(String::as_str), Some("Price"));
        assert!(!encoded.has_column("Touchscreen"));
        assert!(!encoded.has_column("Price_euros"));
        assert_eq!(encoded.column("Company").unwrap().kind, ColumnKind::Integer);

        let mut prices: Vec<f64> = encoded
            .column("Price")
            .unwrap()
            .floats()
            .into_iter()
            .flatten()
            .collect();
        prices.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(prices, vec![595.0, 1190.0, 1545.81]);

        let metadata = DatasetMetadata::load(&ws.path(METADATA)).unwrap();
        assert!(metadata.categorical.contains(&"Company".to_string()));
        assert!(metadata.numerical.contains(&"Price".to_string()));
        assert!(metadata.generated_at.is_some());

        let mappings: Value =
            serde_json::from_str(&std::fs::read_to_string(ws.path(MAPPINGS)).unwrap()).unwrap();
        assert_eq!(mappings["Company"], json!({"0": "Apple", "1": "Dell", "2": "HP"}));
        assert_eq!(summary.mappings, mappings.as_object().unwrap().len());

        let original = DataTable::read_csv(&ws.path(ORIGINAL_DATASET)).unwrap();
        assert_eq!(original.nrows(), 4);
        assert!(original.has_column("price_euros"));
    }

    #[test]
    fn test_row_cap() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_fixture(dir.path());
        let ws = Workspace::new(dir.path(), Some(2));

        let summary = prepare_dataset(&ws, &raw, Some(2)).unwrap();
        assert_eq!(summary.rows, 2);
    }
}
