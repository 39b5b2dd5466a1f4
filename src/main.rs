use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use laptop_lab::config::{
    LabConfig, CLUSTER_DATA, CORRELATIONS, EIGENDECOMPOSITION, ENCODED_DATASET, KMEANS_RESULTS,
    LOADINGS, MAPPINGS, MDS_TRANSFORMED, METADATA, ORIGINAL_DATASET, PRINCIPAL_COMPONENTS,
    SAMPLED_DATASET, VARS_MDS_TRANSFORMED,
};
use laptop_lab::pcp::{DEFAULT_CLUSTERS, DEFAULT_FEATURES};
use laptop_lab::{clustering, correlation, mds, pca, pcp, prepare_dataset, sampling, SampleOptions};

#[derive(Parser)]
#[command(name = "laptop-lab")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sampling, PCA, k-means and MDS over the laptop price dataset", long_about = None)]
struct Cli {
    /// Directory holding the lab's CSV and JSON files
    #[arg(long, env = "LAB_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Seed for sampling and k-means
    #[arg(long, env = "LAB_SEED", global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, sample and encode the raw laptop prices CSV
    Prepare {
        /// Raw CSV as downloaded
        #[arg(short, long)]
        raw: PathBuf,

        /// Rows kept in the encoded dataset
        #[arg(short = 'n', long)]
        rows: Option<usize>,
    },

    /// Sample rows of the original dataset for the analysis steps
    Sample {
        rows: usize,

        /// Keep rows with missing cells
        #[arg(long)]
        keep_missing: bool,

        /// Keep text columns
        #[arg(long)]
        keep_categorical: bool,
    },

    /// Eigendecomposition of the sampled dataset
    Pca {
        /// Skip z-scoring before the decomposition
        #[arg(long)]
        no_standardize: bool,
    },

    /// K-means sweep on the two strongest PCA attributes
    Kmeans,

    /// Cluster the original dataset for the parallel coordinates plot
    Clusters {
        /// Comma separated feature names
        #[arg(short, long)]
        features: Option<String>,

        #[arg(short, long, default_value_t = DEFAULT_CLUSTERS)]
        k: usize,
    },

    /// Sample and variable MDS embeddings
    Mds,

    /// Absolute correlation matrix and axis order
    Correlations,

    /// Show the configuration and which artifacts exist
    Info,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "laptop_lab=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = LabConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    let ws = config.workspace();

    match cli.command {
        Commands::Prepare { raw, rows } => {
            println!("📂 Preparing {}", raw.display());
            let summary = prepare_dataset(&ws, &raw, rows)
                .with_context(|| format!("failed to prepare {}", raw.display()))?;
            println!("✓ {} rows x {} columns", summary.rows, summary.columns);
            println!(
                "✓ {} categorical, {} numerical, {} mappings",
                summary.categorical, summary.numerical, summary.mappings
            );
        }
        Commands::Sample {
            rows,
            keep_missing,
            keep_categorical,
        } => {
            let options = SampleOptions {
                drop_none: !keep_missing,
                drop_categorical: !keep_categorical,
            };
            let summary = sampling::create_dataset(&ws, rows, options)
                .context("sampling failed")?;
            println!("✓ {}", summary.message());
            println!("  {} rows kept, columns: {}", summary.rows, summary.columns.join(", "));
        }
        Commands::Pca { no_standardize } => {
            let summary = pca::create(&ws, !no_standardize).context("PCA failed")?;
            println!(
                "✓ {} components from {} samples x {} features",
                summary.components, summary.samples, summary.features
            );
            for (i, ratio) in summary.explained_variance_ratio.iter().enumerate() {
                println!("  {}: {:.1}%", pca::component_name(i), ratio * 100.0);
            }
            match pca::elbow_index(&ws) {
                Ok(index) => println!("✓ Elbow at component index {}", index),
                Err(e) => println!("⚠️  {}", e),
            }
        }
        Commands::Kmeans => {
            let summary = clustering::create(&ws).context("k-means sweep failed")?;
            println!(
                "✓ k = 1..={} on {}",
                summary.max_k,
                summary.attributes.join(", ")
            );
            for (k, mse) in clustering::mse(&ws)? {
                println!("  k={:<2} mse={:.4}", k, mse);
            }
            match clustering::best_k(&ws) {
                Ok(k) => println!("✓ Best k: {}", k),
                Err(e) => println!("⚠️  {}", e),
            }
        }
        Commands::Clusters { features, k } => {
            let features: Vec<String> = match features {
                Some(list) => pca::parse_components(&list),
                None => DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect(),
            };
            let summary = pcp::create_cluster_data(&ws, &features, k)
                .context("clustering the original dataset failed")?;
            println!(
                "✓ {} rows in {} clusters on {}",
                summary.rows,
                summary.clusters,
                summary.features.join(", ")
            );
        }
        Commands::Mds => {
            let samples = mds::create_data_mds(&ws).context("sample MDS failed")?;
            println!("✓ Embedded {} samples", samples);
            let variables = mds::create_variables_mds(&ws).context("variable MDS failed")?;
            println!("✓ Embedded {} variables", variables);
        }
        Commands::Correlations => {
            correlation::create(&ws).context("correlation matrix failed")?;
            let order = correlation::order(&ws)?;
            println!("✓ Axis order: {}", order.join(", "));
        }
        Commands::Info => {
            println!("Laptop Lab v{}", laptop_lab::VERSION);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("Data dir: {}", ws.root().display());
            println!("Seed:     {}", ws.seed().map_or("random".to_string(), |s| s.to_string()));
            println!();
            for name in [
                ORIGINAL_DATASET,
                ENCODED_DATASET,
                METADATA,
                MAPPINGS,
                SAMPLED_DATASET,
                PRINCIPAL_COMPONENTS,
                LOADINGS,
                EIGENDECOMPOSITION,
                KMEANS_RESULTS,
                CLUSTER_DATA,
                MDS_TRANSFORMED,
                VARS_MDS_TRANSFORMED,
                CORRELATIONS,
            ] {
                let mark = if ws.path(name).exists() { "✓" } else { "·" };
                println!("  {} {}", mark, name);
            }
        }
    }

    Ok(())
}
