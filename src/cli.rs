//! Command-line interface definitions and argument parsing

use crate::model::SegmentConfig;
use crate::viz::ChartFormat;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

/// Market segmentation of social-media users using K-Means clustering
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file (header row, identifier column, count columns)
    #[arg(short, long, default_value = "social_marketing.csv")]
    pub input: PathBuf,

    /// Identifier column to drop before clustering (defaults to the first column)
    #[arg(long)]
    pub id_column: Option<String>,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long, default_value = "12")]
    pub clusters: usize,

    /// Number of largest clusters to chart
    #[arg(short, long, default_value = "11")]
    pub top: usize,

    /// Random seed for centroid initialization
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value = "300")]
    pub max_iters: usize,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Number of K-Means initializations; the lowest-inertia run is kept
    #[arg(long, default_value = "10")]
    pub n_runs: usize,

    /// Z-score each feature before clustering (raw counts are clustered otherwise)
    #[arg(long)]
    pub standardize: bool,

    /// Directory for the generated charts
    #[arg(short, long, default_value = "cluster_profiles")]
    pub output_dir: PathBuf,

    /// Chart image format
    #[arg(long, value_enum, default_value_t = ChartFormat::Png)]
    pub format: ChartFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Segmenter settings described by these arguments
    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig::new(self.clusters)
            .with_seed(self.seed)
            .with_max_iters(self.max_iters)
            .with_tolerance(self.tolerance)
            .with_n_runs(self.n_runs)
            .with_standardize(self.standardize)
    }

    /// Reject argument combinations that cannot produce a report
    pub fn validate(&self) -> crate::Result<()> {
        if self.top == 0 {
            anyhow::bail!("--top must be at least 1");
        }
        if self.top > self.clusters {
            log::warn!(
                "--top {} exceeds cluster count {}; charting every non-empty cluster",
                self.top,
                self.clusters
            );
        }
        Ok(())
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}
