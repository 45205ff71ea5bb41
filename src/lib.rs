//! marketseg: market segmentation of social-media users using K-Means clustering
//!
//! Loads per-user activity counts, partitions users into segments and renders
//! the feature-mean profile of the largest segments as bar charts.

pub mod cli;
pub mod data;
pub mod error;
pub mod model;
pub mod report;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_observations, ObservationTable};
pub use error::{LoadError, SegmentError};
pub use model::{segment, SegmentConfig, Segmentation};
pub use report::{cluster_profile, largest_profiles, rank_clusters, ClusterProfile};
pub use viz::{generate_report, ChartFormat};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
