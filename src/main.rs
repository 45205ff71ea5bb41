//! marketseg: social-media market segmentation CLI
//!
//! Orchestrates data loading, K-Means segmentation and profile chart rendering.

use anyhow::Result;
use clap::Parser;
use log::{debug, info};
use marketseg::{generate_report, largest_profiles, load_observations, segment, Args};
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    args.validate()?;

    let start_time = Instant::now();

    // Step 1: Load data
    info!("Loading observations from {}", args.input.display());
    let table = load_observations(&args.input, args.id_column.as_deref())?;
    info!(
        "Loaded {} users with {} features",
        table.n_rows(),
        table.n_features()
    );
    debug!("Features: {}", table.feature_names.join(", "));

    // Step 2: Segment
    let config = args.segment_config();
    let model_start = Instant::now();
    let segmentation = segment(table, &config)?;
    info!(
        "Fitted {} clusters in {:.2}s (inertia {:.2})",
        config.k,
        model_start.elapsed().as_secs_f64(),
        segmentation.inertia
    );

    // Step 3: Profile and chart the largest clusters
    let profiles = largest_profiles(&segmentation, args.top);
    let written = generate_report(&segmentation, &profiles, &args.output_dir, args.format)?;

    info!(
        "Wrote {} charts to {} in {:.2}s",
        written.len(),
        args.output_dir.display(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
