//! Bar chart rendering of cluster profiles using Plotters

use crate::model::Segmentation;
use crate::report::{rank_clusters, ClusterProfile};
use anyhow::Context;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const PROFILE_CHART_SIZE: (u32, u32) = (1200, 800);
const SIZE_CHART_SIZE: (u32, u32) = (800, 500);

/// Number of leading features listed per cluster in the console summary
const SUMMARY_TOP_FEATURES: usize = 5;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChartFormat::Png => "png",
            ChartFormat::Svg => "svg",
        }
    }
}

/// Render one cluster's feature means as a bar chart
///
/// # Arguments
/// * `profile` - Cluster profile to draw
/// * `feature_names` - Bar labels, same order as `profile.means`
/// * `output_path` - File to write
/// * `format` - PNG or SVG
pub fn render_profile(
    profile: &ClusterProfile,
    feature_names: &[String],
    output_path: &Path,
    format: ChartFormat,
) -> crate::Result<()> {
    if profile.means.len() != feature_names.len() {
        anyhow::bail!(
            "Profile has {} means for {} feature names",
            profile.means.len(),
            feature_names.len()
        );
    }

    match format {
        ChartFormat::Png => draw_profile(
            BitMapBackend::new(output_path, PROFILE_CHART_SIZE).into_drawing_area(),
            profile,
            feature_names,
        ),
        ChartFormat::Svg => draw_profile(
            SVGBackend::new(output_path, PROFILE_CHART_SIZE).into_drawing_area(),
            profile,
            feature_names,
        ),
    }
    .with_context(|| format!("Failed to render {}", output_path.display()))
}

fn draw_profile<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    profile: &ClusterProfile,
    feature_names: &[String],
) -> crate::Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let n_features = feature_names.len();
    let (y_min, y_max) = value_range(&profile.means);
    let title = format!(
        "Feature Means for Cluster {} (Size: {})",
        profile.cluster, profile.size
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(140)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n_features).into_segmented(), y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n_features)
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(i) => feature_names.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .x_label_style(
            ("sans-serif", 13)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_desc("Mean Value")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let color = Palette99::pick(profile.cluster);
    chart.draw_series(
        Histogram::vertical(&chart)
            .style(color.filled())
            .margin(3)
            .data(profile.means.iter().copied().enumerate()),
    )?;

    root.present()?;
    Ok(())
}

/// Render member counts of every non-empty cluster, largest first
pub fn render_cluster_sizes(
    segmentation: &Segmentation,
    output_path: &Path,
    format: ChartFormat,
) -> crate::Result<()> {
    let ranking = rank_clusters(segmentation);

    match format {
        ChartFormat::Png => draw_cluster_sizes(
            BitMapBackend::new(output_path, SIZE_CHART_SIZE).into_drawing_area(),
            &ranking,
        ),
        ChartFormat::Svg => draw_cluster_sizes(
            SVGBackend::new(output_path, SIZE_CHART_SIZE).into_drawing_area(),
            &ranking,
        ),
    }
    .with_context(|| format!("Failed to render {}", output_path.display()))
}

fn draw_cluster_sizes<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    ranking: &[(usize, usize)],
) -> crate::Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let max_size = ranking.iter().map(|&(_, size)| size).max().unwrap_or(1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption("Cluster Sizes", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..ranking.len()).into_segmented(), 0f64..(max_size * 1.1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(ranking.len())
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(rank) => ranking
                .get(*rank)
                .map(|(cluster, _)| cluster.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc("Cluster ID")
        .y_desc("Number of Users")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(ranking.iter().enumerate().map(|(rank, &(cluster, size))| {
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(rank), 0.0),
                (SegmentValue::Exact(rank + 1), size as f64),
            ],
            Palette99::pick(cluster).filled(),
        );
        bar.set_margin(0, 0, 5, 5);
        bar
    }))?;

    root.present()?;
    Ok(())
}

/// Print size, share and leading features of each cluster to stdout
pub fn print_cluster_statistics(segmentation: &Segmentation, profiles: &[ClusterProfile]) {
    let total = segmentation.table.n_rows();

    println!("\n=== Cluster Statistics ===");
    println!("Number of clusters: {}", segmentation.k());
    println!("Total users: {}", total);
    println!("Features: {}", segmentation.table.n_features());
    println!(
        "Within-cluster sum of squares (Inertia): {:.2}",
        segmentation.inertia
    );
    println!(
        "Silhouette score (sample): {:.3}",
        segmentation.silhouette_sample(1000)
    );

    println!("\nCluster sizes (largest first):");
    for (cluster, size) in rank_clusters(segmentation) {
        let percentage = (size as f64 / total as f64) * 100.0;
        println!("  Cluster {:2}: {:6} users ({:.1}%)", cluster, size, percentage);
    }

    println!("\nLeading features per visualized cluster:");
    for profile in profiles {
        let leading = profile
            .top_features(&segmentation.table.feature_names, SUMMARY_TOP_FEATURES)
            .into_iter()
            .map(|(name, mean)| format!("{} {:.2}", name, mean))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  Cluster {:2} (n={}): {}", profile.cluster, profile.size, leading);
    }
}

/// Render every profile plus the size chart into `output_dir`
///
/// # Returns
/// * Paths of the written chart files, profiles first in ranked order
pub fn generate_report(
    segmentation: &Segmentation,
    profiles: &[ClusterProfile],
    output_dir: &Path,
    format: ChartFormat,
) -> crate::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut written = Vec::with_capacity(profiles.len() + 1);

    for (rank, profile) in profiles.iter().enumerate() {
        let path = output_dir.join(format!(
            "cluster_{:02}_id{}.{}",
            rank + 1,
            profile.cluster,
            format.extension()
        ));
        render_profile(profile, &segmentation.table.feature_names, &path, format)?;
        info!(
            "Cluster {} profile (size {}) saved to: {}",
            profile.cluster,
            profile.size,
            path.display()
        );
        written.push(path);
    }

    let sizes_path = output_dir.join(format!("cluster_sizes.{}", format.extension()));
    render_cluster_sizes(segmentation, &sizes_path, format)?;
    info!("Cluster size chart saved to: {}", sizes_path.display());
    written.push(sizes_path);

    print_cluster_statistics(segmentation, profiles);

    Ok(written)
}

/// Y-axis bounds that always include zero and leave headroom above the tallest bar
fn value_range(values: &[f64]) -> (f64, f64) {
    let max = values.iter().copied().fold(0.0, f64::max);
    let min = values.iter().copied().fold(0.0, f64::min);
    let max = if max > 0.0 { max * 1.1 } else { 1.0 };
    (min * 1.1, max)
}
