//! Cluster ranking and feature-mean profiles

use crate::model::Segmentation;
use ndarray::Axis;

/// Mean feature vector of one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProfile {
    /// Cluster id as assigned by the segmenter
    pub cluster: usize,
    /// Number of member rows
    pub size: usize,
    /// Per-feature mean of the raw counts, in table column order
    pub means: Vec<f64>,
}

impl ClusterProfile {
    /// The `n` features with the highest mean, largest first
    pub fn top_features<'a>(&self, feature_names: &'a [String], n: usize) -> Vec<(&'a str, f64)> {
        let mut pairs: Vec<(&str, f64)> = feature_names
            .iter()
            .map(String::as_str)
            .zip(self.means.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs.truncate(n);
        pairs
    }
}

/// Non-empty clusters as `(cluster, size)`, largest first
///
/// Equal sizes are ordered by ascending cluster id.
pub fn rank_clusters(segmentation: &Segmentation) -> Vec<(usize, usize)> {
    let mut ranking: Vec<(usize, usize)> = segmentation
        .cluster_sizes()
        .into_iter()
        .enumerate()
        .filter(|&(_, size)| size > 0)
        .collect();
    ranking.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranking
}

/// Feature means over the rows assigned to `cluster`
///
/// Returns `None` for an empty or out-of-range cluster.
pub fn cluster_profile(segmentation: &Segmentation, cluster: usize) -> Option<ClusterProfile> {
    let members: Vec<usize> = segmentation
        .labels
        .iter()
        .enumerate()
        .filter(|&(_, &label)| label == cluster)
        .map(|(row, _)| row)
        .collect();

    let means = segmentation
        .table
        .features
        .select(Axis(0), &members)
        .mean_axis(Axis(0))?;

    Some(ClusterProfile {
        cluster,
        size: members.len(),
        means: means.to_vec(),
    })
}

/// Profiles of the `top` largest clusters, in ranked order
pub fn largest_profiles(segmentation: &Segmentation, top: usize) -> Vec<ClusterProfile> {
    rank_clusters(segmentation)
        .into_iter()
        .take(top)
        .filter_map(|(cluster, _)| cluster_profile(segmentation, cluster))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ObservationTable;
    use crate::model::{segment, SegmentConfig};
    use ndarray::array;

    fn create_segmentation() -> Segmentation {
        // Three groups of sizes 4, 2 and 1
        let features = array![
            [10.0, 0.0],
            [11.0, 1.0],
            [9.0, 0.0],
            [10.0, 1.0],
            [0.0, 10.0],
            [1.0, 11.0],
            [50.0, 50.0],
        ];
        let ids = (0..7).map(|i| i.to_string()).collect();
        let table =
            ObservationTable::new(vec!["travel".into(), "fitness".into()], ids, features).unwrap();
        segment(table, &SegmentConfig::new(3)).unwrap()
    }

    #[test]
    fn test_rank_clusters() {
        let seg = create_segmentation();
        let ranking = rank_clusters(&seg);

        let sizes: Vec<usize> = ranking.iter().map(|&(_, size)| size).collect();
        assert_eq!(sizes, vec![4, 2, 1]);
        assert_eq!(ranking[0].0, seg.labels[0]);
        assert_eq!(ranking[2].0, seg.labels[6]);
    }

    #[test]
    fn test_cluster_profile_means() {
        let seg = create_segmentation();
        let profile = cluster_profile(&seg, seg.labels[0]).unwrap();

        assert_eq!(profile.size, 4);
        assert_eq!(profile.means, vec![10.0, 0.5]);
    }

    #[test]
    fn test_cluster_profile_out_of_range() {
        let seg = create_segmentation();
        assert!(cluster_profile(&seg, 7).is_none());
    }

    #[test]
    fn test_largest_profiles() {
        let seg = create_segmentation();

        let profiles = largest_profiles(&seg, 2);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].size, 4);
        assert_eq!(profiles[1].size, 2);
        assert!(profiles.iter().all(|p| p.means.len() == 2));

        // Asking for more than exist yields every non-empty cluster
        assert_eq!(largest_profiles(&seg, 10).len(), 3);
    }

    #[test]
    fn test_top_features() {
        let names: Vec<String> = ["cooking", "politics", "health"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let profile = ClusterProfile {
            cluster: 0,
            size: 3,
            means: vec![1.5, 4.0, 2.0],
        };

        let top = profile.top_features(&names, 2);
        assert_eq!(top, vec![("politics", 4.0), ("health", 2.0)]);
    }
}
