//! Mini-batch k-means over pickup coordinates.
//!
//! k-means++ seeding followed by mini-batch centroid updates with a
//! per-centroid learning rate of `1 / count`. With a seed the result depends
//! only on the seed and the input order; without one the RNG is seeded from
//! OS entropy and repeated runs may partition the city differently.

use crate::core::Coordinate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Mini-batch k-means configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniBatchKMeansConfig {
    /// Number of clusters
    pub k: usize,
    /// Points drawn per update step; at or above `n` every step uses all points
    pub batch_size: usize,
    /// Maximum update steps
    pub max_iter: usize,
    /// Convergence threshold on the largest centroid shift
    pub tolerance: f64,
    /// Random seed for initialization and batch sampling
    pub seed: Option<u64>,
}

impl Default for MiniBatchKMeansConfig {
    fn default() -> Self {
        Self {
            k: 8,
            batch_size: 1024,
            max_iter: 100,
            tolerance: 1e-6,
            seed: None,
        }
    }
}

impl MiniBatchKMeansConfig {
    /// Set number of clusters.
    pub fn k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    /// Set mini-batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set maximum iterations.
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Mini-batch k-means result.
#[derive(Debug, Clone)]
pub struct MiniBatchKMeansResult {
    /// Cluster of each input point
    pub labels: Vec<usize>,
    /// Centroids in ascending (latitude, longitude) order
    pub centroids: Vec<Coordinate>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    /// Number of update steps performed
    pub n_iter: usize,
}

impl MiniBatchKMeansResult {
    /// Get the size of each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Cluster coordinates into at most `config.k` groups.
///
/// The effective k is capped at the number of distinct points, so duplicate
/// coordinates never produce duplicate centroids.
pub fn minibatch_kmeans(points: &[Coordinate], config: &MiniBatchKMeansConfig) -> MiniBatchKMeansResult {
    let n = points.len();
    if n == 0 || config.k == 0 {
        return MiniBatchKMeansResult {
            labels: Vec::new(),
            centroids: Vec::new(),
            inertia: 0.0,
            n_iter: 0,
        };
    }

    let mut rng = config.rng();
    let mut centroids = initialize_centroids(points, config.k, &mut rng);
    let k = centroids.len();

    let mut counts = vec![0usize; k];
    let mut batch = Vec::with_capacity(config.batch_size.min(n));
    let mut nearest = Vec::with_capacity(config.batch_size.min(n));
    let mut n_iter = 0;

    for iter in 0..config.max_iter {
        n_iter = iter + 1;

        batch.clear();
        if config.batch_size >= n {
            batch.extend(0..n);
        } else {
            batch.extend((0..config.batch_size).map(|_| rng.gen_range(0..n)));
        }

        // Assign against the centroids as they stood at the start of the step
        nearest.clear();
        nearest.extend(batch.iter().map(|&i| find_nearest_centroid(&points[i], &centroids).0));

        let previous = centroids.clone();
        for (&i, &c) in batch.iter().zip(nearest.iter()) {
            counts[c] += 1;
            let eta = 1.0 / counts[c] as f64;
            let centroid = &mut centroids[c];
            centroid.latitude += eta * (points[i].latitude - centroid.latitude);
            centroid.longitude += eta * (points[i].longitude - centroid.longitude);
        }

        let max_shift = previous
            .iter()
            .zip(centroids.iter())
            .map(|(a, b)| a.distance(b))
            .fold(0.0, f64::max);
        log::debug!("mini-batch k-means step {n_iter}: max centroid shift {max_shift:.3e}");

        if max_shift < config.tolerance {
            break;
        }
    }

    centroids.sort_by(compare_coordinates);

    let mut labels = Vec::with_capacity(n);
    let mut inertia = 0.0;
    for p in points {
        let (label, dist) = find_nearest_centroid(p, &centroids);
        labels.push(label);
        inertia += dist;
    }

    MiniBatchKMeansResult {
        labels,
        centroids,
        inertia,
        n_iter,
    }
}

/// Initialize centroids using k-means++ (D² sampling).
fn initialize_centroids(points: &[Coordinate], k: usize, rng: &mut StdRng) -> Vec<Coordinate> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)]);

    let mut distances: Vec<f64> = points
        .iter()
        .map(|p| p.squared_distance(&centroids[0]))
        .collect();

    while centroids.len() < k {
        let sum: f64 = distances.iter().sum();
        if sum <= 0.0 {
            // Every point coincides with a centroid already
            break;
        }

        let threshold = rng.gen::<f64>() * sum;
        let mut cumsum = 0.0;
        let mut selected = None;
        for (i, &d) in distances.iter().enumerate() {
            if d <= 0.0 {
                continue;
            }
            selected = Some(i);
            cumsum += d;
            if cumsum > threshold {
                break;
            }
        }
        let Some(selected) = selected else { break };

        let chosen = points[selected];
        centroids.push(chosen);
        for (d, p) in distances.iter_mut().zip(points.iter()) {
            *d = d.min(p.squared_distance(&chosen));
        }
    }

    centroids
}

/// Nearest centroid and its squared distance; ties go to the lowest index.
pub(crate) fn find_nearest_centroid(point: &Coordinate, centroids: &[Coordinate]) -> (usize, f64) {
    let mut min_dist = f64::INFINITY;
    let mut nearest = 0;

    for (i, centroid) in centroids.iter().enumerate() {
        let dist = point.squared_distance(centroid);
        if dist < min_dist {
            min_dist = dist;
            nearest = i;
        }
    }

    (nearest, min_dist)
}

fn compare_coordinates(a: &Coordinate, b: &Coordinate) -> Ordering {
    a.latitude
        .total_cmp(&b.latitude)
        .then(a.longitude.total_cmp(&b.longitude))
}

/// Elbow method helper: inertia for `k = 1..=max_k`.
pub fn elbow_inertias(points: &[Coordinate], max_k: usize, seed: u64) -> Vec<f64> {
    (1..=max_k.min(points.len()))
        .map(|k| {
            let config = MiniBatchKMeansConfig::default().k(k).seed(seed);
            minibatch_kmeans(points, &config).inertia
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn generate_cluster_data() -> Vec<Coordinate> {
        vec![
            // Downtown
            Coordinate::new(40.70, -74.01),
            Coordinate::new(40.71, -74.00),
            Coordinate::new(40.705, -74.005),
            // Uptown
            Coordinate::new(40.85, -73.93),
            Coordinate::new(40.86, -73.94),
            Coordinate::new(40.855, -73.935),
        ]
    }

    // ==================== minibatch_kmeans ====================

    #[test]
    fn finds_clusters() {
        let data = generate_cluster_data();
        let config = MiniBatchKMeansConfig::default().k(2).seed(42);
        let result = minibatch_kmeans(&data, &config);

        assert_eq!(result.labels.len(), 6);
        assert_eq!(result.centroids.len(), 2);

        // Centroids are ordered by latitude, so downtown is cluster 0
        assert!(result.labels[..3].iter().all(|&l| l == 0));
        assert!(result.labels[3..].iter().all(|&l| l == 1));
        assert_relative_eq!(result.centroids[0].latitude, 40.705, epsilon = 1e-3);
        assert_relative_eq!(result.centroids[1].latitude, 40.855, epsilon = 1e-3);
    }

    #[test]
    fn seeded_runs_are_identical() {
        let data = generate_cluster_data();
        let config = MiniBatchKMeansConfig::default().k(3).batch_size(2).seed(7);
        let a = minibatch_kmeans(&data, &config);
        let b = minibatch_kmeans(&data, &config);

        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.n_iter, b.n_iter);
    }

    #[test]
    fn k_capped_by_distinct_points() {
        let data = vec![
            Coordinate::new(40.71, -74.0),
            Coordinate::new(40.71, -74.0),
            Coordinate::new(40.90, -73.8),
        ];
        let config = MiniBatchKMeansConfig::default().k(5).seed(1);
        let result = minibatch_kmeans(&data, &config);

        assert_eq!(result.centroids.len(), 2);
        assert_eq!(result.labels, vec![0, 0, 1]);
        assert_relative_eq!(result.inertia, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn single_cluster_centroid_is_mean() {
        let data = generate_cluster_data();
        let config = MiniBatchKMeansConfig::default().k(1).seed(3);
        let result = minibatch_kmeans(&data, &config);

        let mean_lat = data.iter().map(|p| p.latitude).sum::<f64>() / data.len() as f64;
        assert!(result.labels.iter().all(|&l| l == 0));
        assert_relative_eq!(result.centroids[0].latitude, mean_lat, epsilon = 1e-9);
    }

    #[test]
    fn empty_input() {
        let result = minibatch_kmeans(&[], &MiniBatchKMeansConfig::default());
        assert!(result.labels.is_empty());
        assert!(result.centroids.is_empty());
        assert_eq!(result.n_iter, 0);
    }

    #[test]
    fn sampled_batches_still_separate_clusters() {
        let mut data = Vec::new();
        for i in 0..200 {
            let jitter = (i % 10) as f64 * 1e-4;
            data.push(Coordinate::new(40.70 + jitter, -74.01 + jitter));
            data.push(Coordinate::new(40.85 - jitter, -73.93 - jitter));
        }
        let config = MiniBatchKMeansConfig::default().k(2).batch_size(32).seed(11);
        let result = minibatch_kmeans(&data, &config);

        assert_eq!(result.cluster_sizes(), vec![200, 200]);
    }

    // ==================== helpers ====================

    #[test]
    fn nearest_centroid_ties_go_to_lowest_index() {
        let centroids = vec![Coordinate::new(0.0, -1.0), Coordinate::new(0.0, 1.0)];
        let (idx, dist) = find_nearest_centroid(&Coordinate::new(0.0, 0.0), &centroids);
        assert_eq!(idx, 0);
        assert_relative_eq!(dist, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn elbow_inertias_decreasing() {
        let data = generate_cluster_data();
        let inertias = elbow_inertias(&data, 4, 42);

        assert_eq!(inertias.len(), 4);
        assert!(inertias[1] < inertias[0]);
    }

    #[test]
    fn config_builder() {
        let config = MiniBatchKMeansConfig::default()
            .k(5)
            .batch_size(64)
            .max_iter(50)
            .tolerance(1e-3)
            .seed(123);

        assert_eq!(config.k, 5);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.max_iter, 50);
        assert_eq!(config.tolerance, 1e-3);
        assert_eq!(config.seed, Some(123));
        assert_eq!(MiniBatchKMeansConfig::default().k(0).k, 1);
    }
}
