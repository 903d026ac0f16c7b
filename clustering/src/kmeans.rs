//! Lloyd's k-means and the vector metrics it and similarity search use.

use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster index per input point
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f32>>,
    pub iterations: usize
}

/// Cluster `points` into at most `k` groups.
///
/// Centroids start at `k` distinct randomly sampled points; `seed` makes the
/// sampling reproducible. Each iteration assigns every point to its nearest
/// centroid by Euclidean distance, then moves each centroid to the mean of
/// its points. A centroid with no points becomes the zero vector. Stops once
/// no assignment changes or after `max_iterations`.
///
/// `k` is clamped to the number of points; an empty input yields an empty
/// result.
pub fn kmeans(
    points: &[Vec<f32>],
    k: usize,
    max_iterations: usize,
    seed: Option<u64>
) -> KMeansResult {
    let k = k.min(points.len());
    if k == 0 {
        return KMeansResult {
            assignments: Vec::new(),
            centroids: Vec::new(),
            iterations: 0
        };
    }

    let dim = points[0].len();
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or_else(rand::random));
    let mut centroids: Vec<Vec<f32>> = rand::seq::index::sample(&mut rng, points.len(), k)
        .into_iter()
        .map(|i| points[i].clone())
        .collect();

    let mut assignments: Vec<Option<usize>> = vec![None; points.len()];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let mut changed = false;
        for (slot, point) in assignments.iter_mut().zip(points) {
            let nearest = nearest_centroid(point, &centroids);
            if *slot != Some(nearest) {
                *slot = Some(nearest);
                changed = true;
            }
        }
        if !changed {
            break;
        }
        centroids = recompute_centroids(points, &assignments, k, dim);
    }

    KMeansResult {
        assignments: assignments.into_iter().map(Option::unwrap_or_default).collect(),
        centroids,
        iterations
    }
}

fn nearest_centroid(point: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = euclidean_distance(point, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

fn recompute_centroids(
    points: &[Vec<f32>],
    assignments: &[Option<usize>],
    k: usize,
    dim: usize
) -> Vec<Vec<f32>> {
    let mut sums = vec![vec![0.0f32; dim]; k];
    let mut counts = vec![0usize; k];

    for (point, cluster) in points.iter().zip(assignments) {
        let Some(cluster) = *cluster else {
            continue;
        };
        counts[cluster] += 1;
        for (sum, value) in sums[cluster].iter_mut().zip(point) {
            *sum += value;
        }
    }

    for (sum, count) in sums.iter_mut().zip(&counts) {
        if *count > 0 {
            for value in sum.iter_mut() {
                *value /= *count as f32;
            }
        }
    }
    sums
}

/// `f32::MAX` when dimensions differ.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Zero when either vector is empty or has zero norm, or the dimensions
/// differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
