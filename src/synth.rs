//! Synthetic inputs for tests and benchmarks.

use ndarray::Array2;
use rand::Rng;

/// Random symmetric binary adjacency over `n` nodes.
///
/// Draws `draws` node pairs uniformly; pairs with `i == j` are skipped and
/// repeated pairs collapse, so the edge count is approximate. The diagonal is
/// always zero.
pub fn random_network<R: Rng + ?Sized>(n: usize, draws: usize, rng: &mut R) -> Array2<f64> {
    let mut adj = Array2::zeros((n, n));
    if n == 0 {
        return adj;
    }
    for _ in 0..draws {
        let i = rng.random_range(0..n);
        let j = rng.random_range(0..n);
        if i != j {
            adj[[i, j]] = 1.0;
            adj[[j, i]] = 1.0;
        }
    }
    adj
}

/// k × m indicator matrix with a single 1 per column at row `labels[j]`.
///
/// # Panics
///
/// If any label is `>= k`.
pub fn one_hot(labels: &[usize], k: usize) -> Array2<f64> {
    let mut h = Array2::zeros((k, labels.len()));
    for (j, &label) in labels.iter().enumerate() {
        h[[label, j]] = 1.0;
    }
    h
}
