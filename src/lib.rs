//! # netnmf
//!
//! Network-regularized non-negative matrix factorization: cluster samples whose
//! features live on the nodes of a known graph.
//!
//! ## The Core Idea
//!
//! Plain NMF factors a non-negative n × m matrix X into W (n × k) and H (k × m).
//! When the n rows of X are nodes of a graph (genes in an interaction network,
//! say), we also want rows of W that are connected in the graph to look alike.
//! The graph Laplacian L = D - A measures exactly that:
//!
//! ```text
//! tr(Wᵀ L W) = (1/2) Σ_c Σ_{ij} A_{ij} (W_ic - W_jc)²
//! ```
//!
//! so the solver minimises `‖X - WH‖²_F + λ tr(Wᵀ L W)` over W, H ≥ 0.
//! Each sample (column of H) is then assigned to its dominant row.
//!
//! ## Key Functions
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`build_laplacian`] | Checked (D, L) from a symmetric binary adjacency |
//! | [`nmf::solve`] | Regularized NMF, returns H |
//! | [`nmf::solve_detailed`] | Same, plus W, termination state, objective |
//! | [`partition::cluster_labels`] | Argmax label per sample |
//! | [`partition::same_partition`] | Compare clusterings up to relabelling |
//!
//! ## Quick Start
//!
//! ```rust
//! use netnmf::{build_laplacian, nmf::{solve, NetNmfConfig}, partition::cluster_labels};
//! use ndarray::array;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Path graph: 0 -- 1 -- 2
//! let adj = array![
//!     [0.0, 1.0, 0.0],
//!     [1.0, 0.0, 1.0],
//!     [0.0, 1.0, 0.0]
//! ];
//! let (degree, lap) = build_laplacian(&adj).unwrap();
//!
//! let x = array![[1.0, 0.0, 1.0], [1.0, 0.1, 1.0], [0.0, 2.0, 0.1]];
//! let config = NetNmfConfig {
//!     cluster_count: 2,
//!     penalty_weight: 0.1,
//!     max_iterations: 500,
//!     check_frequency: 10,
//!     max_invariance: 5,
//! };
//! let mut rng = StdRng::seed_from_u64(7);
//! let h = solve(&x, &lap, &degree, &config, &mut rng).unwrap();
//! assert_eq!(cluster_labels(h.view()).len(), 3);
//! ```
//!
//! ## What Can Go Wrong
//!
//! 1. **Asymmetric or weighted adjacency**: rejected by [`build_laplacian`].
//!    Use [`adjacency_to_laplacian`] directly if you know what you are doing.
//! 2. **Penalty too large**: λ·D·W swamps the reconstruction term and every
//!    column of W collapses toward a graph-constant vector. Clusters blur.
//! 3. **Overflow**: huge data values push the updates to infinity; the solver
//!    stops with [`Error::NumericDivergence`] instead of returning garbage.
//! 4. **Scaling**: O(n²) storage for the dense degree and Laplacian matrices.
//!
//! ## References
//!
//! - Lee & Seung (2001). "Algorithms for Non-negative Matrix Factorization"
//! - Cai, He, Han, Huang (2011). "Graph Regularized Nonnegative Matrix
//!   Factorization for Data Representation"
//! - Hofree, Shen, Carter, Gross, Ideker (2013). "Network-based stratification
//!   of tumor mutations"

use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

pub mod convergence;
pub mod nmf;
pub mod partition;
pub mod synth;

pub use convergence::{ConvergenceMonitor, MonitorState, Termination};
pub use nmf::{solve, solve_detailed, NetNmfConfig, NetNmfFit};
pub use partition::{cluster_index_lists, cluster_labels, same_partition, Partition};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("non-finite values after {iteration} iterations")]
    NumericDivergence { iteration: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

fn ensure_square(a: &Array2<f64>) -> Result<usize> {
    let (n, m) = a.dim();
    if n != m {
        return Err(Error::InvalidGraph(format!(
            "adjacency matrix is not square: {n} x {m}"
        )));
    }
    Ok(n)
}

/// Compute degree matrix D from adjacency matrix A.
///
/// D[i,i] = sum of row i (number of edges at node i)
pub fn degree_matrix(adj: &Array2<f64>) -> Array2<f64> {
    Array2::from_diag(&degree_vector(adj))
}

/// Compute degree vector from adjacency matrix.
pub fn degree_vector(adj: &Array2<f64>) -> Array1<f64> {
    adj.sum_axis(Axis(1))
}

/// Unnormalized Laplacian: L = D - A
///
/// No validation; see [`build_laplacian`] for the checked version.
///
/// # Example
///
/// ```rust
/// use netnmf::adjacency_to_laplacian;
/// use ndarray::array;
///
/// let adj = array![[0.0, 1.0], [1.0, 0.0]];
/// let lap = adjacency_to_laplacian(&adj);
/// assert!((lap[[0,0]] - 1.0).abs() < 1e-10);  // degree
/// assert!((lap[[0,1]] + 1.0).abs() < 1e-10);  // -adjacency
/// ```
pub fn adjacency_to_laplacian(adj: &Array2<f64>) -> Array2<f64> {
    let d = degree_matrix(adj);
    &d - adj
}

/// Build `(degree, laplacian)` from a symmetric binary adjacency matrix.
///
/// # Errors
///
/// [`Error::InvalidGraph`] if `adj` is not square, not symmetric, or has an
/// entry other than exactly `0.0` or `1.0`. Self-loops are accepted.
///
/// # Properties
///
/// - Both outputs are symmetric
/// - Every row of the Laplacian sums to zero
/// - x^T L x = (1/2) Σ_{ij} A_{ij} (x_i - x_j)² ≥ 0
pub fn build_laplacian(adj: &Array2<f64>) -> Result<(Array2<f64>, Array2<f64>)> {
    let n = ensure_square(adj)?;

    for i in 0..n {
        for j in 0..n {
            let a = adj[[i, j]];
            if a != 0.0 && a != 1.0 {
                return Err(Error::InvalidGraph(format!(
                    "entry ({i}, {j}) = {a} is not binary"
                )));
            }
            if j > i && a != adj[[j, i]] {
                return Err(Error::InvalidGraph(format!(
                    "adjacency is not symmetric at ({i}, {j})"
                )));
            }
        }
    }

    let degree = degree_matrix(adj);
    let laplacian = &degree - adj;

    debug_assert!(laplacian
        .rows()
        .into_iter()
        .all(|row| row.sum() == 0.0));

    log::debug!(
        "built laplacian: {} nodes, {} edge endpoints",
        n,
        degree.diag().sum()
    );

    Ok((degree, laplacian))
}

/// Compute Laplacian quadratic form: x^T L x
///
/// For unnormalized Laplacian:
/// x^T L x = (1/2) Σ_{ij} A_{ij} (x_i - x_j)²
///
/// This measures how "smooth" x is over the graph.
pub fn laplacian_quadratic_form(lap: &Array2<f64>, x: ArrayView1<'_, f64>) -> f64 {
    let lx = lap.dot(&x);
    x.dot(&lx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    #[test]
    fn test_laplacian_basic() {
        // Path graph: 0 -- 1 -- 2
        let adj = array![[0.0, 1.0, 0.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0]];

        let (degree, lap) = build_laplacian(&adj).unwrap();

        // Diagonal = degrees
        assert_eq!(degree[[0, 0]], 1.0);
        assert_eq!(degree[[1, 1]], 2.0);
        assert_eq!(degree[[2, 2]], 1.0);
        assert_eq!(degree[[0, 1]], 0.0);

        assert_eq!(lap[[1, 1]], 2.0);
        // Off-diagonal = -adjacency
        assert_eq!(lap[[0, 1]], -1.0);
        assert_eq!(lap[[0, 2]], 0.0);
    }

    #[test]
    fn test_laplacian_row_sum_zero() {
        let adj = array![[0.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0]];

        let (_, lap) = build_laplacian(&adj).unwrap();

        for i in 0..3 {
            let row_sum: f64 = lap.row(i).sum();
            assert!(row_sum.abs() < 1e-10, "Row {} sum: {}", i, row_sum);
        }
    }

    #[test]
    fn test_self_loop_accepted() {
        let adj = array![[1.0, 1.0], [1.0, 0.0]];
        let (degree, lap) = build_laplacian(&adj).unwrap();
        assert_eq!(degree[[0, 0]], 2.0);
        assert_eq!(lap[[0, 0]], 1.0);
        assert_eq!(lap.row(0).sum(), 0.0);
    }

    #[test]
    fn test_rejects_asymmetric() {
        let adj = array![[0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        match build_laplacian(&adj) {
            Err(Error::InvalidGraph(msg)) => assert!(msg.contains("symmetric"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_square() {
        let adj = Array2::<f64>::zeros((2, 3));
        assert!(matches!(build_laplacian(&adj), Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn test_rejects_weighted_and_nan() {
        let weighted = array![[0.0, 0.5], [0.5, 0.0]];
        assert!(matches!(build_laplacian(&weighted), Err(Error::InvalidGraph(_))));

        let nan = array![[0.0, f64::NAN], [f64::NAN, 0.0]];
        assert!(matches!(build_laplacian(&nan), Err(Error::InvalidGraph(_))));
    }

    #[test]
    fn test_empty_graph() {
        let adj = Array2::<f64>::zeros((0, 0));
        let (degree, lap) = build_laplacian(&adj).unwrap();
        assert_eq!(degree.dim(), (0, 0));
        assert_eq!(lap.dim(), (0, 0));
    }

    #[test]
    fn test_unchecked_matches_checked() {
        let adj = array![[0.0, 1.0, 1.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let (_, lap) = build_laplacian(&adj).unwrap();
        assert_eq!(lap, adjacency_to_laplacian(&adj));
    }

    #[test]
    fn test_quadratic_form() {
        let adj = array![[0.0, 1.0], [1.0, 0.0]];
        let lap = adjacency_to_laplacian(&adj);

        // Constant vector: x^T L x = 0
        let ones = array![1.0, 1.0];
        let qf = laplacian_quadratic_form(&lap, ones.view());
        assert!(qf.abs() < 1e-10);

        // Non-constant: x^T L x > 0
        let non_const = array![1.0, -1.0];
        let qf = laplacian_quadratic_form(&lap, non_const.view());
        assert!(qf > 0.0);
    }

    proptest! {
        #[test]
        fn prop_laplacian_symmetric_with_zero_row_sums(
            n in 1usize..20,
            bits in prop::collection::vec(any::<bool>(), 1..400),
        ) {
            let mut adj = Array2::<f64>::zeros((n, n));
            let mut it = bits.into_iter();
            for i in 0..n {
                for j in i..n {
                    let e = if it.next().unwrap_or(false) { 1.0 } else { 0.0 };
                    adj[[i, j]] = e;
                    adj[[j, i]] = e;
                }
            }

            let (degree, lap) = build_laplacian(&adj).unwrap();

            for i in 0..n {
                prop_assert_eq!(lap.row(i).sum(), 0.0);
                prop_assert_eq!(degree[[i, i]], adj.row(i).sum());
                for j in 0..n {
                    prop_assert_eq!(lap[[i, j]], lap[[j, i]]);
                }
            }
        }

        #[test]
        fn prop_quadratic_form_non_negative(
            n in 2usize..15,
            bits in prop::collection::vec(any::<bool>(), 1..200),
            x in prop::collection::vec(-1.0f64..1.0, 15),
        ) {
            let mut adj = Array2::<f64>::zeros((n, n));
            let mut it = bits.into_iter();
            for i in 0..n {
                for j in (i + 1)..n {
                    let e = if it.next().unwrap_or(false) { 1.0 } else { 0.0 };
                    adj[[i, j]] = e;
                    adj[[j, i]] = e;
                }
            }
            let (_, lap) = build_laplacian(&adj).unwrap();
            let xv = Array1::from_iter(x.into_iter().take(n));
            prop_assert!(laplacian_quadratic_form(&lap, xv.view()) >= -1e-9);
        }
    }
}
