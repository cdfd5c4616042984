//! Network-regularized NMF via multiplicative updates.
//!
//! # The Objective
//!
//! ```text
//! min_{W,H ≥ 0}  ‖X - W H‖²_F  +  λ tr(Wᵀ L W),     L = D - A
//! ```
//!
//! X is n × m (nodes × samples), W is n × k, H is k × m.
//!
//! # Update Rules
//!
//! Splitting the gradient into its non-negative positive and negative parts
//! gives Lee–Seung style multiplicative updates. L itself has negative
//! off-diagonals, so it is split into A (pulls W up toward its neighbours)
//! and D (pulls W down):
//!
//! ```text
//! W ← W ⊙ (X Hᵀ + λ A W) / (W H Hᵀ + λ D W + ε)
//! H ← H ⊙ (Wᵀ X)         / (Wᵀ W H + ε)
//! ```
//!
//! Every factor is a ratio of non-negative quantities, so a strictly positive
//! start stays non-negative without clamping. After each W update its
//! columns are rescaled to sum to one; H soaks up the magnitude of X, which
//! keeps λ on a fixed scale against the reconstruction term.
//!
//! # Failure Modes
//!
//! - **Local optima**: the problem is non-convex; the result depends on the
//!   random start. Pass a seeded RNG for reproducibility.
//! - **Stuck zeros**: an entry that reaches exactly 0 never recovers.
//! - **Overflow**: reported as [`Error::NumericDivergence`].

use ndarray::{Array2, Axis, Zip};
use rand::Rng;

use crate::convergence::{ConvergenceMonitor, MonitorState, Termination};
use crate::partition::{cluster_labels, Partition};
use crate::{laplacian_quadratic_form, Error, Result};

/// Added to every denominator before dividing.
pub const DENOMINATOR_FLOOR: f64 = 1e-15;

/// Parameters for one [`solve`] run. Every field is required.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(deny_unknown_fields)
)]
pub struct NetNmfConfig {
    /// Number of clusters k (rows of H).
    pub cluster_count: usize,
    /// Graph penalty weight λ.
    pub penalty_weight: f64,
    /// Hard cap on iterations.
    pub max_iterations: usize,
    /// Iterations between convergence checks.
    pub check_frequency: usize,
    /// Consecutive unchanged checks needed to stop early.
    pub max_invariance: usize,
}

impl NetNmfConfig {
    /// Check the fields that do not depend on the data shape.
    pub fn validate(&self) -> Result<()> {
        if self.cluster_count == 0 {
            return Err(invalid("cluster_count", "must be >= 1".into()));
        }
        if !self.penalty_weight.is_finite() || self.penalty_weight < 0.0 {
            return Err(invalid(
                "penalty_weight",
                format!("must be finite and >= 0, got {}", self.penalty_weight),
            ));
        }
        if self.check_frequency == 0 {
            return Err(invalid("check_frequency", "must be >= 1".into()));
        }
        if self.max_iterations < self.check_frequency {
            return Err(invalid(
                "max_iterations",
                format!(
                    "must be >= check_frequency ({}), got {}",
                    self.check_frequency, self.max_iterations
                ),
            ));
        }
        if self.max_invariance == 0 {
            return Err(invalid("max_invariance", "must be >= 1".into()));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, message: String) -> Error {
    Error::InvalidParameter { name, message }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct NetNmfFit {
    /// W, n × k, columns summing to one.
    pub basis: Array2<f64>,
    /// H, k × m.
    pub coefficients: Array2<f64>,
    pub termination: Termination,
    pub iterations: usize,
    /// `‖X - WH‖²_F + λ tr(Wᵀ L W)` at the final iterate.
    pub objective: f64,
}

impl NetNmfFit {
    /// Hard cluster label per sample.
    pub fn cluster_labels(&self) -> Vec<usize> {
        cluster_labels(self.coefficients.view())
    }

    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Factor `x` (nodes × samples) and return the coefficient matrix H.
///
/// `laplacian` and `degree` come from [`crate::build_laplacian`]. The RNG
/// draws the initial W and H and is the only source of randomness.
///
/// # Errors
///
/// - [`Error::InvalidParameter`] for a bad config or mismatched inputs,
///   before any iteration runs.
/// - [`Error::NumericDivergence`] if W or H becomes non-finite.
pub fn solve<R: Rng + ?Sized>(
    x: &Array2<f64>,
    laplacian: &Array2<f64>,
    degree: &Array2<f64>,
    config: &NetNmfConfig,
    rng: &mut R,
) -> Result<Array2<f64>> {
    solve_detailed(x, laplacian, degree, config, rng).map(|fit| fit.coefficients)
}

/// Like [`solve`], but also returns W, the terminal state, and the objective.
pub fn solve_detailed<R: Rng + ?Sized>(
    x: &Array2<f64>,
    laplacian: &Array2<f64>,
    degree: &Array2<f64>,
    config: &NetNmfConfig,
    rng: &mut R,
) -> Result<NetNmfFit> {
    config.validate()?;
    let adjacency = check_inputs(x, laplacian, degree, config)?;

    let (n, m) = x.dim();
    let k = config.cluster_count;
    let lambda = config.penalty_weight;

    // (0, 1]: strictly positive so no entry starts stuck at zero.
    let mut w = Array2::from_shape_simple_fn((n, k), || 1.0 - rng.random::<f64>());
    let mut h = Array2::from_shape_simple_fn((k, m), || 1.0 - rng.random::<f64>());
    normalize_columns(&mut w);

    let mut monitor = ConvergenceMonitor::new(config);

    let termination = loop {
        // W step.
        let hht = h.dot(&h.t());
        let mut numer = x.dot(&h.t());
        let mut denom = w.dot(&hht);
        if lambda > 0.0 {
            numer.scaled_add(lambda, &adjacency.dot(&w));
            denom.scaled_add(lambda, &degree.dot(&w));
        }
        multiplicative_update(&mut w, &numer, &denom);
        normalize_columns(&mut w);

        // H step. No graph term: the network only touches node-indexed W.
        let numer = w.t().dot(x);
        let denom = w.t().dot(&w).dot(&h);
        multiplicative_update(&mut h, &numer, &denom);

        if !all_finite(&w) || !all_finite(&h) {
            let iteration = monitor.iteration() + 1;
            log::error!("non-finite factors at iteration {iteration}");
            return Err(Error::NumericDivergence { iteration });
        }
        debug_assert!(w.iter().chain(h.iter()).all(|&v| v >= 0.0));

        match monitor.step_with(|| Partition::from_labels(&cluster_labels(h.view()))) {
            MonitorState::Running => {}
            MonitorState::Done(t) => break t,
        }
    };

    let objective = objective(x, &w, &h, laplacian, lambda);
    let iterations = monitor.iteration();

    match termination {
        Termination::Converged => {
            log::info!("net nmf converged after {iterations} iterations, objective {objective:.6e}")
        }
        Termination::MaxIterationsReached => log::warn!(
            "net nmf stopped at max_iterations ({iterations}) without a stable partition, objective {objective:.6e}"
        ),
    }

    Ok(NetNmfFit {
        basis: w,
        coefficients: h,
        termination,
        iterations,
        objective,
    })
}

/// Shape/sign checks. Returns the adjacency implied by `degree - laplacian`.
fn check_inputs(
    x: &Array2<f64>,
    laplacian: &Array2<f64>,
    degree: &Array2<f64>,
    config: &NetNmfConfig,
) -> Result<Array2<f64>> {
    let (n, m) = x.dim();
    if n == 0 || m == 0 {
        return Err(invalid("x", format!("data matrix is empty: {n} x {m}")));
    }
    if let Some(v) = x.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(invalid(
            "x",
            format!("entries must be finite and non-negative, found {v}"),
        ));
    }
    if laplacian.dim() != (n, n) {
        return Err(invalid(
            "laplacian",
            format!("expected {n} x {n}, got {:?}", laplacian.dim()),
        ));
    }
    if degree.dim() != (n, n) {
        return Err(invalid(
            "degree",
            format!("expected {n} x {n}, got {:?}", degree.dim()),
        ));
    }
    if config.cluster_count > n.min(m) {
        return Err(invalid(
            "cluster_count",
            format!(
                "must be <= min(nodes, samples) = {}, got {}",
                n.min(m),
                config.cluster_count
            ),
        ));
    }

    let adjacency = degree - laplacian;
    if adjacency.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(invalid(
            "laplacian",
            "degree - laplacian must be a non-negative adjacency".into(),
        ));
    }
    Ok(adjacency)
}

/// `target ← target ⊙ numer / (denom + ε)`
fn multiplicative_update(target: &mut Array2<f64>, numer: &Array2<f64>, denom: &Array2<f64>) {
    #[cfg(feature = "parallel")]
    {
        Zip::from(target)
            .and(numer)
            .and(denom)
            .par_for_each(|t, &num, &den| *t *= num / (den + DENOMINATOR_FLOOR));
    }

    #[cfg(not(feature = "parallel"))]
    {
        Zip::from(target)
            .and(numer)
            .and(denom)
            .for_each(|t, &num, &den| *t *= num / (den + DENOMINATOR_FLOOR));
    }
}

/// Scale each column to sum to one. The divisor is floored so an all-zero
/// column stays zero.
fn normalize_columns(w: &mut Array2<f64>) {
    let sums = w.sum_axis(Axis(0));
    for (mut col, &s) in w.columns_mut().into_iter().zip(sums.iter()) {
        let s = s.max(DENOMINATOR_FLOOR);
        col.mapv_inplace(|v| v / s);
    }
}

fn all_finite(a: &Array2<f64>) -> bool {
    a.iter().all(|v| v.is_finite())
}

fn objective(x: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>, lap: &Array2<f64>, lambda: f64) -> f64 {
    let residual = x - &w.dot(h);
    let fit = residual.iter().map(|r| r * r).sum::<f64>();
    let smoothness: f64 = w
        .columns()
        .into_iter()
        .map(|col| laplacian_quadratic_form(lap, col))
        .sum();
    fit + lambda * smoothness
}
