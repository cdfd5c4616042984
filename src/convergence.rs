//! Stopping rule for the NMF iteration.
//!
//! Instead of thresholding the loss, the solver watches the hard clustering
//! it would report. Every `check_frequency` iterations the current partition
//! of samples is compared with the one from the previous check; once it has
//! survived `max_invariance` consecutive checks unchanged, the run is
//! declared converged.
//!
//! ```text
//!            invariance == max_invariance
//! Running ──────────────────────────────────▶ Converged
//!    │
//!    │       iteration == max_iterations
//!    └──────────────────────────────────────▶ MaxIterationsReached
//! ```
//!
//! The monitor is independent of the update rules: it is fed a partition on
//! demand, which makes it testable with hand-made partitions.

use crate::nmf::NetNmfConfig;
use crate::partition::Partition;

/// Terminal state of a solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Termination {
    /// The partition stayed fixed for `max_invariance` consecutive checks.
    Converged,
    /// The iteration cap was hit first. Not an error.
    MaxIterationsReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Running,
    Done(Termination),
}

/// Iteration state threaded through one solver run.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    check_frequency: usize,
    max_iterations: usize,
    max_invariance: usize,
    iteration: usize,
    reference: Option<Partition>,
    invariance: usize,
    state: MonitorState,
}

impl ConvergenceMonitor {
    /// Fresh monitor for a run. The config is assumed validated.
    pub fn new(config: &NetNmfConfig) -> Self {
        Self {
            check_frequency: config.check_frequency,
            max_iterations: config.max_iterations,
            max_invariance: config.max_invariance,
            iteration: 0,
            reference: None,
            invariance: 0,
            state: MonitorState::Running,
        }
    }

    /// Record one finished iteration.
    ///
    /// `partition` is only called on check iterations. Once a terminal state
    /// is reached, further calls are no-ops that return it again.
    pub fn step_with<F>(&mut self, partition: F) -> MonitorState
    where
        F: FnOnce() -> Partition,
    {
        if self.state != MonitorState::Running {
            return self.state;
        }

        self.iteration += 1;

        if self.iteration % self.check_frequency == 0 {
            self.observe(partition());
        }

        if self.state == MonitorState::Running && self.iteration >= self.max_iterations {
            self.state = MonitorState::Done(Termination::MaxIterationsReached);
        }

        self.state
    }

    fn observe(&mut self, current: Partition) {
        match &self.reference {
            Some(prev) if *prev == current => {
                self.invariance += 1;
            }
            Some(_) => {
                self.invariance = 0;
                self.reference = Some(current);
            }
            // First check: nothing to compare against yet.
            None => {
                self.reference = Some(current);
            }
        }

        log::debug!(
            "iteration {}: {} groups, invariant for {} of {} checks",
            self.iteration,
            self.reference.as_ref().map_or(0, Partition::len),
            self.invariance,
            self.max_invariance
        );

        if self.invariance >= self.max_invariance {
            self.state = MonitorState::Done(Termination::Converged);
        }
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn invariance(&self) -> usize {
        self.invariance
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Partition recorded at the most recent check that changed it.
    pub fn reference(&self) -> Option<&Partition> {
        self.reference.as_ref()
    }
}
