//! Hard cluster labels and label-invariant comparison of clusterings.
//!
//! NMF numbers its clusters arbitrarily: two runs that find the same groups
//! can call them `[0, 0, 1]` and `[1, 1, 0]`. Comparing raw label arrays is
//! therefore meaningless. A [`Partition`] forgets the numbering and keeps only
//! which sample indices travel together.

use std::collections::BTreeMap;

use ndarray::ArrayView2;

/// Row index of the largest entry in each column of `h`.
///
/// Ties go to the lowest row index. NaN entries never win.
pub fn cluster_labels(h: ArrayView2<'_, f64>) -> Vec<usize> {
    h.columns()
        .into_iter()
        .map(|col| {
            let mut best = 0;
            let mut best_val = f64::NEG_INFINITY;
            for (r, &v) in col.iter().enumerate() {
                if v > best_val {
                    best_val = v;
                    best = r;
                }
            }
            best
        })
        .collect()
}

/// Grouping of sample indices by shared label.
///
/// Each group is ascending; groups are ordered by their first member. Two
/// label vectors describe the same clustering exactly when their partitions
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    groups: Vec<Vec<usize>>,
}

impl Partition {
    pub fn from_labels(labels: &[usize]) -> Self {
        let mut by_label: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in labels.iter().enumerate() {
            by_label.entry(label).or_default().push(idx);
        }

        // Indices are pushed in order, so each group is already sorted and
        // non-empty.
        let mut groups: Vec<Vec<usize>> = by_label.into_values().collect();
        groups.sort_by_key(|g| g[0]);

        Self { groups }
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<Vec<usize>> {
        self.groups
    }

    /// Number of non-empty groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of samples covered.
    pub fn n_items(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
}

/// Sample indices grouped by label, groups ordered by first member.
pub fn cluster_index_lists(labels: &[usize]) -> Vec<Vec<usize>> {
    Partition::from_labels(labels).into_groups()
}

/// True when `a` and `b` group the same samples together, whatever the
/// label numbers are.
///
/// ```rust
/// use netnmf::same_partition;
///
/// assert!(same_partition(&[0, 0, 1, 2], &[2, 2, 0, 1]));
/// assert!(!same_partition(&[0, 0, 1, 1], &[0, 1, 0, 1]));
/// ```
pub fn same_partition(a: &[usize], b: &[usize]) -> bool {
    a.len() == b.len() && Partition::from_labels(a) == Partition::from_labels(b)
}
