//! The dependency table (§3 "Dependency table", §4.H phases 3, 4, 7).
//!
//! Grounded on `src/frame/dependency.rs`'s `Dependency { src_stage_mask, dst_stage_mask,
//! latency, barrier }` for the "one entry per ordered pass pair" shape, simplified here to
//! the three-valued lattice the spec itself specifies (barrier detail is the backend's
//! concern, not this core's) rather than carrying stage masks or a barrier payload.
//! `petgraph` is not used: the table is addressed exactly as §3 describes it, a flat
//! lower-triangular matrix over pass indices, and the handful of graph walks this crate
//! needs (reachability, a merge-preferring topological order) are short enough to write
//! directly over that matrix.

use fxhash::FxHashMap;

/// The strength of a dependency between two passes, forming a lattice
/// `None < Ordering < Execution` so that recording a second, weaker dependency between the
/// same pair never downgrades an already-recorded stronger one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DependencyKind {
    None,
    Ordering,
    Execution,
}

/// A lower-triangular matrix over pass indices: `table.get(dependent, dependency)` is only
/// meaningful for `dependency < dependent`, matching §3's "lower-triangular matrix over
/// pass indices" literally. Row `j` stores one entry per `i` in `0..j`.
#[derive(Clone, Debug)]
pub struct DependencyTable {
    rows: Vec<Vec<DependencyKind>>,
}

impl DependencyTable {
    pub fn new(pass_count: usize) -> Self {
        DependencyTable {
            rows: (0..pass_count).map(|j| vec![DependencyKind::None; j]).collect(),
        }
    }

    pub fn pass_count(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, dependent: usize, dependency: usize) -> DependencyKind {
        if dependency >= dependent {
            return DependencyKind::None;
        }
        self.rows[dependent][dependency]
    }

    /// Raises `table[dependent, dependency]` to at least `kind`, never downgrading an
    /// existing stronger entry (§4.H phase 3: "if j reads r set execution; else if j
    /// writes r and table[j,i] != execution set ordering").
    pub fn set_at_least(&mut self, dependent: usize, dependency: usize, kind: DependencyKind) {
        assert!(
            dependency < dependent,
            "dependency table is strictly lower-triangular: {} is not < {}",
            dependency,
            dependent
        );
        let cell = &mut self.rows[dependent][dependency];
        if kind > *cell {
            *cell = kind;
        }
    }

    /// Every dependency of `dependent` with a non-`None` kind, as `(dependency_index, kind)`.
    pub fn dependencies_of(&self, dependent: usize) -> impl Iterator<Item = (usize, DependencyKind)> + '_ {
        self.rows[dependent]
            .iter()
            .enumerate()
            .filter(|(_, k)| **k != DependencyKind::None)
            .map(|(i, k)| (i, *k))
    }

    /// Builds a new table restricted to the passes named by `old_to_new` (old index ->
    /// new index among active passes only), preserving each surviving pair's dependency
    /// kind (§4.H phase 7: "restrict the dependency table to active passes only, preserving
    /// pair-wise kinds").
    pub fn restrict(&self, old_to_new: &FxHashMap<usize, usize>) -> DependencyTable {
        let mut restricted = DependencyTable::new(old_to_new.len());
        for (&old_dependent, &new_dependent) in old_to_new {
            for (old_dependency, kind) in self.dependencies_of(old_dependent) {
                if let Some(&new_dependency) = old_to_new.get(&old_dependency) {
                    let (lo, hi) = if new_dependency < new_dependent {
                        (new_dependency, new_dependent)
                    } else {
                        (new_dependent, new_dependency)
                    };
                    restricted.set_at_least(hi, lo, kind);
                }
            }
        }
        restricted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_at_least_never_downgrades() {
        let mut t = DependencyTable::new(3);
        t.set_at_least(2, 0, DependencyKind::Execution);
        t.set_at_least(2, 0, DependencyKind::Ordering);
        assert_eq!(t.get(2, 0), DependencyKind::Execution);
    }

    #[test]
    fn entries_above_the_diagonal_are_always_none() {
        let t = DependencyTable::new(3);
        assert_eq!(t.get(0, 1), DependencyKind::None);
        assert_eq!(t.get(1, 1), DependencyKind::None);
    }

    #[test]
    fn restrict_drops_culled_passes_and_remaps_indices() {
        let mut t = DependencyTable::new(4);
        t.set_at_least(3, 1, DependencyKind::Execution);
        t.set_at_least(2, 0, DependencyKind::Ordering);
        // Only passes 1 and 3 survive, remapped to 0 and 1.
        let mut old_to_new = FxHashMap::default();
        old_to_new.insert(1, 0);
        old_to_new.insert(3, 1);
        let restricted = t.restrict(&old_to_new);
        assert_eq!(restricted.pass_count(), 2);
        assert_eq!(restricted.get(1, 0), DependencyKind::Execution);
    }
}
