// src/engine/status.rs

//! Per-step rebuild state.
//!
//! This is the synchronous, deterministic core of watch mode. It consumes
//! fresh tree hashes and compile outcomes and decides which steps must be
//! recompiled. It has no Tokio types and performs no IO; the async shell in
//! [`super::pipeline`] feeds it.
//!
//! Flag semantics:
//! - `dirty`: the step must be recompiled on this tick.
//! - `broken`: the most recent compile attempt of this step failed (or an
//!   earlier step failed during the first pass, so this one never got a
//!   build). A broken step is retried when its own tree changes or when the
//!   tree of any earlier step changes, even in quick mode.

use tracing::{debug, info};

use crate::watch::TreeHash;

/// Summary of a step's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Clean,
    Dirty,
    Broken,
}

/// Mutable record for one step. Lives for one watch session only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepStatus {
    pub tree_hash: TreeHash,
    pub dirty: bool,
    pub broken: bool,
}

impl StepStatus {
    pub fn new(tree_hash: TreeHash) -> Self {
        Self {
            tree_hash,
            dirty: false,
            broken: false,
        }
    }

    /// Dirty takes precedence: a dirty step is about to be retried.
    pub fn state(&self) -> StepState {
        if self.dirty {
            StepState::Dirty
        } else if self.broken {
            StepState::Broken
        } else {
            StepState::Clean
        }
    }
}

/// Status of every step, indexed like the build's step list.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    steps: Vec<StepStatus>,
    quick: bool,
}

impl StatusBoard {
    /// Start a watch session from the current hash of every step.
    pub fn new(hashes: Vec<TreeHash>, quick: bool) -> Self {
        Self {
            steps: hashes.into_iter().map(StepStatus::new).collect(),
            quick,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn quick(&self) -> bool {
        self.quick
    }

    pub fn get(&self, index: usize) -> Option<&StepStatus> {
        self.steps.get(index)
    }

    pub fn statuses(&self) -> &[StepStatus] {
        &self.steps
    }

    pub fn states(&self) -> Vec<StepState> {
        self.steps.iter().map(StepStatus::state).collect()
    }

    /// Mark `index` and every later step broken (first-pass failure).
    pub fn mark_broken_from(&mut self, index: usize) {
        for status in self.steps.iter_mut().skip(index) {
            status.broken = true;
            status.dirty = false;
        }
    }

    /// Feed the freshly computed hash of step `index`.
    ///
    /// Returns `true` if the tree changed. A change marks the step dirty and
    /// cascades to later steps: previously broken steps are always retried;
    /// other later steps are invalidated unless in quick mode.
    pub fn observe(&mut self, index: usize, hash: TreeHash) -> bool {
        let Some(status) = self.steps.get_mut(index) else {
            return false;
        };
        if status.tree_hash == hash {
            return false;
        }

        status.tree_hash = hash;
        status.dirty = true;
        status.broken = false;

        for (offset, later) in self.steps.iter_mut().skip(index + 1).enumerate() {
            let later_index = index + 1 + offset;
            if later.broken {
                later.broken = false;
                later.dirty = true;
                debug!(step = later_index, "retrying previously broken step");
            } else if !self.quick {
                later.dirty = true;
            }
        }

        true
    }

    /// Index of the first dirty step at or after `from`.
    pub fn next_dirty(&self, from: usize) -> Option<usize> {
        (from..self.steps.len()).find(|&i| self.steps[i].dirty)
    }

    pub fn dirty_steps(&self) -> Vec<usize> {
        (0..self.steps.len()).filter(|&i| self.steps[i].dirty).collect()
    }

    /// Claim a dirty step for compilation, clearing its dirty flag.
    pub fn begin_compile(&mut self, index: usize) {
        if let Some(status) = self.steps.get_mut(index) {
            status.dirty = false;
        }
    }

    /// Give back a step whose compile was interrupted; it stays dirty.
    pub fn requeue(&mut self, index: usize) {
        if let Some(status) = self.steps.get_mut(index) {
            status.dirty = true;
        }
    }

    pub fn record_success(&mut self, index: usize) {
        if let Some(status) = self.steps.get_mut(index) {
            if status.broken {
                info!(step = index, "step recovered");
            }
            status.broken = false;
        }
    }

    /// A failed step is not retried until its tree (or an earlier tree)
    /// changes. Later dirty steps keep their flag.
    pub fn record_failure(&mut self, index: usize) {
        if let Some(status) = self.steps.get_mut(index) {
            status.broken = true;
            status.dirty = false;
        }
    }

    pub fn is_last(&self, index: usize) -> bool {
        !self.steps.is_empty() && index == self.steps.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StepState::{Broken, Clean, Dirty};

    fn h(s: &str) -> TreeHash {
        TreeHash::new(s)
    }

    fn board(n: usize, quick: bool) -> StatusBoard {
        StatusBoard::new((0..n).map(|i| h(&format!("step{i}"))).collect(), quick)
    }

    #[test]
    fn unchanged_hash_is_not_a_change() {
        let mut b = board(3, false);
        assert!(!b.observe(1, h("step1")));
        assert_eq!(b.states(), vec![Clean, Clean, Clean]);
    }

    #[test]
    fn change_in_first_step_invalidates_everything_downstream() {
        let mut b = board(3, false);
        assert!(b.observe(0, h("changed")));
        assert_eq!(b.states(), vec![Dirty, Dirty, Dirty]);
        assert_eq!(b.get(0).unwrap().tree_hash, h("changed"));
    }

    #[test]
    fn change_in_last_step_only_dirties_itself() {
        let mut b = board(3, false);
        b.observe(2, h("changed"));
        assert_eq!(b.states(), vec![Clean, Clean, Dirty]);
    }

    #[test]
    fn quick_mode_does_not_cascade() {
        let mut b = board(3, true);
        b.observe(0, h("changed"));
        assert_eq!(b.states(), vec![Dirty, Clean, Clean]);
    }

    #[test]
    fn quick_mode_still_retries_broken_steps() {
        let mut b = board(3, true);
        b.record_failure(2);
        assert_eq!(b.states(), vec![Clean, Clean, Broken]);

        b.observe(0, h("changed"));
        assert_eq!(b.states(), vec![Dirty, Clean, Dirty]);
        assert!(!b.get(2).unwrap().broken);
    }

    #[test]
    fn own_change_clears_broken() {
        let mut b = board(2, false);
        b.record_failure(0);
        b.observe(0, h("fixed"));
        let s = b.get(0).unwrap();
        assert!(s.dirty);
        assert!(!s.broken);
    }

    #[test]
    fn first_pass_failure_breaks_the_tail() {
        let mut b = board(3, false);
        b.mark_broken_from(1);
        assert_eq!(b.states(), vec![Clean, Broken, Broken]);
    }

    #[test]
    fn compile_bookkeeping() {
        let mut b = board(3, false);
        b.observe(0, h("changed"));
        assert_eq!(b.next_dirty(0), Some(0));

        b.begin_compile(0);
        b.record_success(0);
        assert_eq!(b.next_dirty(0), Some(1));

        b.begin_compile(1);
        b.record_failure(1);
        assert_eq!(b.states(), vec![Clean, Broken, Dirty]);
        assert_eq!(b.dirty_steps(), vec![2]);
        assert!(b.is_last(2));
        assert!(!b.is_last(1));
    }

    #[test]
    fn requeued_step_keeps_its_broken_flag() {
        let mut b = board(2, true);
        assert!(b.quick());
        b.record_failure(0);
        b.observe(1, h("changed"));
        b.begin_compile(1);
        b.requeue(1);
        assert_eq!(b.states(), vec![Broken, Dirty]);
        assert_eq!(b.next_dirty(0), Some(1));
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let mut b = board(1, false);
        assert!(!b.observe(5, h("x")));
        b.begin_compile(5);
        b.record_failure(5);
        assert_eq!(b.states(), vec![Clean]);
    }
}
