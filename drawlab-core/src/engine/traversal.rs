//! Explicit-stack traversal of the ordered-pick decision tree.
//!
//! A node at depth `d` is an ordered sequence of `d + 1` distinct items. Its
//! path probability is
//!
//! ```text
//! P = Π_{s=0..=d} w[i_s] / (S - Σ_{t<s} w[i_t])
//! ```
//!
//! and is credited to the item chosen at that node. Summed over the whole tree,
//! item `i` collects the probability of every ordered draw of length `k` that
//! contains it, i.e. its inclusion probability.
//!
//! Each traversal owns its frame stack, its exclusion flags and its
//! accumulator, so independent traversals can run on different threads over
//! the same read-only weights.

/// Below this fraction of the total, `S - Σ prior` is recomputed by direct
/// summation. Above it the running difference keeps about 12 significant
/// digits.
const CANCELLATION_EPS: f64 = 1e-4;

#[derive(Debug, Clone, Copy)]
struct Frame {
    candidate: usize,
    path_probability: f64,
}

/// Accumulated result of one or more traversed branches.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalOutcome {
    /// Probability mass credited to each item.
    pub inclusion: Vec<f64>,
    /// Sum of path probabilities at depth `k`; 1 for a complete tree.
    pub leaf_mass: f64,
    /// Number of tree nodes visited.
    pub nodes: u64,
}

impl TraversalOutcome {
    pub fn zero(len: usize) -> Self {
        Self {
            inclusion: vec![0.0; len],
            leaf_mass: 0.0,
            nodes: 0,
        }
    }

    /// Element-wise sum of two partial outcomes.
    pub fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.inclusion.iter_mut().zip(&other.inclusion) {
            *a += b;
        }
        self.leaf_mass += other.leaf_mass;
        self.nodes += other.nodes;
        self
    }
}

/// Depth-first walker over the decision tree of depth `depth`.
///
/// `weights` must all be positive; zero-weight items have to be filtered out
/// by the caller.
#[derive(Debug)]
pub struct Traversal<'a> {
    weights: &'a [f64],
    total: f64,
    depth: usize,
    frames: Vec<Frame>,
    picked: Vec<bool>,
    outcome: TraversalOutcome,
}

impl<'a> Traversal<'a> {
    pub fn new(weights: &'a [f64], depth: usize) -> Self {
        let total = weights.iter().sum();
        Self {
            weights,
            total,
            depth,
            frames: Vec::with_capacity(depth),
            picked: vec![false; weights.len()],
            outcome: TraversalOutcome::zero(weights.len()),
        }
    }

    /// Traverse every branch in order.
    pub fn run_all(mut self) -> TraversalOutcome {
        for first in 0..self.weights.len() {
            self.run_branch(first);
        }
        self.finish()
    }

    /// Traverse the subtree whose first pick is `first`.
    ///
    /// Leaves the exclusion flags clear, so branches can be run one after
    /// another on the same traversal.
    pub fn run_branch(&mut self, first: usize) {
        if self.depth == 0 || first >= self.weights.len() {
            return;
        }
        self.enter(first);
        loop {
            if self.frames.len() < self.depth {
                if let Some(next) = self.next_unpicked(0) {
                    self.enter(next);
                    continue;
                }
            }
            // next sibling, backtracking until one exists
            loop {
                let Some(done) = self.frames.pop() else {
                    return;
                };
                self.picked[done.candidate] = false;
                if self.frames.len() + 1 == self.depth {
                    self.outcome.leaf_mass += done.path_probability;
                }
                if self.frames.is_empty() {
                    // siblings of the root belong to other branches
                    return;
                }
                if let Some(next) = self.next_unpicked(done.candidate + 1) {
                    self.enter(next);
                    break;
                }
            }
        }
    }

    pub fn finish(self) -> TraversalOutcome {
        self.outcome
    }

    fn enter(&mut self, candidate: usize) {
        let path_probability = self.path_probability(candidate);
        self.outcome.inclusion[candidate] += path_probability;
        self.outcome.nodes += 1;
        self.picked[candidate] = true;
        self.frames.push(Frame {
            candidate,
            path_probability,
        });
    }

    /// Probability of the current path extended by `candidate`, recomputed
    /// from the root.
    fn path_probability(&self, candidate: usize) -> f64 {
        let path = self
            .frames
            .iter()
            .map(|f| f.candidate)
            .chain(std::iter::once(candidate));

        let mut prob = 1.0;
        let mut remaining = self.total;
        for (depth, i) in path.enumerate() {
            if remaining <= self.total * CANCELLATION_EPS {
                remaining = self.remaining_weight(depth);
            }
            prob *= self.weights[i] / remaining;
            remaining -= self.weights[i];
        }
        prob
    }

    /// Sum of weights not chosen in the first `depth` frames.
    fn remaining_weight(&self, depth: usize) -> f64 {
        let chosen = &self.frames[..depth];
        self.weights
            .iter()
            .enumerate()
            .filter(|(i, _)| !chosen.iter().any(|f| f.candidate == *i))
            .map(|(_, w)| w)
            .sum()
    }

    fn next_unpicked(&self, from: usize) -> Option<usize> {
        (from..self.picked.len()).find(|&i| !self.picked[i])
    }
}
