//! Inclusion probability engine.
//!
//! Computes, for every item, the exact probability that it is among the `k`
//! items of one pick. Closed forms are tried first:
//!
//! 1. `k == 0`: nothing is drawn, every item has probability 0.
//! 2. repetitive mode or `k == 1`: `w_i / S` (per-draw probability).
//! 3. `k` equal to the drawable count: every drawable item has probability 1.
//! 4. fair table (all weights equal): `k / n`.
//!
//! Everything else runs the decision-tree enumeration in [`traversal`], either
//! on the calling thread or partitioned by first pick across a rayon pool.
//! Zero-weight items are removed before enumeration and reported with 0.
//!
//! The engine works on the set's effective weights directly. The cumulative
//! grid is a sampling structure: its cell widths lose small weights that
//! follow large ones.

pub mod traversal;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::distribution::{admit, Admission, PickError};
use crate::domain::WeightedSet;
use crate::probability::ProbabilityTable;

pub use traversal::{Traversal, TraversalOutcome};

/// How the general case is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Partition first-pick branches across worker threads.
    pub parallel: bool,
    /// Worker count; 0 uses rayon's global pool.
    pub threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: 0,
        }
    }
}

/// Exact inclusion probability calculator.
#[derive(Debug, Clone, Default)]
pub struct InclusionEngine {
    config: EngineConfig,
}

impl InclusionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Single-threaded engine.
    pub fn sequential() -> Self {
        Self::new(EngineConfig {
            parallel: false,
            threads: 0,
        })
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Sets the worker count (0 = rayon default).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.threads = threads;
        self
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Probability of each item being among the `k` items of one pick.
    ///
    /// In repetitive mode this is the per-draw probability `w_i / S` for any
    /// `k`. Returns an empty table if the set has no drawable item.
    pub fn exact_probabilities(
        &self,
        set: &WeightedSet,
        k: usize,
    ) -> Result<ProbabilityTable, PickError> {
        let weights = set.effective_weights();
        let drawable = positive_count(&weights);
        let names = set.names();

        if k == 0 {
            return Ok(ProbabilityTable::from_parts(names, &vec![0.0; weights.len()]));
        }

        if set.repetitive || k == 1 {
            if drawable == 0 {
                return Ok(ProbabilityTable::default());
            }
            debug!(k, "closed form: single-draw probabilities");
            return Ok(ProbabilityTable::from_parts(names, &single_draw(&weights)));
        }

        if admit(k, false, weights.len(), drawable)? == Admission::Empty {
            return Ok(ProbabilityTable::default());
        }

        if k == drawable {
            debug!(k, "closed form: every drawable item is included");
            let certain: Vec<f64> = weights
                .iter()
                .map(|&w| if w > 0.0 { 1.0 } else { 0.0 })
                .collect();
            return Ok(ProbabilityTable::from_parts(names, &certain));
        }

        if set.is_fair() {
            debug!(k, n = weights.len(), "closed form: fair table");
            let p = k as f64 / weights.len() as f64;
            return Ok(ProbabilityTable::from_parts(names, &vec![p; weights.len()]));
        }

        let probs = self.enumerate(&weights, k);
        Ok(ProbabilityTable::from_parts(names, &probs))
    }

    /// Probability of each item appearing at least once in a pick of `k`.
    ///
    /// Repetitive mode: `1 - (1 - w_i / S)^k`. Without replacement this is the
    /// same as [`exact_probabilities`](Self::exact_probabilities).
    pub fn appearance_probabilities(
        &self,
        set: &WeightedSet,
        k: usize,
    ) -> Result<ProbabilityTable, PickError> {
        if !set.repetitive {
            return self.exact_probabilities(set, k);
        }
        let weights = set.effective_weights();
        if admit(k, true, weights.len(), positive_count(&weights))? == Admission::Empty {
            if k == 0 {
                return Ok(ProbabilityTable::from_parts(set.names(), &vec![0.0; weights.len()]));
            }
            return Ok(ProbabilityTable::default());
        }
        let probs: Vec<f64> = single_draw(&weights)
            .into_iter()
            .map(|p| 1.0 - (1.0 - p).powf(k as f64))
            .collect();
        Ok(ProbabilityTable::from_parts(set.names(), &probs))
    }

    /// General case over the full index space; zero-weight items get 0.
    fn enumerate(&self, weights: &[f64], k: usize) -> Vec<f64> {
        let (positive, index_map): (Vec<f64>, Vec<usize>) = weights
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w > 0.0)
            .map(|(i, &w)| (w, i))
            .unzip();

        let outcome = if self.config.parallel {
            self.traverse_parallel(&positive, k)
        } else {
            Traversal::new(&positive, k).run_all()
        };

        let total: f64 = outcome.inclusion.iter().sum();
        debug!(
            k,
            candidates = positive.len(),
            nodes = outcome.nodes,
            sum = total,
            leaf_mass = outcome.leaf_mass,
            "decision tree enumerated"
        );

        let mut probs = vec![0.0; weights.len()];
        for (p, &i) in outcome.inclusion.iter().zip(&index_map) {
            probs[i] = *p;
        }
        probs
    }

    /// Partition first picks across workers; each owns its traversal and
    /// partial accumulator, merged at the end.
    fn traverse_parallel(&self, weights: &[f64], k: usize) -> TraversalOutcome {
        let run = || {
            (0..weights.len())
                .into_par_iter()
                .fold(
                    || Traversal::new(weights, k),
                    |mut traversal, first| {
                        traversal.run_branch(first);
                        traversal
                    },
                )
                .map(Traversal::finish)
                .reduce(|| TraversalOutcome::zero(weights.len()), TraversalOutcome::merge)
        };

        install(self.config.threads, run)
    }
}

/// Run `op` inside a dedicated pool of `threads` workers.
///
/// `threads == 0`, or a pool that fails to build, falls back to rayon's
/// global pool.
pub fn install<R, F>(threads: usize, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if threads == 0 {
        return op();
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(op),
        Err(e) => {
            warn!(error = %e, threads, "failed to build worker pool, using the global pool");
            op()
        }
    }
}

/// `w_i / S` for weights with a positive total.
fn single_draw(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| w / total).collect()
}

fn positive_count(weights: &[f64]) -> usize {
    weights.iter().filter(|&&w| w > 0.0).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> WeightedSet {
        WeightedSet::from_pairs([("A", 1.0), ("B", 1.0), ("C", 2.0)]).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn single_pick_is_weight_share() {
        let probs = InclusionEngine::default().exact_probabilities(&abc(), 1).unwrap();
        assert!(close(probs.get("A").unwrap(), 0.25));
        assert!(close(probs.get("B").unwrap(), 0.25));
        assert!(close(probs.get("C").unwrap(), 0.5));
    }

    #[test]
    fn full_pick_is_certain() {
        let probs = InclusionEngine::default().exact_probabilities(&abc(), 3).unwrap();
        assert!(probs.values().all(|p| p == 1.0));
    }

    #[test]
    fn two_of_three() {
        for engine in [InclusionEngine::sequential(), InclusionEngine::default()] {
            let probs = engine.exact_probabilities(&abc(), 2).unwrap();
            assert!(close(probs.get("A").unwrap(), 7.0 / 12.0));
            assert!(close(probs.get("B").unwrap(), 7.0 / 12.0));
            assert!(close(probs.get("C").unwrap(), 5.0 / 6.0));
            assert!(close(probs.total(), 2.0));
        }
    }

    #[test]
    fn too_many_fails() {
        let err = InclusionEngine::default().exact_probabilities(&abc(), 4).unwrap_err();
        assert_eq!(
            err,
            PickError::InvalidAmount {
                amount: 4,
                available: 3
            }
        );
    }

    #[test]
    fn zero_amount_is_all_zero() {
        let probs = InclusionEngine::default().exact_probabilities(&abc(), 0).unwrap();
        assert_eq!(probs.len(), 3);
        assert!(probs.values().all(|p| p == 0.0));
    }

    #[test]
    fn inverted_weights() {
        let mut set = WeightedSet::from_pairs([("A", 1.0), ("B", 2.0)]).unwrap();
        set.inverted = true;
        let probs = InclusionEngine::default().exact_probabilities(&set, 1).unwrap();
        assert!(close(probs.get("A").unwrap(), 2.0 / 3.0));
        assert!(close(probs.get("B").unwrap(), 1.0 / 3.0));
    }

    #[test]
    fn zero_weight_item() {
        let set = WeightedSet::from_pairs([("A", 1.0), ("B", 0.0)]).unwrap();
        let engine = InclusionEngine::default();
        let probs = engine.exact_probabilities(&set, 1).unwrap();
        assert_eq!(probs.get("A"), Some(1.0));
        assert_eq!(probs.get("B"), Some(0.0));
        assert!(engine.exact_probabilities(&set, 2).is_err());
    }

    #[test]
    fn zero_weight_items_are_excluded_from_enumeration() {
        let set =
            WeightedSet::from_pairs([("A", 1.0), ("Z1", 0.0), ("B", 2.0), ("C", 3.0), ("Z2", 0.0)])
                .unwrap();
        let probs = InclusionEngine::sequential().exact_probabilities(&set, 2).unwrap();
        assert_eq!(probs.get("Z1"), Some(0.0));
        assert_eq!(probs.get("Z2"), Some(0.0));
        assert!(close(probs.total(), 2.0));

        let dense = WeightedSet::from_pairs([("A", 1.0), ("B", 2.0), ("C", 3.0)]).unwrap();
        let expected = InclusionEngine::sequential().exact_probabilities(&dense, 2).unwrap();
        for (name, p) in expected.iter() {
            assert!(close(probs.get(name).unwrap(), p));
        }
    }

    #[test]
    fn drawable_count_closed_form() {
        let set = WeightedSet::from_pairs([("A", 1.0), ("B", 0.0), ("C", 5.0)]).unwrap();
        let probs = InclusionEngine::default().exact_probabilities(&set, 2).unwrap();
        assert_eq!(probs.get("A"), Some(1.0));
        assert_eq!(probs.get("B"), Some(0.0));
        assert_eq!(probs.get("C"), Some(1.0));
    }

    #[test]
    fn degenerate_set_is_empty() {
        let set = WeightedSet::from_pairs([("A", 0.0), ("B", 0.0), ("C", 0.0)]).unwrap();
        let engine = InclusionEngine::default();
        assert!(engine.exact_probabilities(&set, 1).unwrap().is_empty());
        assert!(engine.exact_probabilities(&set, 2).unwrap().is_empty());
        assert!(engine
            .exact_probabilities(&WeightedSet::new(), 1)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn fair_table_closed_form() {
        let set = WeightedSet::from_pairs([("a", 3.0), ("b", 3.0), ("c", 3.0), ("d", 3.0)]).unwrap();
        let probs = InclusionEngine::default().exact_probabilities(&set, 3).unwrap();
        assert!(probs.values().all(|p| close(p, 0.75)));
    }

    #[test]
    fn repetitive_mode_is_per_draw() {
        let mut set = abc();
        set.repetitive = true;
        let engine = InclusionEngine::default();
        for k in [1, 2, 3, 10] {
            let probs = engine.exact_probabilities(&set, k).unwrap();
            assert!(close(probs.get("C").unwrap(), 0.5));
            assert!(close(probs.total(), 1.0));
        }
    }

    #[test]
    fn appearance_in_repetitive_mode() {
        let mut set = abc();
        set.repetitive = true;
        let probs = InclusionEngine::default().appearance_probabilities(&set, 2).unwrap();
        // 1 - (1 - 1/2)^2
        assert!(close(probs.get("C").unwrap(), 0.75));
        assert!(close(probs.get("A").unwrap(), 1.0 - 0.75 * 0.75));
    }

    #[test]
    fn appearance_without_replacement_matches_exact() {
        let engine = InclusionEngine::default();
        assert_eq!(
            engine.appearance_probabilities(&abc(), 2).unwrap(),
            engine.exact_probabilities(&abc(), 2).unwrap()
        );
    }

    #[test]
    fn small_weights_after_a_large_one_are_kept() {
        let set = WeightedSet::from_pairs([("A", 1e15), ("B", 0.3), ("C", 0.7), ("D", 1.1)]).unwrap();
        let probs = InclusionEngine::default().exact_probabilities(&set, 1).unwrap();
        let total = 1e15 + 0.3 + 0.7 + 1.1;
        for (name, w) in [("B", 0.3), ("C", 0.7), ("D", 1.1)] {
            let p = probs.get(name).unwrap();
            let expected = w / total;
            assert!(((p - expected) / expected).abs() < 1e-12, "{name}: {p} vs {expected}");
        }
    }

    #[test]
    fn dominant_weight_does_not_hide_the_rest() {
        let set = WeightedSet::from_pairs([("A", 1e17), ("B", 1.0), ("C", 1.0)]).unwrap();
        for engine in [InclusionEngine::sequential(), InclusionEngine::default()] {
            let probs = engine.exact_probabilities(&set, 2).unwrap();
            assert!((probs.get("A").unwrap() - 1.0).abs() < 1e-12);
            assert!((probs.get("B").unwrap() - 0.5).abs() < 1e-12);
            assert!((probs.get("C").unwrap() - 0.5).abs() < 1e-12);
            assert!((probs.total() - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn subnormal_weights_are_rejected_before_inversion() {
        let mut set = WeightedSet::from_pairs([("B", 1.0)]).unwrap();
        assert!(set.upsert("A", 1e-310).is_err());
        set.inverted = true;
        let probs = InclusionEngine::default().exact_probabilities(&set, 1).unwrap();
        assert!(probs.values().all(|p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn explicit_thread_count() {
        let set = WeightedSet::from_pairs([
            ("a", 1.0),
            ("b", 2.0),
            ("c", 3.0),
            ("d", 4.0),
            ("e", 5.0),
            ("f", 6.0),
        ])
        .unwrap();
        let seq = InclusionEngine::sequential().exact_probabilities(&set, 3).unwrap();
        let par = InclusionEngine::default()
            .with_threads(2)
            .exact_probabilities(&set, 3)
            .unwrap();
        for ((_, a), (_, b)) in seq.iter().zip(par.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
