//! Statistical validation: empirical frequencies from repeated draws.
//!
//! Trials are split into fixed-size chunks. Each chunk owns a fresh picker
//! over the same read-only table and its own random generator; chunk counts
//! are summed at the end. With a seeded source, chunk generators come from
//! the seed hierarchy keyed by chunk index, so the result does not depend on
//! the thread count or on whether chunks ran in parallel.

use drawlab_core::distribution::{Admission, CumulativeGrid, PickError};
use drawlab_core::engine::install;
use drawlab_core::{Picker, ProbabilityTable, RngSource, SeedHierarchy, WeightedSet};
use rand::RngCore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::profiling::TimedScope;

/// Validator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Random source; `Seeded` makes runs reproducible.
    pub source: RngSource,
    /// Run chunks on worker threads.
    pub parallel: bool,
    /// Worker count; 0 uses rayon's default.
    pub threads: usize,
    /// Trials per chunk.
    pub chunk_size: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            source: RngSource::Seeded(42),
            parallel: true,
            threads: 0,
            chunk_size: 100_000,
        }
    }
}

/// How occurrences within one pick are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tally {
    /// Every occurrence counts.
    Occurrences,
    /// An item counts at most once per pick.
    Presence,
}

/// Runs the sampler repeatedly and aggregates per-item counts.
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
    run_id: String,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            run_id: String::from("validate"),
        }
    }

    /// Scope the seed hierarchy to a run identity.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Observed frequency of each item, comparable to exact probabilities.
    ///
    /// Repetitive mode divides occurrence counts by `trials * amount`
    /// (per-draw frequency); otherwise by `trials` (inclusion frequency).
    /// `amount == 0` or `trials == 0` gives all zeros; a table without
    /// drawable items gives an empty table.
    pub fn empirical_frequencies(
        &self,
        set: &WeightedSet,
        amount: usize,
        trials: usize,
    ) -> Result<ProbabilityTable, PickError> {
        let denominator = if set.repetitive {
            trials as f64 * amount as f64
        } else {
            trials as f64
        };
        self.run(set, amount, trials, Tally::Occurrences, denominator)
    }

    /// Fraction of picks in which each item appears at least once.
    pub fn empirical_appearance(
        &self,
        set: &WeightedSet,
        amount: usize,
        trials: usize,
    ) -> Result<ProbabilityTable, PickError> {
        self.run(set, amount, trials, Tally::Presence, trials as f64)
    }

    fn run(
        &self,
        set: &WeightedSet,
        amount: usize,
        trials: usize,
        tally: Tally,
        denominator: f64,
    ) -> Result<ProbabilityTable, PickError> {
        let grid = CumulativeGrid::build(set);
        let zeros = || ProbabilityTable::from_parts(set.names(), &vec![0.0; set.len()]);

        if grid.admit(amount, set.repetitive)? == Admission::Empty {
            if amount == 0 {
                return Ok(zeros());
            }
            return Ok(ProbabilityTable::default());
        }
        if trials == 0 {
            return Ok(zeros());
        }

        let scope = TimedScope::new("validator.run");
        let counts = self.count(set, amount, trials, tally)?;
        info!(
            amount,
            trials,
            repetitive = set.repetitive,
            elapsed_ms = scope.elapsed_ms(),
            "validation draws finished"
        );

        let freqs: Vec<f64> = counts.iter().map(|&c| c as f64 / denominator).collect();
        Ok(ProbabilityTable::from_parts(set.names(), &freqs))
    }

    fn count(
        &self,
        set: &WeightedSet,
        amount: usize,
        trials: usize,
        tally: Tally,
    ) -> Result<Vec<u64>, PickError> {
        let chunk_size = self.config.chunk_size.max(1);
        let chunks = trials.div_ceil(chunk_size);
        let n = set.len();
        debug!(chunks, chunk_size, parallel = self.config.parallel, "counting draws");

        let chunk_trials = |chunk: usize| chunk_size.min(trials - chunk * chunk_size);
        let run_chunk = |chunk: usize| {
            let mut picker = Picker::with_rng(set, self.chunk_rng(chunk as u64));
            count_chunk(&mut picker, amount, chunk_trials(chunk), tally)
        };

        if !self.config.parallel {
            let mut total = vec![0u64; n];
            for chunk in 0..chunks {
                add_into(&mut total, &run_chunk(chunk)?);
            }
            return Ok(total);
        }

        install(self.config.threads, || {
            (0..chunks).into_par_iter().map(run_chunk).try_reduce(
                || vec![0u64; n],
                |mut a, b| {
                    add_into(&mut a, &b);
                    Ok(a)
                },
            )
        })
    }

    fn chunk_rng(&self, chunk: u64) -> Box<dyn RngCore + Send> {
        match self.config.source {
            RngSource::Seeded(seed) => {
                Box::new(SeedHierarchy::new(seed).rng_for(&self.run_id, "validate", chunk))
            }
            other => other.build(),
        }
    }
}

fn count_chunk<R: RngCore>(
    picker: &mut Picker<R>,
    amount: usize,
    trials: usize,
    tally: Tally,
) -> Result<Vec<u64>, PickError> {
    let mut counts = vec![0u64; picker.table_len()];
    let mut seen = vec![false; picker.table_len()];
    for _ in 0..trials {
        let drawn = picker.pick_indices(amount)?;
        match tally {
            Tally::Occurrences => {
                for &i in drawn {
                    counts[i] += 1;
                }
            }
            Tally::Presence => {
                for &i in drawn {
                    if !seen[i] {
                        seen[i] = true;
                        counts[i] += 1;
                    }
                }
                for &i in drawn {
                    seen[i] = false;
                }
            }
        }
    }
    Ok(counts)
}

fn add_into(total: &mut [u64], part: &[u64]) {
    for (t, p) in total.iter_mut().zip(part) {
        *t += p;
    }
}

// ─── Report ─────────────────────────────────────────────────────────

/// Exact vs empirical values for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRow {
    pub name: String,
    pub exact: f64,
    pub empirical: f64,
    pub abs_error: f64,
    /// `abs_error / exact`; equals `abs_error` when `exact` is 0.
    pub rel_error: f64,
}

/// Side-by-side comparison of exact probabilities and sampled frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub amount: usize,
    pub trials: usize,
    pub rows: Vec<ValidationRow>,
    pub max_abs_error: f64,
    pub max_rel_error: f64,
}

impl ValidationReport {
    /// Pair rows by name; items missing from `empirical` count as 0.
    pub fn compare(
        exact: &ProbabilityTable,
        empirical: &ProbabilityTable,
        amount: usize,
        trials: usize,
    ) -> Self {
        let rows: Vec<ValidationRow> = exact
            .iter()
            .map(|(name, p)| {
                let observed = empirical.get(name).unwrap_or(0.0);
                let abs_error = (observed - p).abs();
                let rel_error = if p > 0.0 { abs_error / p } else { abs_error };
                ValidationRow {
                    name: name.to_string(),
                    exact: p,
                    empirical: observed,
                    abs_error,
                    rel_error,
                }
            })
            .collect();
        let max_abs_error = rows.iter().map(|r| r.abs_error).fold(0.0, f64::max);
        let max_rel_error = rows.iter().map(|r| r.rel_error).fold(0.0, f64::max);
        Self {
            amount,
            trials,
            rows,
            max_abs_error,
            max_rel_error,
        }
    }

    /// True if every absolute deviation is within `tolerance`.
    pub fn converged(&self, tolerance: f64) -> bool {
        self.max_abs_error <= tolerance
    }
}
