//! Sequential weighted sampling.
//!
//! Two layers:
//! - `SequentialSampler`: draws indices from a `CumulativeGrid`, rejecting
//!   repeats when replacement is disallowed.
//! - `Picker`: a thin adapter over the sampler that owns a snapshot of the
//!   item names and returns names instead of indices.

use rand::{Rng, RngCore};

use crate::distribution::{Admission, CumulativeGrid, PickError};
use crate::domain::{ItemName, WeightedSet};
use crate::rng::RngSource;

/// Draws indices from a cumulative grid.
///
/// The grid is owned by the sampler; rebuild the sampler when the table
/// changes.
#[derive(Debug)]
pub struct SequentialSampler<R> {
    rng: R,
    grid: CumulativeGrid,
    picked: Vec<bool>,
    drawn: Vec<usize>,
}

impl<R: RngCore> SequentialSampler<R> {
    pub fn new(grid: CumulativeGrid, rng: R) -> Self {
        let n = grid.len();
        Self {
            rng,
            grid,
            picked: vec![false; n],
            drawn: Vec::with_capacity(n),
        }
    }

    pub fn grid(&self) -> &CumulativeGrid {
        &self.grid
    }

    /// Draw `amount` indices.
    ///
    /// Without replacement every index appears at most once; a repeated
    /// index is redrawn without consuming an output slot. Returns an empty
    /// slice for `amount == 0` or a zero-width grid.
    pub fn draw(&mut self, amount: usize, allow_replacement: bool) -> Result<&[usize], PickError> {
        self.drawn.clear();
        if self.grid.admit(amount, allow_replacement)? == Admission::Empty {
            return Ok(&self.drawn);
        }

        if allow_replacement {
            for _ in 0..amount {
                let i = self.draw_index();
                self.drawn.push(i);
            }
        } else {
            self.picked.iter_mut().for_each(|p| *p = false);
            while self.drawn.len() < amount {
                let i = self.draw_index();
                if self.picked[i] {
                    continue;
                }
                self.picked[i] = true;
                self.drawn.push(i);
            }
        }
        Ok(&self.drawn)
    }

    /// Indices of the most recent draw.
    pub fn last_draw(&self) -> &[usize] {
        &self.drawn
    }

    // Caller guarantees a non-degenerate grid.
    #[inline]
    fn draw_index(&mut self) -> usize {
        let r = self.rng.gen::<f64>() * self.grid.width();
        self.grid.locate(r).unwrap_or(0)
    }
}

/// Generator of groups of item names.
///
/// Holds its own snapshot of the table: later edits to the source
/// `WeightedSet` do not affect an existing picker.
pub struct Picker<R> {
    names: Vec<ItemName>,
    repetitive: bool,
    fair: bool,
    sampler: SequentialSampler<R>,
}

impl Picker<Box<dyn RngCore + Send>> {
    /// Build a picker backed by the selected random source.
    pub fn from_source(set: &WeightedSet, source: RngSource) -> Self {
        Self::with_rng(set, source.build())
    }
}

impl<R: RngCore> Picker<R> {
    /// Build a picker over a snapshot of `set` using `rng`.
    pub fn with_rng(set: &WeightedSet, rng: R) -> Self {
        Self {
            names: set.names().map(String::from).collect(),
            repetitive: set.repetitive,
            fair: set.is_fair(),
            sampler: SequentialSampler::new(CumulativeGrid::build(set), rng),
        }
    }

    /// Number of items in the snapshot, drawable or not.
    pub fn table_len(&self) -> usize {
        self.names.len()
    }

    pub fn is_repetitive(&self) -> bool {
        self.repetitive
    }

    /// True if every item has the same positive effective weight.
    pub fn is_fair(&self) -> bool {
        self.fair
    }

    pub fn names(&self) -> &[ItemName] {
        &self.names
    }

    /// Draw `amount` indices using the table's replacement mode.
    pub fn pick_indices(&mut self, amount: usize) -> Result<&[usize], PickError> {
        self.sampler.draw(amount, self.repetitive)
    }

    /// Draw `amount` items and return their names.
    pub fn pick(&mut self, amount: usize) -> Result<Vec<ItemName>, PickError> {
        let indices = self.sampler.draw(amount, self.repetitive)?;
        Ok(indices.iter().map(|&i| self.names[i].clone()).collect())
    }
}

/// Convenience wrapper for exactly one picking operation.
pub fn pick(set: &WeightedSet, amount: usize, source: RngSource) -> Result<Vec<ItemName>, PickError> {
    Picker::from_source(set, source).pick(amount)
}
