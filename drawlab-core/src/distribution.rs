//! Cumulative weight grid: the index space shared by draws and probabilities.
//!
//! Item `i` owns the half-open cell `[grid[i], grid[i+1])`. The grid has
//! `n + 1` non-decreasing bounds with `grid[0] = 0` and `grid[n] = S`, the total
//! effective weight. Zero-weight items keep their index but own an empty cell,
//! so no random value ever lands on them.

use thiserror::Error;

use crate::domain::WeightedSet;

/// Errors from draw and probability preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    #[error("cannot pick {amount} distinct items out of {available} drawable items")]
    InvalidAmount { amount: usize, available: usize },
}

/// Outcome of checking an amount against a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Nothing to draw or compute: `amount == 0` or total width is zero.
    Empty,
    /// The request is valid and non-trivial.
    Proceed,
}

/// Cumulative sums of effective weights in item order.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeGrid {
    bounds: Vec<f64>,
}

impl CumulativeGrid {
    /// Build the grid from a set's effective weights.
    pub fn build(set: &WeightedSet) -> Self {
        Self::from_weights(&set.effective_weights())
    }

    /// Build the grid from already transformed weights.
    pub fn from_weights(weights: &[f64]) -> Self {
        let mut bounds = Vec::with_capacity(weights.len() + 1);
        let mut cur = 0.0;
        bounds.push(cur);
        for &w in weights {
            cur += w;
            bounds.push(cur);
        }
        Self { bounds }
    }

    /// Number of items (cells).
    pub fn len(&self) -> usize {
        self.bounds.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total effective weight `S`.
    pub fn width(&self) -> f64 {
        self.bounds[self.len()]
    }

    /// True if nothing can be drawn (`S == 0`).
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Width of item `i`'s cell, i.e. its effective weight.
    pub fn cell_width(&self, i: usize) -> f64 {
        self.bounds[i + 1] - self.bounds[i]
    }

    /// Number of items with a non-empty cell.
    pub fn drawable_count(&self) -> usize {
        self.bounds.windows(2).filter(|w| w[1] > w[0]).count()
    }

    /// Highest index with a non-empty cell.
    pub fn last_drawable(&self) -> Option<usize> {
        (0..self.len()).rev().find(|&i| self.cell_width(i) > 0.0)
    }

    /// Map a value in `[0, S)` to the item whose cell contains it.
    ///
    /// `r >= S` (only reachable through rounding) maps to the last drawable
    /// item. Returns `None` only for a degenerate grid.
    pub fn locate(&self, r: f64) -> Option<usize> {
        if self.is_degenerate() {
            return None;
        }
        let r = r.max(0.0);
        // first cell whose upper bound exceeds r; empty cells are skipped
        // because their upper bound equals their lower bound
        let i = self.bounds[1..].partition_point(|&b| b <= r);
        if i < self.len() {
            Some(i)
        } else {
            self.last_drawable()
        }
    }

    /// Check `amount` against this grid.
    ///
    /// Without replacement the amount may not exceed the item count, nor the
    /// number of drawable items when the grid is not degenerate.
    pub fn admit(&self, amount: usize, repetitive: bool) -> Result<Admission, PickError> {
        admit(amount, repetitive, self.len(), self.drawable_count())
    }
}

/// Check `amount` against `len` items of which `drawable` have positive
/// weight. No drawable item at all means there is nothing to do.
pub fn admit(
    amount: usize,
    repetitive: bool,
    len: usize,
    drawable: usize,
) -> Result<Admission, PickError> {
    if amount == 0 {
        return Ok(Admission::Empty);
    }
    if !repetitive && amount > len {
        return Err(PickError::InvalidAmount {
            amount,
            available: len,
        });
    }
    if drawable == 0 {
        return Ok(Admission::Empty);
    }
    if !repetitive && amount > drawable {
        return Err(PickError::InvalidAmount {
            amount,
            available: drawable,
        });
    }
    Ok(Admission::Proceed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(weights: &[f64]) -> CumulativeGrid {
        CumulativeGrid::from_weights(weights)
    }

    #[test]
    fn bounds_are_cumulative() {
        let g = grid(&[1.0, 1.0, 2.0]);
        assert_eq!(g.bounds(), &[0.0, 1.0, 2.0, 4.0]);
        assert_eq!(g.len(), 3);
        assert_eq!(g.width(), 4.0);
        assert_eq!(g.cell_width(2), 2.0);
    }

    #[test]
    fn admit_counts_only_drawable_items() {
        assert_eq!(admit(0, false, 3, 3), Ok(Admission::Empty));
        assert_eq!(admit(2, false, 3, 0), Ok(Admission::Empty));
        assert_eq!(admit(2, false, 3, 2), Ok(Admission::Proceed));
        assert_eq!(
            admit(3, false, 3, 2),
            Err(PickError::InvalidAmount {
                amount: 3,
                available: 2
            })
        );
        assert_eq!(admit(9, true, 3, 1), Ok(Admission::Proceed));
    }

    #[test]
    fn inverted_set_builds_inverted_grid() {
        let mut set = WeightedSet::from_pairs([("A", 1.0), ("B", 2.0)]).unwrap();
        set.inverted = true;
        let g = CumulativeGrid::build(&set);
        assert_eq!(g.bounds(), &[0.0, 1.0, 1.5]);
    }

    #[test]
    fn locate_uses_half_open_cells() {
        let g = grid(&[1.0, 1.0, 2.0]);
        assert_eq!(g.locate(0.0), Some(0));
        assert_eq!(g.locate(0.999), Some(0));
        assert_eq!(g.locate(1.0), Some(1));
        assert_eq!(g.locate(2.0), Some(2));
        assert_eq!(g.locate(3.999), Some(2));
    }

    #[test]
    fn locate_boundary_maps_to_last_drawable() {
        let g = grid(&[1.0, 1.0, 2.0]);
        assert_eq!(g.locate(4.0), Some(2));

        let trailing_zero = grid(&[1.0, 2.0, 0.0]);
        assert_eq!(trailing_zero.locate(3.0), Some(1));
    }

    #[test]
    fn locate_never_hits_zero_width_cells() {
        let g = grid(&[0.0, 1.0, 0.0, 1.0, 0.0]);
        for step in 0..=200 {
            let r = step as f64 / 100.0;
            let i = g.locate(r).unwrap();
            assert!(g.cell_width(i) > 0.0, "r={r} mapped to empty cell {i}");
        }
    }

    #[test]
    fn degenerate_grid() {
        let g = grid(&[0.0, 0.0]);
        assert!(g.is_degenerate());
        assert_eq!(g.locate(0.0), None);
        assert_eq!(g.admit(1, false), Ok(Admission::Empty));
        assert!(grid(&[]).is_degenerate());
    }

    #[test]
    fn admit_amounts() {
        let g = grid(&[1.0, 0.0, 2.0]);
        assert_eq!(g.admit(0, false), Ok(Admission::Empty));
        assert_eq!(g.admit(2, false), Ok(Admission::Proceed));
        assert_eq!(
            g.admit(3, false),
            Err(PickError::InvalidAmount {
                amount: 3,
                available: 2
            })
        );
        assert_eq!(
            g.admit(4, false),
            Err(PickError::InvalidAmount {
                amount: 4,
                available: 3
            })
        );
        assert_eq!(g.admit(10, true), Ok(Admission::Proceed));
    }
}
