//! Item: a named, non-negative weight.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single entry of a weighted table.
///
/// Names are restricted to ASCII letters, digits and underscore so that they
/// survive the whitespace-separated table format unchanged. Weights are finite
/// and never negative; a weight of zero is legal and makes the item
/// unreachable. A positive weight must have a finite reciprocal so that the
/// inverted mode stays finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawItem")]
pub struct Item {
    name: String,
    weight: f64,
}

/// Errors from item construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemError {
    #[error("invalid item name '{0}': use ASCII letters, digits or '_'")]
    InvalidName(String),
    #[error("negative weight {weight} for item '{name}'")]
    NegativeWeight { name: String, weight: f64 },
    #[error("weight of item '{name}' is not a finite number")]
    NonFiniteWeight { name: String },
    #[error("weight {weight} of item '{name}' is too small to invert")]
    NotInvertible { name: String, weight: f64 },
}

impl Item {
    pub fn new(name: impl Into<String>, weight: f64) -> Result<Self, ItemError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(ItemError::InvalidName(name));
        }
        check_weight(&name, weight)?;
        Ok(Self { name, weight })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Replace the weight, keeping the old one if the new value is invalid.
    pub fn set_weight(&mut self, weight: f64) -> Result<(), ItemError> {
        check_weight(&self.name, weight)?;
        self.weight = weight;
        Ok(())
    }

    /// Weight used for drawing and probability computation.
    ///
    /// With `inverted`, a positive weight `w` becomes `1/w` and zero stays zero.
    #[inline]
    pub fn effective_weight(&self, inverted: bool) -> f64 {
        if inverted {
            if self.weight > 0.0 {
                1.0 / self.weight
            } else {
                0.0
            }
        } else {
            self.weight
        }
    }
}

/// Returns true if `name` is a non-empty run of ASCII letters, digits or '_'.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b == b'_' || b.is_ascii_alphanumeric())
}

fn check_weight(name: &str, weight: f64) -> Result<(), ItemError> {
    if !weight.is_finite() {
        return Err(ItemError::NonFiniteWeight { name: name.into() });
    }
    if weight < 0.0 {
        return Err(ItemError::NegativeWeight {
            name: name.into(),
            weight,
        });
    }
    if weight > 0.0 && !weight.recip().is_finite() {
        return Err(ItemError::NotInvertible {
            name: name.into(),
            weight,
        });
    }
    Ok(())
}

#[derive(Deserialize)]
struct RawItem {
    name: String,
    weight: f64,
}

impl TryFrom<RawItem> for Item {
    type Error = ItemError;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        Item::new(raw.name, raw.weight)
    }
}
