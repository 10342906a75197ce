//! Domain types for drawlab

pub mod item;
pub mod set;

pub use item::{is_valid_name, Item, ItemError};
pub use set::WeightedSet;

/// Item name type alias
pub type ItemName = String;
