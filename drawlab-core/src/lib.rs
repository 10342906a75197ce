//! Drawlab Core: weighted tables, random picks and exact inclusion probabilities.
//!
//! This crate contains:
//! - Domain types (items, weighted sets with repetitive/inverted modes)
//! - The cumulative grid shared by sampling and probability computation
//! - Sequential sampling with and without replacement
//! - The exact inclusion probability engine (closed forms plus decision-tree
//!   enumeration, optionally parallel)
//! - The table text format
//! - Random sources and the deterministic seed hierarchy

pub mod distribution;
pub mod domain;
pub mod engine;
pub mod probability;
pub mod rng;
pub mod sampler;
pub mod table;

pub use distribution::{Admission, CumulativeGrid, PickError};
pub use domain::{Item, ItemError, ItemName, WeightedSet};
pub use engine::{EngineConfig, InclusionEngine};
pub use probability::ProbabilityTable;
pub use rng::{RngSource, SeedHierarchy};
pub use sampler::{pick, Picker, SequentialSampler};
pub use table::{load_table, parse_table, save_table, LoadReport, TableError};
