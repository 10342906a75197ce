//! Session: one editable table plus the operations callers run against it.
//!
//! Holds the table, the engine and validator settings, and a lazily built
//! picker. Editing the table through [`Session::set_mut`] drops the picker so
//! the next draw sees the new contents.

use drawlab_core::{
    InclusionEngine, ItemName, PickError, Picker, ProbabilityTable, RngSource, WeightedSet,
};
use rand::RngCore;

use crate::validator::{ValidationConfig, ValidationReport, Validator};

/// Table plus draw / probability / validation operations.
pub struct Session {
    set: WeightedSet,
    engine: InclusionEngine,
    source: RngSource,
    validator: Validator,
    picker: Option<Picker<Box<dyn RngCore + Send>>>,
}

impl Session {
    pub fn new(set: WeightedSet) -> Self {
        Self {
            set,
            engine: InclusionEngine::default(),
            source: RngSource::default(),
            validator: Validator::default(),
            picker: None,
        }
    }

    pub fn with_engine(mut self, engine: InclusionEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Random source for [`draw`](Self::draw).
    pub fn with_rng_source(mut self, source: RngSource) -> Self {
        self.source = source;
        self.picker = None;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_validation(self, config: ValidationConfig) -> Self {
        self.with_validator(Validator::new(config))
    }

    pub fn set(&self) -> &WeightedSet {
        &self.set
    }

    /// Mutable access to items and flags.
    pub fn set_mut(&mut self) -> &mut WeightedSet {
        self.picker = None;
        &mut self.set
    }

    pub fn engine(&self) -> &InclusionEngine {
        &self.engine
    }

    /// Draw `amount` item names using the table's replacement mode.
    pub fn draw(&mut self, amount: usize) -> Result<Vec<ItemName>, PickError> {
        let picker = self
            .picker
            .get_or_insert_with(|| Picker::from_source(&self.set, self.source));
        picker.pick(amount)
    }

    /// Exact probability of each item per pick of `amount`.
    pub fn exact_probabilities(&self, amount: usize) -> Result<ProbabilityTable, PickError> {
        self.engine.exact_probabilities(&self.set, amount)
    }

    /// At-least-once probability of each item per pick of `amount`.
    pub fn appearance_probabilities(&self, amount: usize) -> Result<ProbabilityTable, PickError> {
        self.engine.appearance_probabilities(&self.set, amount)
    }

    /// Empirical frequency of each item over `trials` picks of `amount`.
    pub fn validate(&self, amount: usize, trials: usize) -> Result<ProbabilityTable, PickError> {
        self.validator.empirical_frequencies(&self.set, amount, trials)
    }

    /// Exact probabilities and empirical frequencies side by side.
    pub fn validation_report(
        &self,
        amount: usize,
        trials: usize,
    ) -> Result<ValidationReport, PickError> {
        let exact = self.exact_probabilities(amount)?;
        let empirical = self.validate(amount, trials)?;
        Ok(ValidationReport::compare(&exact, &empirical, amount, trials))
    }
}
