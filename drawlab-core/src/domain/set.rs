//! WeightedSet: ordered, uniquely named items plus the two drawing modes.

use serde::{Deserialize, Serialize};

use super::item::{Item, ItemError};

/// Ordered collection of uniquely named items.
///
/// Insertion order is preserved and defines the index space shared by the
/// cumulative grid, the sampler and the probability engine. Re-inserting an
/// existing name updates its weight in place.
///
/// Computations never borrow a set across a mutation: every draw or
/// probability call takes its own snapshot (a grid or a weight vector).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedSet {
    /// Allow the same item to be drawn more than once per pick.
    #[serde(default)]
    pub repetitive: bool,
    /// Use `1/weight` as the effective weight (weights encode a cost).
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    items: Vec<Item>,
}

impl WeightedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(name, weight)` pairs; later duplicates update earlier ones.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ItemError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut set = Self::new();
        for (name, weight) in pairs {
            set.upsert(name, weight)?;
        }
        Ok(set)
    }

    /// Insert a new item or update the weight of an existing one.
    pub fn upsert(&mut self, name: &str, weight: f64) -> Result<(), ItemError> {
        match self.index_of(name) {
            Some(i) => self.items[i].set_weight(weight),
            None => {
                self.items.push(Item::new(name, weight)?);
                Ok(())
            }
        }
    }

    /// Insert an already validated item (same upsert semantics).
    pub fn insert(&mut self, item: Item) {
        match self.index_of(item.name()) {
            Some(i) => self.items[i] = item,
            None => self.items.push(item),
        }
    }

    /// Remove an item by name, preserving the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<Item> {
        let i = self.index_of(name)?;
        Some(self.items.remove(i))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Item::name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|it| it.name() == name)
    }

    /// Raw (stored) weight of an item.
    pub fn weight(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.items[i].weight())
    }

    /// Effective weights in item order, after the inversion transform.
    pub fn effective_weights(&self) -> Vec<f64> {
        self.items
            .iter()
            .map(|it| it.effective_weight(self.inverted))
            .collect()
    }

    /// Number of items with positive effective weight.
    pub fn drawable_count(&self) -> usize {
        self.items
            .iter()
            .filter(|it| it.effective_weight(self.inverted) > 0.0)
            .count()
    }

    /// True if every item is drawable and all effective weights are equal.
    pub fn is_fair(&self) -> bool {
        let mut weights = self.items.iter().map(|it| it.effective_weight(self.inverted));
        let Some(first) = weights.next() else {
            return false;
        };
        first > 0.0 && weights.all(|w| w == first)
    }

    /// Multiply every weight by `factor`.
    pub fn scale(&mut self, factor: f64) -> Result<(), ItemError> {
        // validate once up front so a failure leaves the set untouched
        for item in &self.items {
            Item::new(item.name(), item.weight() * factor)?;
        }
        for item in &mut self.items {
            item.set_weight(item.weight() * factor)?;
        }
        Ok(())
    }

    /// Store `1/w` for every positive weight and toggle `inverted`.
    ///
    /// Effective weights are unchanged; zero weights stay zero. Fails without
    /// touching the set if some `1/w` is not a valid weight.
    pub fn bake_inversion(&mut self) -> Result<(), ItemError> {
        let baked = self
            .items
            .iter()
            .map(|item| match item.weight() {
                w if w > 0.0 => Item::new(item.name(), w.recip()),
                _ => Ok(item.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.items = baked;
        self.inverted = !self.inverted;
        Ok(())
    }

    /// Parse a set from its TOML representation.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let set: WeightedSet = toml::from_str(content)?;
        Ok(set.deduplicated())
    }

    /// Serialize the set to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    fn deduplicated(self) -> Self {
        let mut out = Self {
            repetitive: self.repetitive,
            inverted: self.inverted,
            items: Vec::with_capacity(self.items.len()),
        };
        for item in self.items {
            out.insert(item);
        }
        out
    }
}
