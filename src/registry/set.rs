use crate::error::StatsError;
use crate::registry::NamedAccumulator;
use crate::report::ReportSink;
use crate::value::Sample;
use std::collections::HashMap;

/// Insertion-ordered, name-keyed registry of accumulators.
///
/// Samples pushed into the set fan out to every entry in insertion order.
/// Names are unique: inserting under a name that is already present fails
/// fast and leaves the set unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccumulatorSet {
    entries: Vec<NamedAccumulator>,
    index: HashMap<String, usize>,
}

impl AccumulatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registers a wrapper under its bound name.
    pub fn insert(&mut self, accumulator: NamedAccumulator) -> Result<(), StatsError> {
        if self.contains(accumulator.name()) {
            return Err(StatsError::DuplicateName(accumulator.name().to_string()));
        }
        self.index
            .insert(accumulator.name().to_string(), self.entries.len());
        self.entries.push(accumulator);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&NamedAccumulator, StatsError> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| StatsError::NotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut NamedAccumulator, StatsError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.entries[i]),
            None => Err(StatsError::NotFound(name.to_string())),
        }
    }

    /// Fans one sample out to every entry, in insertion order.
    ///
    /// The first conversion failure aborts the fan-out with `TypeMismatch`;
    /// entries visited before the failure keep the sample.
    pub fn push(&mut self, sample: impl Into<Sample>) -> Result<(), StatsError> {
        let sample = sample.into();
        for entry in &mut self.entries {
            entry.push(sample)?;
        }
        Ok(())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &NamedAccumulator> {
        self.entries.iter()
    }

    /// Registered names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name())
    }

    /// Folds `other`'s entries into this set's entries of the same name;
    /// the merge phase after per-worker measurement. Fails with `NotFound`
    /// if a name is missing here and with `FeatureMismatch` if the paired
    /// accumulators disagree on feature or value type.
    pub fn merge_from(&mut self, other: &AccumulatorSet) -> Result<(), StatsError> {
        for theirs in other.iter() {
            let ours = match self.index.get(theirs.name()) {
                Some(&i) => &mut self.entries[i],
                None => return Err(StatsError::NotFound(theirs.name().to_string())),
            };
            ours.merge_from(theirs)?;
        }
        Ok(())
    }

    /// Emits every entry's statistics, in insertion order.
    pub fn write(&self, sink: &mut dyn ReportSink) {
        for entry in &self.entries {
            entry.write(sink);
        }
    }
}
