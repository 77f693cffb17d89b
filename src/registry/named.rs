use crate::accumulators::{Accumulator, AccumulatorResult};
use crate::error::StatsError;
use crate::feature::Feature;
use crate::report::ReportSink;
use crate::value::{Sample, Value, ValueKind};
use serde::Serialize;
use std::any::Any;
use std::fmt;

/// Type-erased snapshot of a named accumulator's headline statistics.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub feature: Feature,
    pub value_kind: ValueKind,
    pub count: u64,
    pub mean: f64,
    pub error: Option<f64>,
    pub autocorrelation_time: Option<f64>,
}

/// Object-safe face of a typed accumulator, implemented once for every
/// [`Accumulator`]. This is what the registry stores.
trait ErasedAccumulator: fmt::Debug {
    fn feature(&self) -> Feature;
    fn value_kind(&self) -> ValueKind;
    fn count(&self) -> u64;
    fn push_sample(&mut self, sample: Sample) -> Result<(), StatsError>;
    fn summary(&self) -> Summary;
    fn error(&self) -> Option<f64>;
    fn autocorrelation_time(&self) -> Option<f64>;
    fn merge_from(&mut self, other: &dyn ErasedAccumulator) -> Result<(), StatsError>;
    fn write(&self, label: &str, sink: &mut dyn ReportSink);
    fn clone_box(&self) -> Box<dyn ErasedAccumulator>;
    fn as_any(&self) -> &dyn Any;
}

impl<A: Accumulator> ErasedAccumulator for A {
    fn feature(&self) -> Feature {
        A::FEATURE
    }

    fn value_kind(&self) -> ValueKind {
        A::Value::KIND
    }

    fn count(&self) -> u64 {
        Accumulator::count(self)
    }

    fn push_sample(&mut self, sample: Sample) -> Result<(), StatsError> {
        let value = A::Value::from_sample(sample).ok_or(StatsError::TypeMismatch {
            sample,
            expected: A::Value::KIND,
        })?;
        self.push(value);
        Ok(())
    }

    fn summary(&self) -> Summary {
        let result = self.result();
        Summary {
            feature: A::FEATURE,
            value_kind: A::Value::KIND,
            count: result.count(),
            mean: result.mean(),
            error: result.error(),
            autocorrelation_time: result.autocorrelation_time(),
        }
    }

    fn error(&self) -> Option<f64> {
        self.result().error()
    }

    fn autocorrelation_time(&self) -> Option<f64> {
        self.result().autocorrelation_time()
    }

    fn merge_from(&mut self, other: &dyn ErasedAccumulator) -> Result<(), StatsError> {
        let Some(typed) = other.as_any().downcast_ref::<A>() else {
            return Err(StatsError::FeatureMismatch {
                expected_feature: A::FEATURE,
                expected_kind: A::Value::KIND,
                found_feature: other.feature(),
                found_kind: other.value_kind(),
            });
        };
        self.merge(typed)
    }

    fn write(&self, label: &str, sink: &mut dyn ReportSink) {
        self.result().write(label, sink);
    }

    fn clone_box(&self) -> Box<dyn ErasedAccumulator> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Name-bound, type-erased accumulator handle.
///
/// The name is fixed at construction and never changes afterwards; in
/// particular, [`assign`] copies the accumulator value from another wrapper
/// but leaves the target's name alone. The wrapper owns its accumulator by
/// value, so cloning a wrapper clones the accumulator state with it.
///
/// [`assign`]: NamedAccumulator::assign
#[derive(Debug)]
pub struct NamedAccumulator {
    name: String,
    inner: Box<dyn ErasedAccumulator>,
}

impl Clone for NamedAccumulator {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: self.inner.clone_box(),
        }
    }
}

impl NamedAccumulator {
    pub fn new<A: Accumulator>(name: impl Into<String>, accumulator: A) -> Self {
        Self {
            name: name.into(),
            inner: Box::new(accumulator),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature(&self) -> Feature {
        self.inner.feature()
    }

    pub fn value_kind(&self) -> ValueKind {
        self.inner.value_kind()
    }

    pub fn count(&self) -> u64 {
        self.inner.count()
    }

    /// Forwards one sample to the owned accumulator, converting it into the
    /// declared value type first.
    pub fn push(&mut self, sample: impl Into<Sample>) -> Result<(), StatsError> {
        self.inner.push_sample(sample.into())
    }

    /// Copies `other`'s accumulator value into this wrapper. The bound name
    /// is not touched; assigning a clone of a wrapper to itself leaves its
    /// state intact.
    pub fn assign(&mut self, other: &NamedAccumulator) {
        self.inner = other.inner.clone_box();
    }

    /// Headline statistics of the current state.
    pub fn summary(&self) -> Summary {
        self.inner.summary()
    }

    /// Standard error of the mean. `Err` when the bound feature never
    /// estimates one; `Ok(None)` when it does but has too few samples yet.
    pub fn error(&self) -> Result<Option<f64>, StatsError> {
        if !self.feature().provides_error() {
            return Err(StatsError::Unsupported {
                feature: self.feature(),
                capability: "error estimate",
            });
        }
        Ok(self.inner.error())
    }

    /// Integrated autocorrelation time. `Err` for non-binning features.
    pub fn autocorrelation_time(&self) -> Result<Option<f64>, StatsError> {
        if !self.feature().provides_binning() {
            return Err(StatsError::Unsupported {
                feature: self.feature(),
                capability: "autocorrelation estimate",
            });
        }
        Ok(self.inner.autocorrelation_time())
    }

    /// Borrows the owned accumulator at its concrete type.
    pub fn view<A: Accumulator>(&self) -> Result<&A, StatsError> {
        self.inner
            .as_any()
            .downcast_ref::<A>()
            .ok_or(StatsError::FeatureMismatch {
                expected_feature: A::FEATURE,
                expected_kind: A::Value::KIND,
                found_feature: self.feature(),
                found_kind: self.value_kind(),
            })
    }

    /// Derives a typed result snapshot from the owned accumulator.
    pub fn result_of<A: Accumulator>(&self) -> Result<A::Output, StatsError> {
        Ok(self.view::<A>()?.result())
    }

    /// Folds `other`'s accumulator into this one. Both must hold the same
    /// feature and value type.
    pub fn merge_from(&mut self, other: &NamedAccumulator) -> Result<(), StatsError> {
        self.inner.merge_from(other.inner.as_ref())
    }

    /// Emits the current statistics under the bound name.
    pub fn write(&self, sink: &mut dyn ReportSink) {
        self.inner.write(&self.name, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulators::{
        LogBinningAccumulator, MeanAccumulator, NoBinningAccumulator,
    };
    use crate::report::ReportTable;

    const EPS: f64 = 1e-12;

    #[test]
    fn assign_copies_the_value_but_not_the_name() {
        let mut rhs = NamedAccumulator::new("rhs", NoBinningAccumulator::<f64>::new());
        rhs.push(10.0).unwrap();
        let mut lhs = NamedAccumulator::new("lhs", NoBinningAccumulator::<f64>::new());

        lhs.assign(&rhs);

        assert_eq!(lhs.name(), "lhs");
        assert_eq!(lhs.count(), 1);
        assert!((lhs.summary().mean - 10.0).abs() < EPS);
    }

    #[test]
    fn assign_is_a_deep_copy() {
        let mut rhs = NamedAccumulator::new("rhs", MeanAccumulator::<f64>::new());
        let mut lhs = NamedAccumulator::new("lhs", MeanAccumulator::<f64>::new());
        lhs.assign(&rhs);
        rhs.push(5.0).unwrap();

        assert_eq!(lhs.count(), 0);
        assert_eq!(rhs.count(), 1);
    }

    #[test]
    fn assign_carries_the_concrete_type_across() {
        let rhs = NamedAccumulator::new("rhs", LogBinningAccumulator::<f64>::new());
        let mut lhs = NamedAccumulator::new("lhs", MeanAccumulator::<f64>::new());

        lhs.assign(&rhs);
        assert_eq!(lhs.feature(), Feature::LogBinning);
        assert_eq!(lhs.name(), "lhs");
    }

    #[test]
    fn self_assignment_through_a_clone_preserves_state() {
        let mut w = NamedAccumulator::new("w", NoBinningAccumulator::<f64>::new());
        w.push(1.0).unwrap();

        let snapshot = w.clone();
        w.assign(&snapshot);
        w.push(2.0).unwrap();
        w.push(3.0).unwrap();

        assert_eq!(w.count(), 3);
        assert!((w.summary().mean - 2.0).abs() < EPS);
    }

    #[test]
    fn push_rejects_inconvertible_samples() {
        let mut w = NamedAccumulator::new("n", MeanAccumulator::<i64>::new());
        w.push(2.0).unwrap(); // integral, converts
        let err = w.push(1.5).unwrap_err();
        assert!(matches!(err, StatsError::TypeMismatch { .. }));
        assert_eq!(w.count(), 1);
    }

    #[test]
    fn missing_capabilities_surface_as_errors() {
        let mean = NamedAccumulator::new("m", MeanAccumulator::<f64>::new());
        assert!(matches!(
            mean.error(),
            Err(StatsError::Unsupported { .. })
        ));

        let plain = NamedAccumulator::new("p", NoBinningAccumulator::<f64>::new());
        assert!(matches!(
            plain.autocorrelation_time(),
            Err(StatsError::Unsupported { .. })
        ));
        // The capability exists but two samples are needed first.
        assert_eq!(plain.error().unwrap(), None);
    }

    #[test]
    fn typed_access_checks_the_concrete_type() {
        let mut w = NamedAccumulator::new("x", NoBinningAccumulator::<f64>::new());
        w.push(1.0).unwrap();
        w.push(2.0).unwrap();

        let r = w.result_of::<NoBinningAccumulator<f64>>().unwrap();
        assert_eq!(r.count(), 2);

        let err = w.result_of::<MeanAccumulator<f64>>().unwrap_err();
        assert!(matches!(err, StatsError::FeatureMismatch { .. }));
        let err = w.view::<NoBinningAccumulator<f32>>().unwrap_err();
        assert!(matches!(err, StatsError::FeatureMismatch { .. }));
    }

    #[test]
    fn merge_requires_matching_feature_and_value_type() {
        let mut a = NamedAccumulator::new("a", MeanAccumulator::<f64>::new());
        let b = NamedAccumulator::new("b", MeanAccumulator::<f64>::new());
        let c = NamedAccumulator::new("c", NoBinningAccumulator::<f64>::new());

        a.merge_from(&b).unwrap();
        let err = a.merge_from(&c).unwrap_err();
        assert!(matches!(err, StatsError::FeatureMismatch { .. }));
    }

    #[test]
    fn write_uses_the_bound_name_as_label() {
        let mut w = NamedAccumulator::new("energy", NoBinningAccumulator::<f64>::new());
        w.push(1.0).unwrap();
        w.push(2.0).unwrap();

        let mut table = ReportTable::default();
        w.write(&mut table);
        assert_eq!(table.value_of("energy.count"), Some(2.0));
        assert_eq!(table.value_of("energy.mean"), Some(1.5));
    }
}
