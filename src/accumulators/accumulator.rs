use crate::error::StatsError;
use crate::feature::Feature;
use crate::report::ReportSink;
use crate::utils::math::two_sided_tail;
use crate::value::Value;
use std::fmt;

/// Mutable running aggregator of one sample stream.
///
/// Implementations come in accumulator/result pairs, one per [`Feature`]:
/// the accumulator consumes samples, the [`Output`] is an immutable snapshot
/// derived from it.
///
/// [`Output`]: Accumulator::Output
pub trait Accumulator: Clone + fmt::Debug + 'static {
    /// Scalar type this accumulator is declared over.
    type Value: Value;

    /// Immutable snapshot type derived by [`result`].
    ///
    /// [`result`]: Accumulator::result
    type Output: AccumulatorResult<Value = Self::Value>;

    /// The statistical capability this pair implements.
    const FEATURE: Feature;

    /// Incorporates one sample. O(1) amortized; NaN and infinities propagate
    /// per IEEE semantics, they are not trapped.
    fn push(&mut self, value: Self::Value);

    /// Samples consumed so far.
    fn count(&self) -> u64;

    /// Derives a snapshot of the current statistics. Non-destructive:
    /// repeated calls are idempotent and leave the accumulator untouched.
    fn result(&self) -> Self::Output;

    /// Folds `other` into `self`, so that `self` afterwards represents the
    /// union of both sample streams. Counts add; binning features combine
    /// their buffers level by level and cascade newly completed pairs
    /// upward.
    fn merge(&mut self, other: &Self) -> Result<(), StatsError>;
}

/// Immutable snapshot of an accumulator's statistics.
///
/// Owns every number it needs; no back-reference to the source accumulator.
/// Capabilities a feature does not provide resolve to `None` rather than
/// failing, so generic code can probe them.
pub trait AccumulatorResult: Clone + fmt::Debug + 'static {
    type Value: Value;

    fn count(&self) -> u64;

    fn mean(&self) -> f64;

    /// Standard error of the mean, if this feature estimates one.
    fn error(&self) -> Option<f64> {
        None
    }

    /// Integrated autocorrelation time, if this feature estimates one.
    fn autocorrelation_time(&self) -> Option<f64> {
        None
    }

    /// Folds `other` into `self` as the union of the underlying streams.
    fn merge(&mut self, other: &Self) -> Result<(), StatsError>;

    /// Two-sided probability that the measured mean deviates from
    /// `reference` by at least the observed amount, under a Gaussian error
    /// model. `None` without a usable error estimate.
    fn p_value(&self, reference: f64) -> Option<f64> {
        let error = self.error()?;
        if error == 0.0 {
            return None;
        }
        Some(two_sided_tail((self.mean() - reference) / error))
    }

    /// Emits the statistics as flat key/value entries namespaced by `label`.
    ///
    /// The default covers count, mean and the optional error and
    /// autocorrelation time; binning features extend it with per-level
    /// diagnostics.
    fn write(&self, label: &str, sink: &mut dyn ReportSink) {
        sink.entry(&format!("{label}.count"), self.count() as f64);
        sink.entry(&format!("{label}.mean"), self.mean());
        if let Some(error) = self.error() {
            sink.entry(&format!("{label}.error"), error);
        }
        if let Some(tau) = self.autocorrelation_time() {
            sink.entry(&format!("{label}.tau"), tau);
        }
    }
}
