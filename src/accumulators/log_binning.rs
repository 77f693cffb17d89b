use crate::accumulators::{Accumulator, AccumulatorResult};
use crate::binning::{LevelSummary, LogBinner, plateau_error};
use crate::error::StatsError;
use crate::feature::Feature;
use crate::report::ReportSink;
use crate::utils::math::standard_error;
use crate::value::Value;
use serde::Serialize;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Sub};

/// Logarithmic-binning accumulator: autocorrelation-aware error bars.
///
/// Wraps a [`LogBinner`] cascade; the per-level error series and the
/// integrated autocorrelation time are exposed on the derived
/// [`LogBinningResult`].
#[derive(Debug, Clone, Default)]
pub struct LogBinningAccumulator<V: Value> {
    binner: LogBinner,
    _value: PhantomData<V>,
}

impl<V: Value> LogBinningAccumulator<V> {
    pub fn new() -> Self {
        Self {
            binner: LogBinner::new(),
            _value: PhantomData,
        }
    }

    /// Tracks level statistics only for bin sizes of at least
    /// `min_bin_size` (a power of two); shallower levels contribute to the
    /// running totals only.
    pub fn with_min_bin_size(min_bin_size: u64) -> Result<Self, StatsError> {
        Ok(Self {
            binner: LogBinner::with_min_bin_size(min_bin_size)?,
            _value: PhantomData,
        })
    }

    pub fn min_bin_size(&self) -> u64 {
        self.binner.min_bin_size()
    }

    /// Current per-level statistics, for diagnostic inspection without
    /// taking a snapshot.
    pub fn levels(&self) -> Vec<LevelSummary> {
        self.binner.levels()
    }
}

impl<V: Value> Accumulator for LogBinningAccumulator<V> {
    type Value = V;
    type Output = LogBinningResult<V>;
    const FEATURE: Feature = Feature::LogBinning;

    #[inline]
    fn push(&mut self, value: V) {
        self.binner.push(value.to_f64());
    }

    fn count(&self) -> u64 {
        self.binner.count()
    }

    fn result(&self) -> LogBinningResult<V> {
        LogBinningResult {
            count: self.binner.count(),
            sum: self.binner.sum(),
            sum_sq: self.binner.sum_sq(),
            min_bin_size: self.binner.min_bin_size(),
            levels: self.binner.levels(),
            _value: PhantomData,
        }
    }

    fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        self.binner.merge(&other.binner)
    }
}

/// Snapshot of a [`LogBinningAccumulator`]: raw totals plus the completed
/// per-level statistics. Pending partials are not part of a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct LogBinningResult<V: Value> {
    count: u64,
    sum: f64,
    sum_sq: f64,
    min_bin_size: u64,
    levels: Vec<LevelSummary>,
    #[serde(skip)]
    _value: PhantomData<V>,
}

impl<V: Value> LogBinningResult<V> {
    /// Per-level statistics, shallowest first.
    pub fn levels(&self) -> &[LevelSummary] {
        &self.levels
    }

    /// Standard error of the mean assuming uncorrelated samples; the
    /// baseline the binned error is compared against.
    pub fn naive_error(&self) -> Option<f64> {
        standard_error(self.count, self.sum, self.sum_sq)
    }
}

impl<V: Value> AccumulatorResult for LogBinningResult<V> {
    type Value = V;

    fn count(&self) -> u64 {
        self.count
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.sum / self.count as f64
    }

    fn error(&self) -> Option<f64> {
        plateau_error(&self.levels)
    }

    fn autocorrelation_time(&self) -> Option<f64> {
        crate::utils::math::autocorrelation_time(self.naive_error()?, self.error()?)
    }

    /// Folds `other`'s completed entries into `self` level by level. No
    /// re-pairing happens across the seam; pending partials were never part
    /// of either snapshot.
    fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        if self.min_bin_size != other.min_bin_size {
            return Err(StatsError::InvalidParameter(format!(
                "cannot merge results with minimum bin sizes {} and {}",
                self.min_bin_size, other.min_bin_size
            )));
        }
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        for o in &other.levels {
            if let Some(l) = self.levels.iter_mut().find(|l| l.level == o.level) {
                l.entries += o.entries;
                l.sum += o.sum;
                l.sum_sq += o.sum_sq;
            } else {
                self.levels.push(*o);
            }
        }
        self.levels.sort_by_key(|l| l.level);
        Ok(())
    }

    fn write(&self, label: &str, sink: &mut dyn ReportSink) {
        sink.entry(&format!("{label}.count"), self.count() as f64);
        sink.entry(&format!("{label}.mean"), self.mean());
        if let Some(error) = self.error() {
            sink.entry(&format!("{label}.error"), error);
        }
        if let Some(tau) = self.autocorrelation_time() {
            sink.entry(&format!("{label}.tau"), tau);
        }
        for level in &self.levels {
            let prefix = format!("{label}.level{}", level.level);
            sink.entry(&format!("{prefix}.entries"), level.entries as f64);
            if let Some(error) = level.error() {
                sink.entry(&format!("{prefix}.error"), error);
            }
        }
    }
}

impl<V: Value> Add<f64> for LogBinningResult<V> {
    type Output = Self;

    /// Shifts every underlying sample by `rhs`, exactly, at every level.
    fn add(mut self, rhs: f64) -> Self {
        let n = self.count as f64;
        self.sum_sq += 2.0 * rhs * self.sum + n * rhs * rhs;
        self.sum += rhs * n;
        for level in &mut self.levels {
            // An entry at this level spans `bin_size` samples.
            let shift = rhs * level.bin_size as f64;
            let m = level.entries as f64;
            level.sum_sq += 2.0 * shift * level.sum + m * shift * shift;
            level.sum += shift * m;
        }
        self
    }
}

impl<V: Value> Sub<f64> for LogBinningResult<V> {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        self + (-rhs)
    }
}

impl<V: Value> Mul<f64> for LogBinningResult<V> {
    type Output = Self;

    /// Scales every underlying sample by `rhs`.
    fn mul(mut self, rhs: f64) -> Self {
        self.sum *= rhs;
        self.sum_sq *= rhs * rhs;
        for level in &mut self.levels {
            level.sum *= rhs;
            level.sum_sq *= rhs * rhs;
        }
        self
    }
}

impl<V: Value> Div<f64> for LogBinningResult<V> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self * rhs.recip()
    }
}
