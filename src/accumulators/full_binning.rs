use crate::accumulators::{Accumulator, AccumulatorResult};
use crate::binning::FullBinner;
use crate::error::StatsError;
use crate::feature::Feature;
use crate::report::ReportSink;
use crate::utils::math::standard_error;
use crate::value::Value;
use serde::Serialize;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Sub};

/// Full-binning accumulator: retains realized bin means, so jackknife
/// estimates stay derivable from the snapshot.
#[derive(Debug, Clone, Default)]
pub struct FullBinningAccumulator<V: Value> {
    binner: FullBinner,
    _value: PhantomData<V>,
}

impl<V: Value> FullBinningAccumulator<V> {
    pub fn new() -> Self {
        Self {
            binner: FullBinner::new(),
            _value: PhantomData,
        }
    }

    /// Bounds the bin buffer at `max_bins` (even, at least 2); when full,
    /// adjacent bins collapse pairwise and the bin size doubles.
    pub fn with_max_bins(max_bins: usize) -> Result<Self, StatsError> {
        Ok(Self {
            binner: FullBinner::with_max_bins(max_bins)?,
            _value: PhantomData,
        })
    }

    pub fn max_bins(&self) -> usize {
        self.binner.max_bins()
    }
}

impl<V: Value> Accumulator for FullBinningAccumulator<V> {
    type Value = V;
    type Output = FullBinningResult<V>;
    const FEATURE: Feature = Feature::FullBinning;

    #[inline]
    fn push(&mut self, value: V) {
        self.binner.push(value.to_f64());
    }

    fn count(&self) -> u64 {
        self.binner.count()
    }

    fn result(&self) -> FullBinningResult<V> {
        FullBinningResult {
            count: self.binner.count(),
            sum: self.binner.sum(),
            sum_sq: self.binner.sum_sq(),
            bin_size: self.binner.bin_size(),
            bins: self.binner.bins().to_vec(),
            _value: PhantomData,
        }
    }

    fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        self.binner.merge(&other.binner)
    }
}

/// Snapshot of a [`FullBinningAccumulator`]: raw totals plus the realized
/// bin means at the snapshot's granularity. The pending bin is not part of a
/// snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct FullBinningResult<V: Value> {
    count: u64,
    sum: f64,
    sum_sq: f64,
    bin_size: u64,
    bins: Vec<f64>,
    #[serde(skip)]
    _value: PhantomData<V>,
}

impl<V: Value> FullBinningResult<V> {
    /// Raw samples per realized bin.
    pub fn bin_size(&self) -> u64 {
        self.bin_size
    }

    /// Realized bin means, in stream order.
    pub fn bin_means(&self) -> &[f64] {
        &self.bins
    }

    /// Standard error of the mean assuming uncorrelated samples.
    pub fn naive_error(&self) -> Option<f64> {
        standard_error(self.count, self.sum, self.sum_sq)
    }

    /// Leave-one-bin-out means, in bin order.
    pub fn jackknife_means(&self) -> Vec<f64> {
        let m = self.bins.len();
        if m < 2 {
            return Vec::new();
        }
        let total: f64 = self.bins.iter().sum();
        self.bins
            .iter()
            .map(|b| (total - b) / (m as f64 - 1.0))
            .collect()
    }

    /// Jackknife estimate of the standard error of the mean.
    pub fn jackknife_error(&self) -> Option<f64> {
        let m = self.bins.len();
        if m < 2 {
            return None;
        }
        let m_f = m as f64;
        let pseudo = self.jackknife_means();
        let pseudo_mean = pseudo.iter().sum::<f64>() / m_f;
        let ss: f64 = pseudo
            .iter()
            .map(|x| (x - pseudo_mean) * (x - pseudo_mean))
            .sum();
        Some(((m_f - 1.0) / m_f * ss).sqrt())
    }
}

impl<V: Value> AccumulatorResult for FullBinningResult<V> {
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
        let m = self.bins.len();
        if m < 2 {
            return None;
        }
        let m_f = m as f64;
        let mean = self.bins.iter().sum::<f64>() / m_f;
        let variance = self
            .bins
            .iter()
            .map(|b| (b - mean) * (b - mean))
            .sum::<f64>()
            / (m_f - 1.0);
        Some((variance / m_f).sqrt())
    }

    fn autocorrelation_time(&self) -> Option<f64> {
        crate::utils::math::autocorrelation_time(self.naive_error()?, self.error()?)
    }

    /// Concatenates `other`'s bins after `self`'s. Both snapshots must share
    /// one bin size; coarsening happens on accumulators, not on snapshots.
    fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        if self.bin_size != other.bin_size {
            return Err(StatsError::InvalidParameter(format!(
                "cannot merge results with bin sizes {} and {}",
                self.bin_size, other.bin_size
            )));
        }
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.bins.extend_from_slice(&other.bins);
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
        sink.entry(&format!("{label}.bin_size"), self.bin_size as f64);
        sink.entry(&format!("{label}.bins"), self.bins.len() as f64);
        if let Some(error) = self.jackknife_error() {
            sink.entry(&format!("{label}.jackknife_error"), error);
        }
    }
}

impl<V: Value> Add<f64> for FullBinningResult<V> {
    type Output = Self;

    /// Shifts every underlying sample by `rhs`; bin means shift with it.
    fn add(mut self, rhs: f64) -> Self {
        let n = self.count as f64;
        self.sum_sq += 2.0 * rhs * self.sum + n * rhs * rhs;
        self.sum += rhs * n;
        for b in &mut self.bins {
            *b += rhs;
        }
        self
    }
}

impl<V: Value> Sub<f64> for FullBinningResult<V> {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        self + (-rhs)
    }
}

impl<V: Value> Mul<f64> for FullBinningResult<V> {
    type Output = Self;

    /// Scales every underlying sample by `rhs`.
    fn mul(mut self, rhs: f64) -> Self {
        self.sum *= rhs;
        self.sum_sq *= rhs * rhs;
        for b in &mut self.bins {
            *b *= rhs;
        }
        self
    }
}

impl<V: Value> Div<f64> for FullBinningResult<V> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self * rhs.recip()
    }
}
