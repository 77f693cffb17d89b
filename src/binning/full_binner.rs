use crate::error::StatsError;
use crate::utils::math::standard_error;

/// Default bound on the number of realized bins.
const DEFAULT_MAX_BINS: usize = 128;

/// Full-binning engine: a bounded buffer of realized bin means.
///
/// Raw samples accumulate in a pending bin; every `bin_size` samples its mean
/// is appended to the buffer. When the buffer holds `max_bins` bins, adjacent
/// bins collapse pairwise and the bin size doubles, so memory stays bounded
/// while the realized means at the current granularity remain available for
/// jackknife estimates. The pending bin is part of the raw running totals but
/// never of the bin statistics.
#[derive(Debug, Clone)]
pub struct FullBinner {
    max_bins: usize,
    bin_size: u64,
    bins: Vec<f64>,
    partial_sum: f64,
    partial_count: u64,
    count: u64,
    sum: f64,
    sum_sq: f64,
}

impl FullBinner {
    pub fn new() -> Self {
        Self {
            max_bins: DEFAULT_MAX_BINS,
            bin_size: 1,
            bins: Vec::new(),
            partial_sum: 0.0,
            partial_count: 0,
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// `max_bins` must be even and at least 2.
    pub fn with_max_bins(max_bins: usize) -> Result<Self, StatsError> {
        if max_bins < 2 || max_bins % 2 != 0 {
            return Err(StatsError::InvalidParameter(format!(
                "maximum bin count must be even and at least 2, got {max_bins}"
            )));
        }
        Ok(Self {
            max_bins,
            ..Self::new()
        })
    }

    pub fn max_bins(&self) -> usize {
        self.max_bins
    }

    /// Raw samples per realized bin at the current granularity.
    pub fn bin_size(&self) -> u64 {
        self.bin_size
    }

    /// Realized bin means, in stream order.
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Raw samples sitting in the pending bin.
    pub fn pending_count(&self) -> u64 {
        self.partial_count
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.sum / self.count as f64
    }

    /// Standard error of the mean assuming uncorrelated samples.
    pub fn naive_error(&self) -> Option<f64> {
        standard_error(self.count, self.sum, self.sum_sq)
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.sum_sq += x * x;
        self.partial_sum += x;
        self.partial_count += 1;
        if self.partial_count == self.bin_size {
            let mean = self.partial_sum / self.bin_size as f64;
            self.bins.push(mean);
            self.partial_sum = 0.0;
            self.partial_count = 0;
            if self.bins.len() == self.max_bins {
                self.compact();
            }
        }
    }

    /// Collapses adjacent bins pairwise and doubles the bin size. An odd tail
    /// bin returns to pending state at the new granularity, ahead of any
    /// samples already pending.
    fn compact(&mut self) {
        let mut compacted = Vec::with_capacity(self.bins.len() / 2 + 1);
        let mut pairs = self.bins.chunks_exact(2);
        for pair in &mut pairs {
            compacted.push(0.5 * (pair[0] + pair[1]));
        }
        if let [tail] = pairs.remainder() {
            self.partial_sum += tail * self.bin_size as f64;
            self.partial_count += self.bin_size;
        }
        self.bins = compacted;
        self.bin_size *= 2;
    }

    /// Standard error of the mean estimated from the realized bin means.
    ///
    /// `None` with fewer than two realized bins.
    pub fn error(&self) -> Option<f64> {
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

    /// Leave-one-bin-out means, in bin order. Empty with fewer than two bins.
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

    /// Folds `other` into `self`: the finer operand is coarsened to the
    /// common bin size, then `other`'s bins follow `self`'s in stream order
    /// and the pending bins combine.
    ///
    /// Exactly equivalent to feeding `other`'s samples after `self`'s when
    /// `self` has no pending samples at the common granularity. Combined
    /// pending samples that fill a bin realize it with their true mean even
    /// when the seam bin spans more samples than the nominal bin size.
    pub fn merge(&mut self, other: &FullBinner) -> Result<(), StatsError> {
        if self.max_bins != other.max_bins {
            return Err(StatsError::InvalidParameter(format!(
                "cannot merge binners with maximum bin counts {} and {}",
                self.max_bins, other.max_bins
            )));
        }

        let mut o;
        let other = if other.bin_size < self.bin_size {
            o = other.clone();
            while o.bin_size < self.bin_size {
                o.compact();
            }
            &o
        } else {
            while self.bin_size < other.bin_size {
                self.compact();
            }
            other
        };

        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.bins.extend_from_slice(&other.bins);
        self.partial_sum += other.partial_sum;
        self.partial_count += other.partial_count;

        if self.partial_count >= self.bin_size {
            let mean = self.partial_sum / self.partial_count as f64;
            self.bins.push(mean);
            self.partial_sum = 0.0;
            self.partial_count = 0;
        }
        while self.bins.len() >= self.max_bins {
            self.compact();
        }
        Ok(())
    }
}

impl Default for FullBinner {
    fn default() -> Self {
        Self::new()
    }
}
