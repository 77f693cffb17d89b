use crate::error::StatsError;
use crate::utils::math::{autocorrelation_time, standard_error};
use serde::Serialize;

/// Completed entries at a level must reach this population before the level
/// is considered for the plateau error estimate.
const MIN_PLATEAU_ENTRIES: u64 = 16;

/// One binning level of the logarithmic cascade.
///
/// `sum`, `sum_sq` and `entries` cover every completed entry observed at this
/// level. `partial` holds the single entry still waiting for its pair; it is
/// part of the raw running totals but not of any level statistics.
#[derive(Debug, Clone, Copy, Default)]
struct BinLevel {
    sum: f64,
    sum_sq: f64,
    entries: u64,
    partial: f64,
    has_partial: bool,
}

/// Snapshot of one tracked binning level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelSummary {
    /// Cascade depth; an entry at this level aggregates `2^level` samples.
    pub level: u32,
    /// Number of raw samples per completed entry (`2^level`).
    pub bin_size: u64,
    /// Completed entries at this level.
    pub entries: u64,
    /// Sum of completed entries.
    pub sum: f64,
    /// Sum of squared completed entries.
    pub sum_sq: f64,
}

impl LevelSummary {
    /// Mean of the bin means at this level.
    pub fn mean(&self) -> f64 {
        if self.entries == 0 {
            return f64::NAN;
        }
        self.sum / (self.entries as f64 * self.bin_size as f64)
    }

    /// Standard error of the mean estimated from the bin means at this level.
    ///
    /// `None` with fewer than two completed entries.
    pub fn error(&self) -> Option<f64> {
        if self.entries < 2 {
            return None;
        }
        let m = self.entries as f64;
        let b = self.bin_size as f64;
        let mean = self.mean();
        let mean_sq = self.sum_sq / (b * b) / m;
        let variance = ((mean_sq - mean * mean) * m / (m - 1.0)).max(0.0);
        Some((variance / m).sqrt())
    }
}

/// Plateau selection over a level series: the deepest level with at least
/// [`MIN_PLATEAU_ENTRIES`] completed entries, falling back to the deepest
/// with at least two.
pub(crate) fn plateau_error(levels: &[LevelSummary]) -> Option<f64> {
    levels
        .iter()
        .rev()
        .find(|l| l.entries >= MIN_PLATEAU_ENTRIES)
        .or_else(|| levels.iter().rev().find(|l| l.entries >= 2))
        .and_then(|l| l.error())
}

/// Logarithmic-binning engine.
///
/// Every sample is one entry at level 0; two completed entries at level `i`
/// emit their sum to level `i + 1`, so an entry at level `i` spans `2^i`
/// consecutive samples. An odd entry count leaves one pending partial per
/// level, included in the raw running totals and excluded from level
/// statistics until its pair arrives.
///
/// Levels whose bin capacity is below the configured minimum bin size keep
/// the cascade running but record no statistics; only the raw running totals
/// cover those samples.
#[derive(Debug, Clone)]
pub struct LogBinner {
    min_bin_size: u64,
    count: u64,
    sum: f64,
    sum_sq: f64,
    levels: Vec<BinLevel>,
}

impl LogBinner {
    pub fn new() -> Self {
        Self {
            min_bin_size: 1,
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            levels: Vec::new(),
        }
    }

    /// `min_bin_size` must be a power of two.
    pub fn with_min_bin_size(min_bin_size: u64) -> Result<Self, StatsError> {
        if min_bin_size == 0 || !min_bin_size.is_power_of_two() {
            return Err(StatsError::InvalidParameter(format!(
                "minimum bin size must be a power of two, got {min_bin_size}"
            )));
        }
        Ok(Self {
            min_bin_size,
            ..Self::new()
        })
    }

    pub fn min_bin_size(&self) -> u64 {
        self.min_bin_size
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
        self.feed(0, x);
    }

    fn tracked(&self, level: usize) -> bool {
        (1u64 << level) >= self.min_bin_size
    }

    fn feed(&mut self, level: usize, entry: f64) {
        let mut level = level;
        let mut entry = entry;
        loop {
            if self.levels.len() == level {
                self.levels.push(BinLevel::default());
            }
            if self.tracked(level) {
                let l = &mut self.levels[level];
                l.entries += 1;
                l.sum += entry;
                l.sum_sq += entry * entry;
            }
            let l = &mut self.levels[level];
            if !l.has_partial {
                l.partial = entry;
                l.has_partial = true;
                return;
            }
            let carry = l.partial + entry;
            l.partial = 0.0;
            l.has_partial = false;
            level += 1;
            entry = carry;
        }
    }

    /// Number of cascade levels touched so far.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Whether one un-paired entry is pending at `level`.
    pub fn has_pending(&self, level: usize) -> bool {
        self.levels.get(level).is_some_and(|l| l.has_partial)
    }

    /// Snapshot of one tracked level; `None` for untracked or untouched
    /// levels.
    pub fn level(&self, level: usize) -> Option<LevelSummary> {
        if !self.tracked(level) {
            return None;
        }
        self.levels.get(level).map(|l| LevelSummary {
            level: level as u32,
            bin_size: 1u64 << level,
            entries: l.entries,
            sum: l.sum,
            sum_sq: l.sum_sq,
        })
    }

    /// Snapshots of all tracked levels with at least one completed entry, in
    /// cascade order.
    pub fn levels(&self) -> Vec<LevelSummary> {
        (0..self.levels.len())
            .filter_map(|i| self.level(i))
            .filter(|l| l.entries > 0)
            .collect()
    }

    /// Binned standard error of the mean.
    ///
    /// Taken from the deepest tracked level with at least 16 completed
    /// entries, falling back to the deepest level with at least two. `None`
    /// when no level qualifies.
    pub fn error(&self) -> Option<f64> {
        plateau_error(&self.levels())
    }

    /// Integrated autocorrelation time estimated from the ratio of the binned
    /// to the naive error. Noisy estimates can come out slightly negative.
    pub fn tau(&self) -> Option<f64> {
        autocorrelation_time(self.naive_error()?, self.error()?)
    }

    /// Folds `other` into `self`, combining level statistics and pairing the
    /// leftover partials (newly completed pairs cascade upward).
    ///
    /// The result is exactly what feeding `other`'s samples after `self`'s
    /// would have produced whenever `self` has no pending partial at any
    /// level `other` populates; the raw running totals are exact in every
    /// case.
    pub fn merge(&mut self, other: &LogBinner) -> Result<(), StatsError> {
        if self.min_bin_size != other.min_bin_size {
            return Err(StatsError::InvalidParameter(format!(
                "cannot merge binners with minimum bin sizes {} and {}",
                self.min_bin_size, other.min_bin_size
            )));
        }

        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;

        let mut carries: Vec<(usize, f64)> = Vec::new();
        for (i, o) in other.levels.iter().enumerate() {
            if self.levels.len() == i {
                self.levels.push(BinLevel::default());
            }
            let l = &mut self.levels[i];
            l.entries += o.entries;
            l.sum += o.sum;
            l.sum_sq += o.sum_sq;
            match (l.has_partial, o.has_partial) {
                (true, true) => {
                    let carry = l.partial + o.partial;
                    l.partial = 0.0;
                    l.has_partial = false;
                    carries.push((i + 1, carry));
                }
                (false, true) => {
                    l.partial = o.partial;
                    l.has_partial = true;
                }
                _ => {}
            }
        }
        for (level, entry) in carries {
            self.feed(level, entry);
        }
        Ok(())
    }
}

impl Default for LogBinner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn feed_all(binner: &mut LogBinner, samples: impl IntoIterator<Item = f64>) {
        for s in samples {
            binner.push(s);
        }
    }

    #[test]
    fn single_sample_stays_unpaired() {
        let mut b = LogBinner::new();
        b.push(1.5);

        assert_eq!(b.count(), 1);
        assert!(b.has_pending(0));
        assert_eq!(b.depth(), 1);
        assert_eq!(b.level(0).unwrap().entries, 1);
        assert!(b.level(1).is_none());
    }

    #[test]
    fn second_sample_completes_the_pair() {
        let mut b = LogBinner::new();
        b.push(1.0);
        b.push(2.0);

        assert!(!b.has_pending(0));
        assert!(b.has_pending(1));
        let l1 = b.level(1).unwrap();
        assert_eq!(l1.entries, 1);
        assert!((l1.sum - 3.0).abs() < EPS);
    }

    #[test]
    fn odd_count_keeps_one_partial_per_set_bit() {
        let mut b = LogBinner::new();
        feed_all(&mut b, (1..=5).map(f64::from));

        // 5 = 0b101: partials pending at levels 0 and 2.
        assert!(b.has_pending(0));
        assert!(!b.has_pending(1));
        assert!(b.has_pending(2));
    }

    #[test]
    fn level_sums_for_four_samples() {
        let mut b = LogBinner::new();
        feed_all(&mut b, (1..=4).map(f64::from));

        let l0 = b.level(0).unwrap();
        assert_eq!(l0.entries, 4);
        assert!((l0.sum - 10.0).abs() < EPS);
        assert!((l0.sum_sq - 30.0).abs() < EPS);

        let l1 = b.level(1).unwrap();
        assert_eq!(l1.entries, 2);
        assert!((l1.sum - 10.0).abs() < EPS);
        assert!((l1.sum_sq - (9.0 + 49.0)).abs() < EPS);
        assert!((l1.mean() - 2.5).abs() < EPS);

        let l2 = b.level(2).unwrap();
        assert_eq!(l2.entries, 1);
        assert!((l2.sum - 10.0).abs() < EPS);
    }

    #[test]
    fn min_bin_size_suppresses_shallow_levels() {
        let mut b = LogBinner::with_min_bin_size(4).unwrap();
        feed_all(&mut b, (1..=8).map(f64::from));

        assert!(b.level(0).is_none());
        assert!(b.level(1).is_none());
        let l2 = b.level(2).unwrap();
        assert_eq!(l2.entries, 2);
        assert!((l2.sum - 36.0).abs() < EPS);
        // Raw totals still cover every sample.
        assert_eq!(b.count(), 8);
        assert!((b.sum() - 36.0).abs() < EPS);
        assert_eq!(b.levels().len(), 2);
    }

    #[test]
    fn min_bin_size_must_be_power_of_two() {
        assert!(matches!(
            LogBinner::with_min_bin_size(3),
            Err(StatsError::InvalidParameter(_))
        ));
        assert!(matches!(
            LogBinner::with_min_bin_size(0),
            Err(StatsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn level_error_matches_hand_computation() {
        let mut b = LogBinner::new();
        feed_all(&mut b, [1.0, 3.0, 2.0, 4.0]);

        // Level 0: samples 1, 3, 2, 4; sample variance 5/3.
        let l0 = b.level(0).unwrap();
        let expected = (5.0 / 3.0f64 / 4.0).sqrt();
        assert!((l0.error().unwrap() - expected).abs() < EPS);

        // Level 1: bin means 2 and 3; sample variance 0.5.
        let l1 = b.level(1).unwrap();
        let expected = (0.5f64 / 2.0).sqrt();
        assert!((l1.error().unwrap() - expected).abs() < EPS);
    }

    fn assert_same_levels(a: &LogBinner, b: &LogBinner) {
        assert_eq!(a.count(), b.count());
        assert!((a.sum() - b.sum()).abs() < EPS);
        assert!((a.sum_sq() - b.sum_sq()).abs() < EPS);
        assert_eq!(a.depth(), b.depth());
        for i in 0..a.depth() {
            assert_eq!(a.level(i).is_some(), b.level(i).is_some(), "level {i}");
            if let (Some(la), Some(lb)) = (a.level(i), b.level(i)) {
                assert_eq!(la.entries, lb.entries, "level {i}");
                assert!((la.sum - lb.sum).abs() < EPS, "level {i}");
                assert!((la.sum_sq - lb.sum_sq).abs() < EPS, "level {i}");
            }
            assert_eq!(a.has_pending(i), b.has_pending(i), "level {i}");
        }
    }

    #[test]
    fn merge_matches_sequential_feeding() {
        // Left operand length is a power of two, so no pending partial blocks
        // any level the right operand populates.
        let s1: Vec<f64> = (1..=4).map(f64::from).collect();
        let s2: Vec<f64> = [10.0, 11.0, 12.0].into();

        let mut a = LogBinner::new();
        feed_all(&mut a, s1.iter().copied());
        let mut b = LogBinner::new();
        feed_all(&mut b, s2.iter().copied());
        a.merge(&b).unwrap();

        let mut c = LogBinner::new();
        feed_all(&mut c, s1.into_iter().chain(s2));

        assert_same_levels(&a, &c);
    }

    #[test]
    fn merge_cascades_combined_partials() {
        let mut a = LogBinner::new();
        feed_all(&mut a, [1.0, 2.0]);
        let mut b = LogBinner::new();
        feed_all(&mut b, [3.0, 4.0]);
        a.merge(&b).unwrap();

        let mut c = LogBinner::new();
        feed_all(&mut c, [1.0, 2.0, 3.0, 4.0]);

        assert_same_levels(&a, &c);
        assert_eq!(a.level(2).unwrap().entries, 1);
        assert!((a.level(2).unwrap().sum - 10.0).abs() < EPS);
    }

    #[test]
    fn merge_rejects_mismatched_min_bin_size() {
        let mut a = LogBinner::with_min_bin_size(2).unwrap();
        let b = LogBinner::new();
        assert!(matches!(
            a.merge(&b),
            Err(StatsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn iid_samples_show_no_autocorrelation() {
        use crate::testing::NormalStream;

        let mut b = LogBinner::new();
        feed_all(&mut b, NormalStream::new(42).take(4096));

        let tau = b.tau().unwrap();
        assert!(tau.abs() < 0.75, "tau = {tau}");
    }

    #[test]
    fn correlated_samples_inflate_the_binned_error() {
        use crate::testing::ArStream;

        let mut b = LogBinner::new();
        feed_all(&mut b, ArStream::new(7, 0.8).take(4096));

        let naive = b.naive_error().unwrap();
        let binned = b.error().unwrap();
        assert!(binned > 1.5 * naive, "binned {binned} vs naive {naive}");
        assert!(b.tau().unwrap() > 1.0);
    }
}
