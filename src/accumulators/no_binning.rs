use crate::accumulators::{Accumulator, AccumulatorResult};
use crate::error::StatsError;
use crate::feature::Feature;
use crate::utils::math::standard_error;
use crate::value::Value;
use serde::Serialize;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Sub};

/// Mean plus the i.i.d. standard error: count, sum and sum of squares.
///
/// The error estimate assumes uncorrelated samples; for autocorrelated
/// streams use one of the binning accumulators instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBinningAccumulator<V: Value> {
    count: u64,
    sum: f64,
    sum_sq: f64,
    _value: PhantomData<V>,
}

impl<V: Value> NoBinningAccumulator<V> {
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            _value: PhantomData,
        }
    }
}

impl<V: Value> Accumulator for NoBinningAccumulator<V> {
    type Value = V;
    type Output = NoBinningResult<V>;
    const FEATURE: Feature = Feature::NoBinning;

    #[inline]
    fn push(&mut self, value: V) {
        let x = value.to_f64();
        self.count += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn result(&self) -> NoBinningResult<V> {
        NoBinningResult {
            count: self.count,
            sum: self.sum,
            sum_sq: self.sum_sq,
            _value: PhantomData,
        }
    }

    fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        Ok(())
    }
}

/// Snapshot of a [`NoBinningAccumulator`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NoBinningResult<V: Value> {
    count: u64,
    sum: f64,
    sum_sq: f64,
    #[serde(skip)]
    _value: PhantomData<V>,
}

impl<V: Value> AccumulatorResult for NoBinningResult<V> {
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
        standard_error(self.count, self.sum, self.sum_sq)
    }

    fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        Ok(())
    }
}

impl<V: Value> Add<f64> for NoBinningResult<V> {
    type Output = Self;

    /// Shifts every underlying sample by `rhs`.
    fn add(mut self, rhs: f64) -> Self {
        let n = self.count as f64;
        self.sum_sq += 2.0 * rhs * self.sum + n * rhs * rhs;
        self.sum += rhs * n;
        self
    }
}

impl<V: Value> Sub<f64> for NoBinningResult<V> {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        self + (-rhs)
    }
}

impl<V: Value> Mul<f64> for NoBinningResult<V> {
    type Output = Self;

    /// Scales every underlying sample by `rhs`.
    fn mul(mut self, rhs: f64) -> Self {
        self.sum *= rhs;
        self.sum_sq *= rhs * rhs;
        self
    }
}

impl<V: Value> Div<f64> for NoBinningResult<V> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self * rhs.recip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportTable;

    const EPS: f64 = 1e-12;

    fn filled(samples: &[f64]) -> NoBinningAccumulator<f64> {
        let mut acc = NoBinningAccumulator::new();
        for &s in samples {
            acc.push(s);
        }
        acc
    }

    #[test]
    fn two_samples_round_trip() {
        let r = filled(&[1.0, 2.0]).result();
        assert_eq!(r.count(), 2);
        assert!((r.mean() - 1.5).abs() < EPS);
    }

    #[test]
    fn error_matches_hand_computation() {
        // Samples 1, 3, 2, 4: sample variance 5/3, standard error sqrt(5/12).
        let r = filled(&[1.0, 3.0, 2.0, 4.0]).result();
        let expected = (5.0f64 / 12.0).sqrt();
        assert!((r.error().unwrap() - expected).abs() < EPS);
    }

    #[test]
    fn error_is_undefined_below_two_samples() {
        assert!(filled(&[]).result().error().is_none());
        assert!(filled(&[7.0]).result().error().is_none());
    }

    #[test]
    fn merge_equals_sequential_feeding_exactly() {
        let s1 = [0.5, 1.5, -2.0];
        let s2 = [4.0, 8.0];

        let mut a = filled(&s1);
        let b = filled(&s2);
        a.merge(&b).unwrap();

        let c = filled(&[&s1[..], &s2[..]].concat());
        assert_eq!(a.count(), c.count());
        assert!((a.result().mean() - c.result().mean()).abs() < EPS);
        assert!((a.result().error().unwrap() - c.result().error().unwrap()).abs() < EPS);
    }

    #[test]
    fn affine_arithmetic_is_exact_on_the_error() {
        let r = filled(&[1.0, 3.0, 2.0, 4.0]).result();
        let base_error = r.error().unwrap();

        // A shift leaves the spread untouched; a scale stretches it.
        let shifted = r + 10.0;
        assert!((shifted.mean() - 12.5).abs() < EPS);
        assert!((shifted.error().unwrap() - base_error).abs() < 1e-9);

        let scaled = r * 3.0;
        assert!((scaled.error().unwrap() - 3.0 * base_error).abs() < 1e-9);
    }

    #[test]
    fn p_value_flags_inconsistent_references() {
        let r = filled(&[1.0, 1.1, 0.9, 1.05, 0.95, 1.0, 1.1, 0.9]).result();
        // The measured mean is about 1.0; a far-away reference is excluded.
        assert!(r.p_value(1.0).unwrap() > 0.5);
        assert!(r.p_value(10.0).unwrap() < 1e-6);
    }

    #[test]
    fn write_emits_count_mean_and_error() {
        let mut table = ReportTable::default();
        filled(&[1.0, 2.0]).result().write("x", &mut table);

        assert_eq!(table.value_of("x.count"), Some(2.0));
        assert_eq!(table.value_of("x.mean"), Some(1.5));
        assert!(table.value_of("x.error").is_some());
        assert!(table.value_of("x.tau").is_none());
    }
}
