use crate::accumulators::{Accumulator, AccumulatorResult};
use crate::error::StatsError;
use crate::feature::Feature;
use crate::value::Value;
use serde::Serialize;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Sub};

/// Running mean: count and sum only, no error estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAccumulator<V: Value> {
    count: u64,
    sum: f64,
    _value: PhantomData<V>,
}

impl<V: Value> MeanAccumulator<V> {
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            _value: PhantomData,
        }
    }
}

impl<V: Value> Accumulator for MeanAccumulator<V> {
    type Value = V;
    type Output = MeanResult<V>;
    const FEATURE: Feature = Feature::Mean;

    #[inline]
    fn push(&mut self, value: V) {
        self.count += 1;
        self.sum += value.to_f64();
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn result(&self) -> MeanResult<V> {
        MeanResult {
            count: self.count,
            sum: self.sum,
            _value: PhantomData,
        }
    }

    fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        self.count += other.count;
        self.sum += other.sum;
        Ok(())
    }
}

/// Snapshot of a [`MeanAccumulator`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MeanResult<V: Value> {
    count: u64,
    sum: f64,
    #[serde(skip)]
    _value: PhantomData<V>,
}

impl<V: Value> AccumulatorResult for MeanResult<V> {
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

    fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        self.count += other.count;
        self.sum += other.sum;
        Ok(())
    }
}

impl<V: Value> Add<f64> for MeanResult<V> {
    type Output = Self;

    /// Shifts every underlying sample by `rhs`.
    fn add(mut self, rhs: f64) -> Self {
        self.sum += rhs * self.count as f64;
        self
    }
}

impl<V: Value> Sub<f64> for MeanResult<V> {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        self + (-rhs)
    }
}

impl<V: Value> Mul<f64> for MeanResult<V> {
    type Output = Self;

    /// Scales every underlying sample by `rhs`.
    fn mul(mut self, rhs: f64) -> Self {
        self.sum *= rhs;
        self
    }
}

impl<V: Value> Div<f64> for MeanResult<V> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self * rhs.recip()
    }
}
