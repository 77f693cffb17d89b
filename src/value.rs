use serde::Serialize;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Runtime tag for the scalar types accumulators accept.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    F64,
    F32,
    I64,
}

/// A dynamically-typed scalar sample, as handed to the type-erased registry.
///
/// Conversion into an accumulator's declared [`Value`] type follows two rules:
/// float targets accept precision loss but reject finite values that would
/// overflow to infinity; integer targets accept exactly representable integral
/// values only. NaN and infinities pass through to float targets untouched
/// (IEEE semantics are not trapped).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    F64(f64),
    F32(f32),
    I64(i64),
}

impl Sample {
    pub fn kind(&self) -> ValueKind {
        match self {
            Sample::F64(_) => ValueKind::F64,
            Sample::F32(_) => ValueKind::F32,
            Sample::I64(_) => ValueKind::I64,
        }
    }

    /// Widens the sample to `f64`, regardless of precision.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Sample::F64(v) => v,
            Sample::F32(v) => v as f64,
            Sample::I64(v) => v as f64,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::F64(v) => write!(f, "{v}f64"),
            Sample::F32(v) => write!(f, "{v}f32"),
            Sample::I64(v) => write!(f, "{v}i64"),
        }
    }
}

impl From<f64> for Sample {
    fn from(v: f64) -> Self {
        Sample::F64(v)
    }
}

impl From<f32> for Sample {
    fn from(v: f32) -> Self {
        Sample::F32(v)
    }
}

impl From<i64> for Sample {
    fn from(v: i64) -> Self {
        Sample::I64(v)
    }
}

/// Scalar type an accumulator is declared over.
///
/// This is a closed set: `f64`, `f32` and `i64`. The associated [`KIND`] tag
/// is what the type-erased layer compares when merging or assigning across
/// wrappers.
///
/// [`KIND`]: Value::KIND
pub trait Value: Copy + PartialOrd + fmt::Debug + 'static {
    const KIND: ValueKind;

    /// Checked conversion from a dynamically-typed sample, per the rules on
    /// [`Sample`]. `None` means the value cannot represent the sample.
    fn from_sample(sample: Sample) -> Option<Self>;

    fn to_f64(self) -> f64;
}

impl Value for f64 {
    const KIND: ValueKind = ValueKind::F64;

    fn from_sample(sample: Sample) -> Option<Self> {
        Some(sample.as_f64())
    }

    fn to_f64(self) -> f64 {
        self
    }
}

impl Value for f32 {
    const KIND: ValueKind = ValueKind::F32;

    fn from_sample(sample: Sample) -> Option<Self> {
        let wide = sample.as_f64();
        let narrow = wide as f32;
        if wide.is_finite() && !narrow.is_finite() {
            return None;
        }
        Some(narrow)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Value for i64 {
    const KIND: ValueKind = ValueKind::I64;

    fn from_sample(sample: Sample) -> Option<Self> {
        match sample {
            Sample::I64(v) => Some(v),
            Sample::F64(v) => exact_int(v),
            Sample::F32(v) => exact_int(v as f64),
        }
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

fn exact_int(v: f64) -> Option<i64> {
    if !v.is_finite() || v.fract() != 0.0 {
        return None;
    }
    let candidate = v as i64;
    // i128 comparison catches the saturating cast at the i64 boundaries.
    if candidate as i128 == v as i128 {
        Some(candidate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_targets_accept_everything_finite() {
        assert_eq!(f64::from_sample(Sample::F64(1.5)), Some(1.5));
        assert_eq!(f64::from_sample(Sample::I64(3)), Some(3.0));
        assert_eq!(f32::from_sample(Sample::F64(0.25)), Some(0.25f32));
    }

    #[test]
    fn nan_and_infinity_pass_through_to_floats() {
        assert!(f64::from_sample(Sample::F64(f64::NAN)).unwrap().is_nan());
        assert_eq!(
            f32::from_sample(Sample::F64(f64::INFINITY)),
            Some(f32::INFINITY)
        );
    }

    #[test]
    fn finite_overflow_into_f32_is_rejected() {
        assert_eq!(f32::from_sample(Sample::F64(1e300)), None);
        assert_eq!(f32::from_sample(Sample::F64(-1e300)), None);
    }

    #[test]
    fn integer_target_is_exact_only() {
        assert_eq!(i64::from_sample(Sample::F64(2.0)), Some(2));
        assert_eq!(i64::from_sample(Sample::F64(2.5)), None);
        assert_eq!(i64::from_sample(Sample::F64(f64::NAN)), None);
        assert_eq!(i64::from_sample(Sample::F64(1e300)), None);
        assert_eq!(i64::from_sample(Sample::F32(-8.0)), Some(-8));
    }

    #[test]
    fn i64_boundary_is_not_saturated() {
        // 2^63 rounds into f64 range but is out of i64 range.
        assert_eq!(i64::from_sample(Sample::F64(9.223372036854776e18)), None);
    }

    #[test]
    fn kind_tags_match() {
        assert_eq!(Sample::from(1.0f64).kind(), ValueKind::F64);
        assert_eq!(Sample::from(1.0f32).kind(), ValueKind::F32);
        assert_eq!(Sample::from(1i64).kind(), ValueKind::I64);
        assert_eq!(ValueKind::F64.to_string(), "f64");
    }
}
