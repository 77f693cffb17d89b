use crate::feature::Feature;
use crate::value::{Sample, ValueKind};
use thiserror::Error;

/// Failure conditions raised by accumulators and the registry.
///
/// All of these are local, synchronous failures reported at the call that
/// triggered them. Nothing is retried internally and no condition is
/// downgraded to a silent default value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("an accumulator named `{0}` is already registered")]
    DuplicateName(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no accumulator named `{0}`")]
    NotFound(String),

    #[error("cannot convert sample {sample} into a {expected} value")]
    TypeMismatch { sample: Sample, expected: ValueKind },

    #[error("expected a {expected_feature}/{expected_kind} accumulator, found {found_feature}/{found_kind}")]
    FeatureMismatch {
        expected_feature: Feature,
        expected_kind: ValueKind,
        found_feature: Feature,
        found_kind: ValueKind,
    },

    #[error("{feature} accumulators provide no {capability}")]
    Unsupported {
        feature: Feature,
        capability: &'static str,
    },
}
