use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The closed set of statistical capabilities an accumulator can be built
/// with.
///
/// The variant decides which aggregates are tracked and which estimates a
/// result can provide; generic code probes the predicates below instead of
/// assuming a capability is present.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Feature {
    /// Running mean only; no error estimate.
    Mean,
    /// Mean plus the i.i.d. standard error (no autocorrelation correction).
    NoBinning,
    /// Power-of-two binning levels; autocorrelation-aware error bars.
    LogBinning,
    /// Bounded buffer of realized bin means; supports jackknife estimates.
    FullBinning,
}

impl Feature {
    /// Whether results of this feature carry an error estimate.
    pub fn provides_error(self) -> bool {
        !matches!(self, Feature::Mean)
    }

    /// Whether this feature maintains binning levels.
    pub fn provides_binning(self) -> bool {
        matches!(self, Feature::LogBinning | Feature::FullBinning)
    }

    /// Whether realized bin means are retained (required for jackknife).
    pub fn provides_bin_history(self) -> bool {
        matches!(self, Feature::FullBinning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn names_round_trip() {
        for feature in Feature::iter() {
            let name = feature.to_string();
            assert_eq!(Feature::from_str(&name).unwrap(), feature);
        }
        assert_eq!(Feature::LogBinning.to_string(), "log-binning");
    }

    #[test]
    fn capability_predicates() {
        assert!(!Feature::Mean.provides_error());
        assert!(Feature::NoBinning.provides_error());
        assert!(!Feature::NoBinning.provides_binning());
        assert!(Feature::LogBinning.provides_binning());
        assert!(!Feature::LogBinning.provides_bin_history());
        assert!(Feature::FullBinning.provides_bin_history());
    }
}
