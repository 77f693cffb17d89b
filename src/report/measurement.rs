use serde::Serialize;

/// One flat key/value pair emitted over the serialization boundary.
///
/// Typical examples: `"energy.count"`, `"energy.mean"`, `"energy.error"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
}

impl Measurement {
    /// Convenience constructor
    #[inline]
    pub fn new<N: Into<String>>(name: N, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}
