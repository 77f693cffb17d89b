/// Flat key/value sink consumed by `write(label, sink)` hooks.
///
/// Accumulators, results and sets emit their statistics as a sequence of
/// namespaced entries (`{label}.count`, `{label}.mean`, ...); what happens to
/// an entry is entirely the sink's concern.
pub trait ReportSink {
    /// Accepts one entry. Keys arrive already namespaced by label.
    fn entry(&mut self, key: &str, value: f64);
}

/// Sink that discards everything; useful when only side effects of a write
/// path are under test.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn entry(&mut self, _key: &str, _value: f64) {}
}
