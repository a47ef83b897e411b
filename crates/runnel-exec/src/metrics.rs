//! Metrics/tracing hooks.
//!
//! Kept to `tracing` events; wire a subscriber (or an exporter) in the binary layer.

pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::TRACE, "runnel", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}
