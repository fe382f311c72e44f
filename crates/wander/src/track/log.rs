use serde_json::Value;

/// Emits each event as a structured `tracing` record under the `analytics`
/// target, so it can be filtered or routed separately from diagnostics.
pub struct Tracker;

impl super::Tracker for Tracker {
    fn track(&self, event: &str, props: Value) {
        tracing::info!(target: "analytics", event, %props, "tracked");
    }
}
