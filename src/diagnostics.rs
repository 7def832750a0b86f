use std::collections::HashMap;

/// Sink for non-fatal problems the pipeline wants a developer to notice.
pub trait Diagnostics: Send + Sync {
    /// Report a warning with structured context.
    fn warn(&self, message: &str, context: &HashMap<String, String>);
}

/// Default diagnostics: forwards warnings to the `log` crate.
pub(crate) struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn warn(&self, message: &str, context: &HashMap<String, String>) {
        log::warn!(target: "paywall", context:serde = context; "{}", message);
    }
}

impl<T: Fn(&str, &HashMap<String, String>) + Send + Sync> Diagnostics for T {
    fn warn(&self, message: &str, context: &HashMap<String, String>) {
        self(message, context);
    }
}
