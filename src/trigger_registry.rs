//! Thread-safe holder of the currently active [`Configuration`].
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;

use crate::Configuration;

/// `TriggerRegistry` provides a `Sync` storage for the trigger configuration that allows
/// concurrent access for readers and writers.
///
/// A configuration is never modified in place, only replaced wholesale. Readers get an `Arc`
/// snapshot that stays consistent for as long as they hold it.
pub struct TriggerRegistry {
    configuration: RwLock<Option<Arc<Configuration>>>,
    /// Bumped on every update so that async readers can wait for the first configuration.
    version: watch::Sender<u64>,
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        TriggerRegistry {
            configuration: RwLock::new(None),
            version: watch::Sender::new(0),
        }
    }
}

impl TriggerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        TriggerRegistry::default()
    }

    /// Get the current snapshot. Returns `None` if no configuration has been stored yet.
    pub fn get_configuration(&self) -> Option<Arc<Configuration>> {
        // A writer can only panic between taking the lock and storing a complete `Arc`, so the
        // slot is always consistent and poisoning can be ignored.
        let configuration = self
            .configuration
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        configuration.clone()
    }

    /// Replace the configuration, returning the previous one.
    pub fn set_configuration(&self, configuration: Configuration) -> Option<Arc<Configuration>> {
        // Constructing new value before requesting the lock to minimize lock span.
        let new_value = Some(Arc::new(configuration));

        let previous = {
            let mut slot = self
                .configuration
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, new_value)
        };
        self.version.send_modify(|v| *v += 1);

        log::debug!(target: "paywall", "trigger configuration updated");
        previous
    }

    /// Wait until a configuration is available and return it.
    pub async fn wait_for_configuration(&self) -> Arc<Configuration> {
        let mut version = self.version.subscribe();
        loop {
            if let Some(configuration) = self.get_configuration() {
                return configuration;
            }
            // The sender lives in `self`, so `changed()` cannot fail while we're borrowing it.
            let _ = version.changed().await;
        }
    }
}
