//! A background thread that periodically refreshes the trigger configuration.
use std::{
    sync::{mpsc::RecvTimeoutError, Arc, Condvar, Mutex},
    time::Duration,
};

use rand::{thread_rng, Rng};

use crate::{
    configuration_fetcher::{ConfigurationFetcher, ConfigurationFetcherConfig},
    trigger_registry::TriggerRegistry,
    Error, Result,
};

pub(crate) struct PollerThreadConfig {
    pub registry: Arc<TriggerRegistry>,
    pub base_url: String,
    pub api_key: String,
    pub interval: Duration,
    pub jitter: Duration,
}

/// A configuration poller thread.
///
/// Use [`Paywall::start_poller_thread`](crate::Paywall::start_poller_thread) to get an instance
/// of it. Until the first configuration is fetched, events are held by the pipeline rather than
/// classified against an empty trigger set.
pub struct PollerThread {
    join_handle: std::thread::JoinHandle<()>,

    /// Used to send a stop command to the poller thread.
    stop_sender: std::sync::mpsc::SyncSender<()>,

    /// Holds `None` if configuration hasn't been fetched yet. Holds `Some(Ok(()))` if configuration
    /// has been fetched successfully. Holds `Some(Err(...))` if there was an unrecoverable error
    /// fetching the first configuration.
    result: Arc<(Mutex<Option<Result<()>>>, Condvar)>,
}

impl PollerThread {
    pub(crate) fn start(config: PollerThreadConfig) -> Result<PollerThread> {
        // Buffer size of 1 is enough: a second stop command is redundant and can be dropped.
        let (stop_sender, stop_receiver) = std::sync::mpsc::sync_channel::<()>(1);

        let result = Arc::new((Mutex::new(None), Condvar::new()));

        let join_handle = {
            let result = Arc::clone(&result);
            let update_result = move |value| {
                if let Ok(mut slot) = result.0.lock() {
                    *slot = Some(value);
                }
                result.1.notify_all();
            };

            std::thread::Builder::new()
                .name("paywall-poller".to_owned())
                .spawn(move || {
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let mut fetcher = ConfigurationFetcher::new(ConfigurationFetcherConfig {
                            base_url: config.base_url,
                            api_key: config.api_key,
                        });

                        loop {
                            match fetcher.fetch_configuration() {
                                Ok(configuration) => {
                                    config.registry.set_configuration(configuration);
                                    update_result(Ok(()));
                                }
                                Err(err @ (Error::Unauthorized | Error::InvalidBaseUrl(_))) => {
                                    // Unrecoverable, retrying won't help.
                                    update_result(Err(err));
                                    return;
                                }
                                Err(err) => {
                                    log::warn!(target: "paywall", "error while fetching configuration: {:?}", err);
                                }
                            }

                            let timeout = jitter(config.interval, config.jitter);
                            match stop_receiver.recv_timeout(timeout) {
                                Err(RecvTimeoutError::Timeout) => {}
                                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                                    log::debug!(target: "paywall", "poller thread received stop command");
                                    return;
                                }
                            }
                        }
                    }));

                    if outcome.is_err() {
                        update_result(Err(Error::PollerThreadPanicked));
                    }
                })?
        };

        Ok(PollerThread {
            join_handle,
            stop_sender,
            result,
        })
    }

    /// Block waiting for the first configuration to get fetched.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorized`] if the API key was rejected.
    /// - [`Error::InvalidBaseUrl`] if the base URL could not be parsed.
    /// - [`Error::PollerThreadPanicked`] if the poller thread panicked.
    pub fn wait_for_configuration(&self) -> Result<()> {
        let mut lock = self
            .result
            .0
            .lock()
            .map_err(|_| Error::PollerThreadPanicked)?;
        loop {
            if let Some(result) = &*lock {
                return result.clone();
            }
            lock = self
                .result
                .1
                .wait(lock)
                .map_err(|_| Error::PollerThreadPanicked)?;
        }
    }

    /// Stop the poller thread.
    ///
    /// This function does not wait for the thread to actually stop.
    pub fn stop(&self) {
        // Error means the thread already exited or another stop command is pending. Either way the
        // thread is stopping.
        let _ = self.stop_sender.try_send(());
    }

    /// Stop the poller thread and block waiting for it to exit.
    pub fn shutdown(self) -> Result<()> {
        self.stop();

        self.join_handle
            .join()
            .map_err(|_| Error::PollerThreadPanicked)?;

        Ok(())
    }
}

/// Subtract a random jitter of at most `jitter` from `interval`.
fn jitter(interval: Duration, jitter: Duration) -> Duration {
    interval.saturating_sub(thread_rng().gen_range(Duration::ZERO..=jitter))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::{PollerThread, PollerThreadConfig};
    use crate::{trigger_registry::TriggerRegistry, Error};

    #[test]
    fn jitter_is_subtractive() {
        let interval = Duration::from_secs(30);
        let result = super::jitter(interval, Duration::from_secs(3));
        assert!(result <= interval, "{result:?} must be <= {interval:?}");
        assert!(result >= Duration::from_secs(27));
    }

    #[test]
    fn jitter_truncates_to_zero() {
        assert_eq!(
            super::jitter(Duration::ZERO, Duration::from_secs(30)),
            Duration::ZERO
        );
    }

    #[test]
    fn invalid_base_url_stops_the_poller() {
        let registry = Arc::new(TriggerRegistry::new());
        let poller = PollerThread::start(PollerThreadConfig {
            registry: registry.clone(),
            base_url: "not a url".to_owned(),
            api_key: "pk_123".to_owned(),
            interval: Duration::from_secs(30),
            jitter: Duration::from_secs(3),
        })
        .unwrap();

        assert!(matches!(
            poller.wait_for_configuration(),
            Err(Error::InvalidBaseUrl(_))
        ));
        assert!(poller.shutdown().is_ok());
        assert!(registry.get_configuration().is_none());
    }
}
