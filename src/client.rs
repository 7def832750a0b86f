use std::sync::Arc;

use crate::{
    event::EventData,
    pipeline::{Pipeline, PipelineConfig, PresentationOutcome},
    poller::{PollerThread, PollerThreadConfig},
    presentation::PresentationRequest,
    subscription::{SubscriptionStatus, SubscriptionStatusStore},
    trigger_registry::TriggerRegistry,
    Configuration, PaywallConfig, Result,
};

/// The SDK context. Holds the trigger registry, the presentation pipeline, and their
/// collaborators.
///
/// Create one at app start with [`PaywallConfig`] and share it; there is no global instance.
///
/// # Runtime
///
/// Event handling is asynchronous and expects a Tokio runtime. [`Paywall::track`] spawns onto the
/// current runtime and panics if called outside of one. Presentations are serialized by a task
/// spawned on the runtime of the first caller; if that runtime shuts down, the task is restarted on
/// the next caller's runtime.
///
/// # Examples
/// ```no_run
/// # async fn run() {
/// # use paywall::{EventData, PaywallConfig};
/// let paywall = PaywallConfig::from_api_key("pk_123").to_paywall();
/// let poller = paywall.start_poller_thread().unwrap();
///
/// let outcome = paywall
///     .handle_event(EventData::new("signup_completed"))
///     .await;
/// println!("{:?}", outcome);
/// # poller.stop();
/// # }
/// ```
pub struct Paywall {
    pipeline: Arc<Pipeline>,
    config: PollerSettings,
}

struct PollerSettings {
    api_key: String,
    base_url: String,
    poll_interval: std::time::Duration,
    poll_jitter: std::time::Duration,
}

impl Paywall {
    /// Create a new `Paywall` using the specified configuration.
    pub fn new(config: PaywallConfig) -> Self {
        let pipeline = Pipeline::new(PipelineConfig {
            identity: config.identity,
            registry: Arc::new(TriggerRegistry::new()),
            subscription: Arc::new(SubscriptionStatusStore::new()),
            presenter: config.presenter,
            diagnostics: config.diagnostics,
            trigger_logger: config.trigger_logger,
            debounce: config.debounce,
        });

        Paywall {
            pipeline: Arc::new(pipeline),
            config: PollerSettings {
                api_key: config.api_key,
                base_url: config.base_url,
                poll_interval: config.poll_interval,
                poll_jitter: config.poll_jitter,
            },
        }
    }

    /// Start a poller thread to fetch configuration from the server.
    ///
    /// Events handled before the first configuration arrives wait for it.
    pub fn start_poller_thread(&self) -> Result<PollerThread> {
        PollerThread::start(PollerThreadConfig {
            registry: self.pipeline.registry().clone(),
            base_url: self.config.base_url.clone(),
            api_key: self.config.api_key.clone(),
            interval: self.config.poll_interval,
            jitter: self.config.poll_jitter,
        })
    }

    /// Install a configuration directly, e.g. one bundled with the app or cached from a previous
    /// session.
    pub fn set_configuration(&self, configuration: Configuration) {
        self.pipeline.registry().set_configuration(configuration);
    }

    /// Currently active configuration, if any.
    pub fn configuration(&self) -> Option<Arc<Configuration>> {
        self.pipeline.registry().get_configuration()
    }

    /// Evaluate an analytics event and present a paywall if a trigger fires.
    ///
    /// Resolves once the pipeline is done with the event. That includes waiting for identity and
    /// configuration, the debounce delay, and the presentation itself.
    pub async fn handle_event(&self, event: EventData) -> PresentationOutcome {
        self.pipeline.handle_event(event).await
    }

    /// Fire-and-forget version of [`Paywall::handle_event`].
    pub fn track(&self, event: EventData) -> tokio::task::JoinHandle<PresentationOutcome> {
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move { pipeline.handle_event(event).await })
    }

    /// Present a paywall for an event on behalf of the host app, skipping the debounce delay.
    pub async fn present_for_event(&self, event: EventData) -> PresentationOutcome {
        self.pipeline.present_for_event(event).await
    }

    /// Present a specific paywall regardless of triggers.
    pub async fn present_paywall(&self, paywall_identifier: impl Into<String>) -> PresentationOutcome {
        self.pipeline
            .present_paywall(paywall_identifier.into())
            .await
    }

    /// Record the user's subscription status as reported by the entitlement backend.
    pub fn set_subscription_status(&self, status: SubscriptionStatus) {
        self.pipeline.subscription().set_status(status);
    }

    /// Access the subscription status store. Reading it never blocks.
    pub fn subscription_status(&self) -> &SubscriptionStatusStore {
        self.pipeline.subscription()
    }

    /// The last request the presentation layer successfully presented.
    pub fn last_successful_presentation_request(&self) -> Option<PresentationRequest> {
        self.pipeline.last_successful_request()
    }
}
