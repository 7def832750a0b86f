use std::{sync::Arc, time::Duration};

use crate::{
    diagnostics::{Diagnostics, LogDiagnostics},
    identity::{IdentityManager, IdentityProvider},
    presentation::{NoopPresenter, Presenter},
    trigger_logger::{NoopTriggerLogger, TriggerLogger},
    Paywall,
};

/// Configuration for [`Paywall`].
///
/// # Examples
/// ```
/// # use paywall::PaywallConfig;
/// let paywall = PaywallConfig::from_api_key("pk_123")
///     .trigger_logger(|event| {
///         println!("{:?}", event);
///     })
///     .to_paywall();
/// ```
pub struct PaywallConfig {
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) debounce: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) poll_jitter: Duration,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) presenter: Arc<dyn Presenter>,
    pub(crate) diagnostics: Box<dyn Diagnostics>,
    pub(crate) trigger_logger: Box<dyn TriggerLogger + Send + Sync>,
}

impl PaywallConfig {
    /// Default base URL for API calls.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.superwall.me/api";

    /// Default delay between an implicit trigger firing and the paywall being presented.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

    /// Default interval between configuration refreshes.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

    /// Default jitter subtracted from the poll interval.
    pub const DEFAULT_POLL_JITTER: Duration = Duration::from_secs(3);

    /// Create a default configuration using the specified API key.
    ///
    /// The default identity is an anonymous user and diagnostics go to the `log` crate. Set a
    /// [`Presenter`] before handling events: without one every presentation resolves to
    /// [`PresentationOutcome::PresentationFailed`](crate::PresentationOutcome::PresentationFailed).
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        PaywallConfig {
            api_key: api_key.into(),
            base_url: PaywallConfig::DEFAULT_BASE_URL.to_owned(),
            debounce: PaywallConfig::DEFAULT_DEBOUNCE,
            poll_interval: PaywallConfig::DEFAULT_POLL_INTERVAL,
            poll_jitter: PaywallConfig::DEFAULT_POLL_JITTER,
            identity: Arc::new(IdentityManager::anonymous()),
            presenter: Arc::new(NoopPresenter),
            diagnostics: Box::new(LogDiagnostics),
            trigger_logger: Box::new(NoopTriggerLogger),
        }
    }

    /// Override base URL for API calls. Clients should use the default setting in most cases.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the delay before presenting a paywall for an implicit trigger.
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Override how often the configuration is refreshed.
    pub fn poll_interval(mut self, interval: Duration, jitter: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_jitter = jitter;
        self
    }

    /// Set the source of user identity.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use paywall::{IdentityManager, PaywallConfig};
    /// let identity = Arc::new(IdentityManager::new());
    /// let config = PaywallConfig::from_api_key("pk_123").identity_provider(identity.clone());
    /// // Later, once the host app has logged the user in:
    /// identity.identify("user-42");
    /// ```
    pub fn identity_provider(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    /// Set the presentation layer that renders paywalls.
    pub fn presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Arc::new(presenter);
        self
    }

    /// Set the sink for diagnostic warnings (e.g., a reserved event used as a trigger).
    pub fn diagnostics(mut self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    /// Set the trigger logger to pass trigger fire events to your analytics storage.
    pub fn trigger_logger(mut self, logger: impl TriggerLogger + Send + Sync + 'static) -> Self {
        self.trigger_logger = Box::new(logger);
        self
    }

    /// Create a new [`Paywall`] using this configuration.
    pub fn to_paywall(self) -> Paywall {
        Paywall::new(self)
    }
}
