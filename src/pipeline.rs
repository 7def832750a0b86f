//! The presentation request pipeline: turns analytics events into paywall presentations.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::Diagnostics,
    evaluator::{resolve_trigger, TriggerOutcome, TriggerResult},
    event::EventData,
    experiment::Experiment,
    identity::IdentityProvider,
    presentation::{PresentationError, PresentationInfo, PresentationRequest, Presenter},
    presentation_queue::{PresentationQueue, QueueResult},
    sharder::Md5Sharder,
    subscription::{SubscriptionStatus, SubscriptionStatusStore},
    trigger_logger::{TriggerFireEvent, TriggerLogger},
    trigger_registry::TriggerRegistry,
    Configuration,
};

/// What the pipeline did with an event or presentation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PresentationOutcome {
    /// A paywall was presented for this request.
    Presented(PresentationRequest),
    /// A paywall would have been presented, but wasn't.
    Suppressed(SuppressionReason),
    /// The user is in the holdout group of the matched experiment.
    Holdout(Experiment),
    /// The event has a trigger, but none of its rules matched.
    NoRuleMatch,
    /// The event does not fire any trigger.
    EventNotFound,
    /// The event is reserved by the SDK and can't be used as a trigger.
    DisallowedEvent,
    /// The presentation layer failed to present the paywall.
    PresentationFailed(PresentationError),
}

impl PresentationOutcome {
    /// Experiment behind the outcome, if one was assigned.
    pub fn experiment(&self) -> Option<&Experiment> {
        match self {
            Self::Presented(request) => request.experiment.as_ref(),
            Self::Holdout(experiment) => Some(experiment),
            _ => None,
        }
    }
}

/// Why a presentation was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuppressionReason {
    /// Another paywall was on screen when the request reached the presentation layer.
    AlreadyPresented,
    /// The user already has an active subscription.
    UserIsSubscribed,
}

/// How a presentation was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Implicit,
    Explicit,
}

pub(crate) struct PipelineConfig {
    pub identity: Arc<dyn IdentityProvider>,
    pub registry: Arc<TriggerRegistry>,
    pub subscription: Arc<SubscriptionStatusStore>,
    pub presenter: Arc<dyn Presenter>,
    pub diagnostics: Box<dyn Diagnostics>,
    pub trigger_logger: Box<dyn TriggerLogger + Send + Sync>,
    pub debounce: Duration,
}

pub(crate) struct Pipeline {
    config: PipelineConfig,
    /// Started lazily on the caller's runtime, and restarted if that runtime has shut down.
    queue: Mutex<Option<PresentationQueue>>,
    last_successful_request: Mutex<Option<PresentationRequest>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Pipeline {
        Pipeline {
            config,
            queue: Mutex::new(None),
            last_successful_request: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<TriggerRegistry> {
        &self.config.registry
    }

    pub fn subscription(&self) -> &Arc<SubscriptionStatusStore> {
        &self.config.subscription
    }

    pub fn last_successful_request(&self) -> Option<PresentationRequest> {
        self.last_successful_request
            .lock()
            .ok()
            .and_then(|request| request.clone())
    }

    /// Evaluate an analytics event fired by the host app.
    pub async fn handle_event(&self, event: EventData) -> PresentationOutcome {
        self.evaluate(event, Origin::Implicit).await
    }

    /// Evaluate an event the host app explicitly asked to present a paywall for. Same as
    /// [`Pipeline::handle_event`] but without the debounce delay.
    pub async fn present_for_event(&self, event: EventData) -> PresentationOutcome {
        self.evaluate(event, Origin::Explicit).await
    }

    /// Present a specific paywall, bypassing trigger evaluation.
    pub async fn present_paywall(&self, paywall_identifier: String) -> PresentationOutcome {
        let identity = self.config.identity.await_identity().await;
        let request = PresentationRequest {
            presentation_info: PresentationInfo::FromIdentifier {
                paywall_identifier: paywall_identifier.clone(),
            },
            experiment: None,
            paywall_identifier: Some(paywall_identifier),
            user_id: identity.user_id().to_owned(),
        };
        self.submit(request, false).await
    }

    async fn evaluate(&self, event: EventData, origin: Origin) -> PresentationOutcome {
        let identity = self.config.identity.await_identity().await;
        let configuration = self.config.registry.wait_for_configuration().await;

        let presentation_info = match origin {
            Origin::Implicit => PresentationInfo::ImplicitTrigger {
                event: event.clone(),
            },
            Origin::Explicit => PresentationInfo::ExplicitTrigger {
                event: event.clone(),
            },
        };

        let is_presented = match self.queue().is_presented().await {
            Ok(is_presented) => is_presented,
            Err(err) => return PresentationOutcome::PresentationFailed(err.to_string().into()),
        };

        let trigger_outcome = configuration.classify(&event.name, is_presented);
        let user_id = identity.user_id();

        let result = match trigger_outcome {
            TriggerOutcome::DeepLinkTrigger => {
                self.fire(&configuration, &event, presentation_info, user_id, true, None)
                    .await
            }
            TriggerOutcome::TriggerPaywall => {
                if self.config.subscription.status() == SubscriptionStatus::Active {
                    log::debug!(target: "paywall",
                                event_name:display = event.name;
                                "user is subscribed, not presenting paywall");
                    PresentationOutcome::Suppressed(SuppressionReason::UserIsSubscribed)
                } else {
                    let debounce = match origin {
                        Origin::Implicit => Some(self.config.debounce),
                        Origin::Explicit => None,
                    };
                    self.fire(
                        &configuration,
                        &event,
                        presentation_info,
                        user_id,
                        false,
                        debounce,
                    )
                    .await
                }
            }
            TriggerOutcome::DisallowedEventAsTrigger => {
                self.config.diagnostics.warn(
                    "event is reserved and cannot be used as a trigger",
                    &HashMap::from([("event_name".to_owned(), event.name.clone())]),
                );
                return PresentationOutcome::DisallowedEvent;
            }
            TriggerOutcome::DontTriggerPaywall => return PresentationOutcome::EventNotFound,
        };

        self.config.trigger_logger.log_trigger_fire(TriggerFireEvent {
            event_name: event.name.clone(),
            user_id: user_id.to_owned(),
            trigger_outcome,
            experiment: result.experiment().cloned(),
            result: result.clone(),
            timestamp: Utc::now(),
        });

        result
    }

    /// Resolve the trigger's rules and submit a presentation request.
    ///
    /// A deep link always presents. Without a matching rule the paywall choice is left to the
    /// presentation layer; a holdout assignment is attached to the request but does not stop it.
    async fn fire(
        &self,
        configuration: &Configuration,
        event: &EventData,
        presentation_info: PresentationInfo,
        user_id: &str,
        deep_link: bool,
        debounce: Option<Duration>,
    ) -> PresentationOutcome {
        let experiment = match resolve_trigger(configuration, event, user_id, &Md5Sharder) {
            TriggerResult::Paywall(experiment) => Some(experiment),
            TriggerResult::Holdout(experiment) if deep_link => Some(experiment),
            TriggerResult::Holdout(experiment) => {
                return PresentationOutcome::Holdout(experiment);
            }
            TriggerResult::NoRuleMatch | TriggerResult::EventNotFound if deep_link => None,
            TriggerResult::NoRuleMatch => return PresentationOutcome::NoRuleMatch,
            TriggerResult::EventNotFound => return PresentationOutcome::EventNotFound,
        };

        let request = PresentationRequest {
            presentation_info,
            paywall_identifier: experiment
                .as_ref()
                .and_then(|experiment| experiment.variant.paywall_identifier.clone()),
            experiment,
            user_id: user_id.to_owned(),
        };

        if let Some(debounce) = debounce {
            // Let any view transition the host app started alongside the event settle first.
            tokio::time::sleep(debounce).await;
        }

        self.submit(request, deep_link).await
    }

    async fn submit(&self, request: PresentationRequest, dismiss_first: bool) -> PresentationOutcome {
        match self.queue().submit(request.clone(), dismiss_first).await {
            Ok(QueueResult::Presented) => {
                if let Ok(mut last) = self.last_successful_request.lock() {
                    *last = Some(request.clone());
                }
                PresentationOutcome::Presented(request)
            }
            Ok(QueueResult::AlreadyPresented) => {
                PresentationOutcome::Suppressed(SuppressionReason::AlreadyPresented)
            }
            Ok(QueueResult::Failed(err)) => PresentationOutcome::PresentationFailed(err),
            Err(err) => PresentationOutcome::PresentationFailed(err.to_string().into()),
        }
    }

    fn queue(&self) -> PresentationQueue {
        let mut slot = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(queue) = slot.as_ref().filter(|queue| !queue.is_closed()) {
            return queue.clone();
        }
        if slot.is_some() {
            log::debug!(target: "paywall", "presentation queue stopped, restarting");
        }
        let queue = PresentationQueue::start(self.config.presenter.clone());
        *slot = Some(queue.clone());
        queue
    }
}
