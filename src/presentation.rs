//! Presentation requests and the presentation layer seam.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{event::EventData, experiment::Experiment};

/// Why a paywall presentation was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PresentationInfo {
    /// An in-app event matched a trigger.
    ImplicitTrigger {
        /// The event that fired the trigger.
        event: EventData,
    },
    /// The host app explicitly asked to present a paywall for an event, or a deep link did.
    ExplicitTrigger {
        /// The event the presentation was requested for.
        event: EventData,
    },
    /// The host app asked for a specific paywall.
    FromIdentifier {
        /// Paywall identifier.
        paywall_identifier: String,
    },
}

impl PresentationInfo {
    /// Name of the event behind this presentation, if any.
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::ImplicitTrigger { event } | Self::ExplicitTrigger { event } => Some(&event.name),
            Self::FromIdentifier { .. } => None,
        }
    }
}

/// The unit of work submitted to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationRequest {
    /// Why the paywall is being presented.
    pub presentation_info: PresentationInfo,
    /// Experiment the user was assigned to, if the request came from a trigger rule.
    pub experiment: Option<Experiment>,
    /// Paywall to present. `None` lets the presentation layer pick its default paywall.
    pub paywall_identifier: Option<String>,
    /// User the paywall is presented to.
    pub user_id: String,
}

/// Failure reported by the presentation layer.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("paywall presentation failed: {0}")]
pub struct PresentationError(pub String);

impl From<&str> for PresentationError {
    fn from(value: &str) -> Self {
        PresentationError(value.to_owned())
    }
}

impl From<String> for PresentationError {
    fn from(value: String) -> Self {
        PresentationError(value)
    }
}

/// The presentation layer: renders paywalls in the host app's view hierarchy.
///
/// The SDK only ever calls a presenter from a single task, so implementations don't need to
/// guard against concurrent `present()`/`dismiss()` calls.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Present a paywall and resolve once it is on screen (or failed to show).
    async fn present(&self, request: &PresentationRequest) -> Result<(), PresentationError>;

    /// Dismiss the currently presented paywall and resolve once it is gone.
    async fn dismiss(&self);

    /// Return `true` if a paywall is currently on screen.
    async fn is_presented(&self) -> bool;
}

/// Presenter used when the host app did not configure one. Never shows anything and reports
/// every request as failed.
pub(crate) struct NoopPresenter;

#[async_trait]
impl Presenter for NoopPresenter {
    async fn present(&self, _request: &PresentationRequest) -> Result<(), PresentationError> {
        Err(PresentationError::from("no presenter configured"))
    }

    async fn dismiss(&self) {}

    async fn is_presented(&self) -> bool {
        false
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{PresentationError, PresentationRequest, Presenter};

    /// What happened to a [`RecordingPresenter`], in order.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Present(PresentationRequest),
        Dismiss,
    }

    /// Presenter that records calls and tracks presented state.
    #[derive(Clone, Default)]
    pub struct RecordingPresenter {
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub presented: Arc<Mutex<bool>>,
        pub fail_with: Arc<Mutex<Option<PresentationError>>>,
    }

    impl RecordingPresenter {
        pub fn presented(&self) -> Self {
            *self.presented.lock().unwrap() = true;
            self.clone()
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn presentations(&self) -> Vec<PresentationRequest> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Present(request) => Some(request),
                    Call::Dismiss => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl Presenter for RecordingPresenter {
        async fn present(&self, request: &PresentationRequest) -> Result<(), PresentationError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Present(request.clone()));
            if let Some(err) = self.fail_with.lock().unwrap().clone() {
                return Err(err);
            }
            *self.presented.lock().unwrap() = true;
            Ok(())
        }

        async fn dismiss(&self) {
            // Dismissal takes a while on a real device.
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            self.calls.lock().unwrap().push(Call::Dismiss);
            *self.presented.lock().unwrap() = false;
        }

        async fn is_presented(&self) -> bool {
            *self.presented.lock().unwrap()
        }
    }
}
