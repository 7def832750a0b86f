//! Subscription status as reported by the entitlement backend.
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Whether the user has an active entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionStatus {
    /// The entitlement backend hasn't answered yet.
    #[default]
    Unknown,
    /// The user has an active entitlement.
    Active,
    /// The user has no active entitlement.
    Inactive,
}

/// Holds the latest subscription status.
///
/// Written by whatever talks to the entitlement backend, read by the pipeline. Readers never
/// block: [`SubscriptionStatusStore::status`] returns the latest value and
/// [`SubscriptionStatusStore::wait_until_known`] suspends without holding a thread.
#[derive(Debug)]
pub struct SubscriptionStatusStore {
    status: watch::Sender<SubscriptionStatus>,
}

impl Default for SubscriptionStatusStore {
    fn default() -> Self {
        SubscriptionStatusStore {
            status: watch::Sender::new(SubscriptionStatus::Unknown),
        }
    }
}

impl SubscriptionStatusStore {
    /// Create a store with [`SubscriptionStatus::Unknown`] status.
    pub fn new() -> Self {
        SubscriptionStatusStore::default()
    }

    /// Record a new status.
    pub fn set_status(&self, status: SubscriptionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            log::debug!(target: "paywall",
                        previous:serde = previous,
                        status:serde = status;
                        "subscription status changed");
        }
    }

    /// Latest known status.
    pub fn status(&self) -> SubscriptionStatus {
        *self.status.borrow()
    }

    /// Suspend until the status is no longer [`SubscriptionStatus::Unknown`].
    pub async fn wait_until_known(&self) -> SubscriptionStatus {
        let mut receiver = self.status.subscribe();
        loop {
            let status = *receiver.borrow_and_update();
            if status != SubscriptionStatus::Unknown {
                return status;
            }
            // The sender lives in `self`, so `changed()` cannot fail while we're borrowing it.
            let _ = receiver.changed().await;
        }
    }
}
