//! User identity. The pipeline does not evaluate triggers until an identity, anonymous or real,
//! has been established.
use async_trait::async_trait;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Prefix of generated anonymous user ids.
const ALIAS_PREFIX: &str = "$PaywallAlias:";

/// An established user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum UserIdentity {
    /// Anonymous user with a generated alias.
    Anonymous(String),
    /// User identified by the host app.
    Identified(String),
}

impl UserIdentity {
    /// Id used for variant assignment and attached to presentation requests.
    pub fn user_id(&self) -> &str {
        match self {
            Self::Anonymous(id) | Self::Identified(id) => id,
        }
    }
}

/// Source of the current user identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Suspend until an identity is established and return it.
    async fn await_identity(&self) -> UserIdentity;
}

/// Default identity provider.
///
/// Starts out unresolved. Call [`IdentityManager::identify`] once the host app knows who the user
/// is, or [`IdentityManager::reset`] to continue anonymously.
#[derive(Debug)]
pub struct IdentityManager {
    identity: watch::Sender<Option<UserIdentity>>,
}

impl Default for IdentityManager {
    fn default() -> Self {
        IdentityManager {
            identity: watch::Sender::new(None),
        }
    }
}

impl IdentityManager {
    /// Create an identity manager with no identity yet.
    pub fn new() -> Self {
        IdentityManager::default()
    }

    /// Create an identity manager that is already resolved to an anonymous user.
    pub fn anonymous() -> Self {
        let manager = IdentityManager::new();
        manager.reset();
        manager
    }

    /// Identify the user.
    pub fn identify(&self, user_id: impl Into<String>) {
        let identity = UserIdentity::Identified(user_id.into());
        log::debug!(target: "paywall", user_id = identity.user_id(); "identified user");
        self.identity.send_replace(Some(identity));
    }

    /// Forget the current user and continue with a fresh anonymous alias.
    pub fn reset(&self) {
        let identity = UserIdentity::Anonymous(generate_alias());
        log::debug!(target: "paywall", user_id = identity.user_id(); "using anonymous identity");
        self.identity.send_replace(Some(identity));
    }

    /// Current identity, if established.
    pub fn current(&self) -> Option<UserIdentity> {
        self.identity.borrow().clone()
    }
}

#[async_trait]
impl IdentityProvider for IdentityManager {
    async fn await_identity(&self) -> UserIdentity {
        let mut receiver = self.identity.subscribe();
        loop {
            let identity = receiver.borrow_and_update().clone();
            if let Some(identity) = identity {
                return identity;
            }
            // The sender lives in `self`, so `changed()` cannot fail while we're borrowing it.
            let _ = receiver.changed().await;
        }
    }
}

fn generate_alias() -> String {
    let bytes: [u8; 16] = thread_rng().gen();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{ALIAS_PREFIX}{hex}")
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::{IdentityManager, IdentityProvider, UserIdentity, ALIAS_PREFIX};

    #[test]
    fn anonymous_aliases_are_unique() {
        let first = IdentityManager::anonymous().current().unwrap();
        let second = IdentityManager::anonymous().current().unwrap();

        assert!(first.user_id().starts_with(ALIAS_PREFIX));
        assert_eq!(first.user_id().len(), ALIAS_PREFIX.len() + 32);
        assert_ne!(first, second);
    }

    #[test]
    fn identify_replaces_anonymous_identity() {
        let manager = IdentityManager::anonymous();
        manager.identify("user-42");
        assert_eq!(
            manager.current(),
            Some(UserIdentity::Identified("user-42".to_owned()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn await_identity_suspends_until_identified() {
        let manager = Arc::new(IdentityManager::new());

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.await_identity().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        manager.identify("user-42");
        assert_eq!(waiter.await.unwrap().user_id(), "user-42");
    }
}
