//! Trigger evaluation.
//!
//! [`classify`] is the pure decision function that maps an event name onto a [`TriggerOutcome`].
//! [`resolve_trigger`] goes one step further for events classified as
//! [`TriggerOutcome::TriggerPaywall`]: it picks the matching rule and assigns an experiment
//! variant.
use std::{borrow::Borrow, collections::HashSet, hash::Hash};

use serde::{Deserialize, Serialize};

use crate::{
    configuration::Configuration,
    event::EventData,
    experiment::{Experiment, VariantType},
    sharder::Sharder,
};

/// Reserved event fired when the app is opened from a deep link.
pub const DEEP_LINK_EVENT: &str = "deepLink_open";

/// Events the SDK tracks itself. Using them as triggers is not allowed.
pub const DEFAULT_DISALLOWED_EVENTS: &[&str] = &[
    "app_install",
    "app_launch",
    "app_open",
    "app_close",
    "session_start",
    "first_seen",
    "trigger_fire",
    "paywall_open",
    "paywall_close",
    "transaction_start",
    "transaction_complete",
    "transaction_fail",
    "transaction_abandon",
    "transaction_restore",
    "subscription_start",
    "freeTrial_start",
    "nonRecurringProduct_purchase",
    "user_attributes",
];

/// Classification of an event against the configured triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerOutcome {
    /// The reserved deep-link event. Any presented paywall must be dismissed first.
    DeepLinkTrigger,
    /// The event has a trigger configured.
    TriggerPaywall,
    /// The event is reserved by the SDK and cannot be used as a trigger.
    DisallowedEventAsTrigger,
    /// Nothing to do.
    DontTriggerPaywall,
}

/// Classify an event name.
///
/// The deep-link event wins over everything, including an already presented paywall. Reserved
/// events are classified as disallowed even if a trigger was (mis)configured for them.
///
/// ```
/// # use std::collections::HashSet;
/// # use paywall::{classify, TriggerOutcome};
/// let known = HashSet::from(["signup_completed"]);
/// let disallowed = HashSet::from(["app_launch"]);
///
/// assert_eq!(
///     classify("signup_completed", &known, &disallowed, false),
///     TriggerOutcome::TriggerPaywall
/// );
/// assert_eq!(
///     classify("app_launch", &known, &disallowed, false),
///     TriggerOutcome::DisallowedEventAsTrigger
/// );
/// ```
pub fn classify<K, D>(
    event_name: &str,
    known_trigger_names: &HashSet<K>,
    disallowed_event_names: &HashSet<D>,
    is_paywall_presented: bool,
) -> TriggerOutcome
where
    K: Borrow<str> + Eq + Hash,
    D: Borrow<str> + Eq + Hash,
{
    let outcome = if event_name == DEEP_LINK_EVENT {
        TriggerOutcome::DeepLinkTrigger
    } else if disallowed_event_names.contains(event_name) {
        TriggerOutcome::DisallowedEventAsTrigger
    } else if known_trigger_names.contains(event_name) {
        TriggerOutcome::TriggerPaywall
    } else {
        TriggerOutcome::DontTriggerPaywall
    };

    log::trace!(target: "paywall",
                event_name,
                is_paywall_presented,
                outcome:serde = outcome;
                "classified event");

    outcome
}

impl Configuration {
    /// Classify an event name against this configuration snapshot.
    pub fn classify(&self, event_name: &str, is_paywall_presented: bool) -> TriggerOutcome {
        classify(
            event_name,
            &self.trigger_names(),
            &self.disallowed_events,
            is_paywall_presented,
        )
    }
}

/// Result of resolving a trigger's rules for a specific event and user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerResult {
    /// The user is assigned a treatment variant and should see a paywall.
    Paywall(Experiment),
    /// The user is in the holdout group of the experiment.
    Holdout(Experiment),
    /// No rule matched the event parameters, or the matching experiment has no traffic.
    NoRuleMatch,
    /// There is no trigger for this event.
    EventNotFound,
}

/// Pick the first rule of the event's trigger matching the event parameters and assign a variant
/// of its experiment to `user_id`.
pub fn resolve_trigger(
    configuration: &Configuration,
    event: &EventData,
    user_id: &str,
    sharder: &impl Sharder,
) -> TriggerResult {
    let Some(trigger) = configuration.trigger(&event.name) else {
        return TriggerResult::EventNotFound;
    };

    let Some(rule) = trigger
        .rules
        .iter()
        .find(|rule| rule.matches(&event.parameters))
    else {
        log::debug!(target: "paywall",
                    event_name:display = event.name;
                    "no trigger rule matched");
        return TriggerResult::NoRuleMatch;
    };

    let Some(experiment) = rule.experiment.assign(user_id, sharder) else {
        return TriggerResult::NoRuleMatch;
    };

    log::debug!(target: "paywall",
                event_name:display = event.name,
                user_id,
                experiment:serde = experiment;
                "assigned experiment variant");

    match experiment.variant.variant_type {
        VariantType::Treatment => TriggerResult::Paywall(experiment),
        VariantType::Holdout => TriggerResult::Holdout(experiment),
    }
}
