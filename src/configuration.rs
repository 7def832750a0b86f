//! Remote configuration: the wire format served by the config endpoint and the compiled
//! [`Configuration`] snapshot the pipeline reads from.
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{evaluator::DEFAULT_DISALLOWED_EVENTS, rules::TriggerRule};

/// Response body of the config endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    /// Triggers configured in all active campaigns.
    ///
    /// Each entry is wrapped in `TryParse` so that one malformed trigger (e.g., a newer server
    /// format) does not take the rest of the configuration down with it.
    #[serde(default)]
    pub triggers: Vec<TryParse<Trigger>>,
    /// Events that may not be used as triggers. Falls back to the built-in list when absent.
    #[serde(default)]
    pub disallowed_events: Option<Vec<String>>,
}

/// `TryParse` allows the subfield to fail parsing without failing the parsing of the whole
/// structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed.
    Parsed(T),
    /// Parsing failed.
    ParseFailed(serde_json::Value),
}

impl<T> From<TryParse<T>> for Option<T> {
    fn from(value: TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

/// A trigger: an event name that may cause paywall presentation, and the rules deciding which
/// experiment applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    /// Name of the event that fires this trigger.
    pub event_name: String,
    /// Rules in priority order.
    #[serde(default)]
    pub rules: Vec<TriggerRule>,
}

/// Immutable snapshot of remote configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Timestamp when configuration was fetched by the SDK.
    pub fetched_at: DateTime<Utc>,
    /// Triggers keyed by event name.
    pub triggers: HashMap<String, Trigger>,
    /// Event names that are reserved and may not act as triggers.
    pub disallowed_events: HashSet<String>,
}

impl Configuration {
    /// Compile a configuration from the server response.
    ///
    /// Triggers that failed to parse are dropped with a warning. If two triggers share an event
    /// name, the later one wins.
    pub fn from_server_response(response: ConfigResponse) -> Configuration {
        let mut triggers = HashMap::new();
        for trigger in response.triggers {
            match trigger {
                TryParse::Parsed(trigger) => {
                    let event_name = trigger.event_name.clone();
                    if triggers.insert(event_name.clone(), trigger).is_some() {
                        log::warn!(target: "paywall",
                                   event_name;
                                   "duplicate trigger for event, using the last one");
                    }
                }
                TryParse::ParseFailed(json) => {
                    log::warn!(target: "paywall",
                               trigger:serde = json;
                               "failed to parse trigger, skipping");
                }
            }
        }

        let disallowed_events = match response.disallowed_events {
            Some(events) => events.into_iter().collect(),
            None => DEFAULT_DISALLOWED_EVENTS
                .iter()
                .map(|&name| name.to_owned())
                .collect(),
        };

        Configuration {
            fetched_at: Utc::now(),
            triggers,
            disallowed_events,
        }
    }

    /// Set of event names that have a trigger configured.
    pub fn trigger_names(&self) -> HashSet<&str> {
        self.triggers.keys().map(String::as_str).collect()
    }

    /// Look up the trigger for an event name.
    pub fn trigger(&self, event_name: &str) -> Option<&Trigger> {
        self.triggers.get(event_name)
    }
}
