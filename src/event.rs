use std::collections::HashMap;

use chrono::{DateTime, Utc};
use derive_more::From;
use serde::{Deserialize, Serialize};

/// Parameters attached to an analytics event.
pub type Parameters = HashMap<String, AttributeValue>;

/// A single event parameter value.
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, From, Clone)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// A numeric value. Integers are represented as `f64` too.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// An explicit null. Treated the same as a missing parameter by `IS_NULL`.
    Null,
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// An analytics event occurrence, as fired by the host app.
///
/// Events are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    /// Event name. Matched against trigger names from the remote configuration.
    pub name: String,
    /// Parameters supplied with the event. Trigger rules are evaluated against them.
    pub parameters: Parameters,
    /// When the event fired.
    pub timestamp: DateTime<Utc>,
}

impl EventData {
    /// Create a new event with no parameters, timestamped now.
    ///
    /// ```
    /// # use paywall::EventData;
    /// let event = EventData::new("signup_completed");
    /// assert!(event.parameters.is_empty());
    /// ```
    pub fn new(name: impl Into<String>) -> EventData {
        EventData {
            name: name.into(),
            parameters: Parameters::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach a parameter to the event.
    pub fn with_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> EventData {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeValue, EventData};

    #[test]
    fn builds_event_with_parameters() {
        let event = EventData::new("signup_completed")
            .with_parameter("plan", "annual")
            .with_parameter("age", 42.0)
            .with_parameter("returning", true);

        assert_eq!(event.name, "signup_completed");
        assert_eq!(event.parameters.get("plan"), Some(&"annual".into()));
        assert_eq!(
            event.parameters.get("age"),
            Some(&AttributeValue::Number(42.0))
        );
        assert_eq!(
            event.parameters.get("returning"),
            Some(&AttributeValue::Boolean(true))
        );
    }

    #[test]
    fn parameters_deserialize_untagged() {
        let value: AttributeValue = serde_json::from_str("null").unwrap();
        assert_eq!(value, AttributeValue::Null);
        let value: AttributeValue = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(value, AttributeValue::String("x".to_owned()));
    }
}
