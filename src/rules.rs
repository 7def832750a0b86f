//! Trigger rules. A rule pairs an experiment with conditions on the event parameters.
use std::cmp::Ordering;

use derive_more::From;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::{
    event::{AttributeValue, Parameters},
    experiment::RawExperiment,
};

/// A rule within a trigger. The first rule whose conditions hold selects the experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRule {
    /// Experiment run for events matching this rule.
    pub experiment: RawExperiment,
    /// Conditions that must all hold. An empty list always matches.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl TriggerRule {
    /// Return `true` if all conditions hold for the given event parameters.
    pub fn matches(&self, parameters: &Parameters) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.eval(parameters))
    }
}

/// A single check of an event parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Condition {
    pub operator: Operator,
    pub attribute: String,
    pub value: ConditionValue,
}

impl Condition {
    /// Evaluate the condition against event parameters.
    pub fn eval(&self, parameters: &Parameters) -> bool {
        self.operator
            .eval(parameters.get(&self.attribute), &self.value)
    }
}

/// Literal value in a condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, From)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Right-hand side of a condition. `ONE_OF`/`NOT_ONE_OF` take a list, other operators a single
/// value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum ConditionValue {
    Multiple(Vec<Value>),
    Single(Value),
}

impl<T: Into<Value>> From<T> for ConditionValue {
    fn from(value: T) -> Self {
        Self::Single(value.into())
    }
}
impl<T: Into<Value>> From<Vec<T>> for ConditionValue {
    fn from(value: Vec<T>) -> Self {
        Self::Multiple(value.into_iter().map(Into::into).collect())
    }
}

/// Condition operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Operator {
    Matches,
    NotMatches,
    Gte,
    Gt,
    Lte,
    Lt,
    OneOf,
    NotOneOf,
    IsNull,
}

impl Operator {
    /// Apply the operator. Returns `false` if the operator cannot be applied to these values
    /// (missing parameter, wrong type, bad regex).
    pub fn eval(self, parameter: Option<&AttributeValue>, value: &ConditionValue) -> bool {
        self.try_eval(parameter, value).unwrap_or(false)
    }

    fn try_eval(self, parameter: Option<&AttributeValue>, value: &ConditionValue) -> Option<bool> {
        match self {
            Self::Matches | Self::NotMatches => {
                let matches = regex_matches(parameter?, value)?;
                Some(matches == (self == Self::Matches))
            }
            Self::OneOf | Self::NotOneOf => {
                let is_one_of = one_of(parameter?, value)?;
                Some(is_one_of == (self == Self::OneOf))
            }
            Self::IsNull => {
                let is_null = matches!(parameter, None | Some(AttributeValue::Null));
                match value {
                    ConditionValue::Single(Value::Boolean(expected)) => Some(is_null == *expected),
                    _ => None,
                }
            }
            Self::Gte | Self::Gt | Self::Lte | Self::Lt => {
                let ordering = compare(parameter?, value)?;
                Some(match self {
                    Self::Gt => ordering == Ordering::Greater,
                    Self::Gte => ordering != Ordering::Less,
                    Self::Lt => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                })
            }
        }
    }
}

fn regex_matches(parameter: &AttributeValue, value: &ConditionValue) -> Option<bool> {
    let (AttributeValue::String(s), ConditionValue::Single(Value::String(pattern))) =
        (parameter, value)
    else {
        return None;
    };
    let regex = Regex::new(pattern).ok()?;
    Some(regex.is_match(s))
}

fn one_of(parameter: &AttributeValue, value: &ConditionValue) -> Option<bool> {
    // List entries are strings on the wire, so parameters are compared by their string form.
    let s = match parameter {
        AttributeValue::String(s) => s.clone(),
        AttributeValue::Number(n) => n.to_string(),
        AttributeValue::Boolean(b) => b.to_string(),
        AttributeValue::Null => return None,
    };
    let ConditionValue::Multiple(values) = value else {
        return None;
    };
    Some(
        values
            .iter()
            .any(|v| matches!(v, Value::String(v) if *v == s)),
    )
}

/// Compare a parameter to the condition value: as semantic versions when the condition value is
/// a version string, numerically otherwise.
fn compare(parameter: &AttributeValue, value: &ConditionValue) -> Option<Ordering> {
    let ConditionValue::Single(value) = value else {
        return None;
    };

    if let Value::String(s) = value {
        if let Ok(condition_version) = Version::parse(s) {
            let AttributeValue::String(p) = parameter else {
                return None;
            };
            let parameter_version = Version::parse(p).ok()?;
            return Some(parameter_version.cmp(&condition_version));
        }
    }

    let condition_number = match value {
        Value::Number(n) => *n,
        Value::String(s) => s.parse().ok()?,
        Value::Boolean(_) => return None,
    };
    let parameter_number = match parameter {
        AttributeValue::Number(n) => *n,
        AttributeValue::String(s) => s.parse().ok()?,
        _ => return None,
    };
    parameter_number.partial_cmp(&condition_number)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{Condition, Operator, TriggerRule, Value};
    use crate::{event::Parameters, experiment::RawExperiment};

    fn rule(conditions: Vec<Condition>) -> TriggerRule {
        TriggerRule {
            experiment: RawExperiment {
                id: "exp".to_owned(),
                group_id: "group".to_owned(),
                variants: vec![],
            },
            conditions,
        }
    }

    #[test]
    fn matches_regex() {
        assert!(Operator::Matches.eval(Some(&"pro_annual".into()), &"^pro_".into()));
        assert!(!Operator::Matches.eval(Some(&"basic".into()), &"^pro_".into()));
        assert!(!Operator::Matches.eval(Some(&"pro".into()), &"(".into()));
    }

    #[test]
    fn not_matches_regex() {
        assert!(!Operator::NotMatches.eval(Some(&"pro_annual".into()), &"^pro_".into()));
        assert!(Operator::NotMatches.eval(Some(&"basic".into()), &"^pro_".into()));
        // missing parameter never satisfies a regex operator
        assert!(!Operator::NotMatches.eval(None, &"^pro_".into()));
    }

    #[test]
    fn one_of() {
        let screens = vec![Value::from("home"), Value::from("settings")];
        assert!(Operator::OneOf.eval(Some(&"home".into()), &screens.clone().into()));
        assert!(!Operator::OneOf.eval(Some(&"paywall".into()), &screens.clone().into()));
        assert!(Operator::NotOneOf.eval(Some(&"paywall".into()), &screens.clone().into()));
        assert!(!Operator::NotOneOf.eval(None, &screens.into()));
    }

    #[test]
    fn one_of_compares_string_form() {
        assert!(Operator::OneOf.eval(Some(&3.0.into()), &vec![Value::from("3")].into()));
        assert!(Operator::OneOf.eval(Some(&true.into()), &vec![Value::from("true")].into()));
        assert!(!Operator::OneOf.eval(Some(&1.0.into()), &vec![Value::from("true")].into()));
    }

    #[test]
    fn is_null() {
        assert!(Operator::IsNull.eval(None, &true.into()));
        assert!(Operator::IsNull.eval(Some(&crate::AttributeValue::Null), &true.into()));
        assert!(!Operator::IsNull.eval(Some(&"x".into()), &true.into()));
        assert!(Operator::IsNull.eval(Some(&"x".into()), &false.into()));
    }

    #[test]
    fn numeric_comparison() {
        assert!(Operator::Gte.eval(Some(&3.0.into()), &3.0.into()));
        assert!(!Operator::Gt.eval(Some(&3.0.into()), &3.0.into()));
        assert!(Operator::Lt.eval(Some(&2.0.into()), &3.0.into()));
        assert!(Operator::Lte.eval(Some(&"3".into()), &3.0.into()));
        assert!(!Operator::Lt.eval(Some(&true.into()), &3.0.into()));
    }

    #[test]
    fn semver_comparison() {
        assert!(Operator::Gte.eval(Some(&"2.10.0".into()), &"2.9.0".into()));
        assert!(Operator::Lt.eval(Some(&"2.9.0".into()), &"2.10.0".into()));
        assert!(!Operator::Gt.eval(Some(&"2.9.0".into()), &"2.9.0".into()));
        assert!(!Operator::Gt.eval(Some(&"not-a-version".into()), &"1.0.0".into()));
    }

    #[test]
    fn empty_rule_always_matches() {
        assert!(rule(vec![]).matches(&HashMap::new()));
    }

    #[test]
    fn all_conditions_must_hold() {
        let rule = rule(vec![
            Condition {
                attribute: "sessions".into(),
                operator: Operator::Gte,
                value: 3.0.into(),
            },
            Condition {
                attribute: "plan".into(),
                operator: Operator::OneOf,
                value: vec!["free"].into(),
            },
        ]);

        let params = |sessions: f64, plan: &str| -> Parameters {
            HashMap::from([
                ("sessions".to_owned(), sessions.into()),
                ("plan".to_owned(), plan.into()),
            ])
        };
        assert!(rule.matches(&params(5.0, "free")));
        assert!(!rule.matches(&params(1.0, "free")));
        assert!(!rule.matches(&params(5.0, "pro")));
    }

    #[test]
    fn parses_conditions() {
        let condition: Condition = serde_json::from_str(
            r#"{"operator": "ONE_OF", "attribute": "plan", "value": ["free", "trial"]}"#,
        )
        .unwrap();
        assert_eq!(condition.operator, Operator::OneOf);
    }
}
