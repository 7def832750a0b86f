//! A Rust SDK for event-triggered paywalls.
//!
//! # Overview
//!
//! The SDK revolves around a [`Paywall`] context that watches analytics events fired by the host
//! app. Each event is classified against the triggers configured on the server ([`classify`]). When
//! an event fires a trigger, its rules pick an experiment and a variant for the user, and a
//! [`PresentationRequest`] is handed to the host app's [`Presenter`].
//!
//! Deep links (the [`DEEP_LINK_EVENT`] event) always present a paywall, dismissing the current one
//! if needed. Events reserved by the SDK are never used as triggers; a warning is reported through
//! [`Diagnostics`] instead.
//!
//! A [`TriggerLogger`] should be provided to save trigger fire events to your analytics storage,
//! facilitating tracking of which user saw which paywall.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Event handling itself never fails: every event
//! resolves to a [`PresentationOutcome`] describing what happened to it.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages. Consider integrating a `log`-compatible logger implementation for better visibility
//! into SDK operations.
//!
//! # Examples
//!
//! A runnable example lives in `demos/simple`.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod client;
mod config;
mod configuration;
mod configuration_fetcher;
mod diagnostics;
mod error;
mod evaluator;
mod event;
mod experiment;
mod identity;
mod pipeline;
mod poller;
mod presentation;
mod presentation_queue;
mod rules;
mod sharder;
mod subscription;
mod trigger_logger;
mod trigger_registry;

pub use client::Paywall;
pub use config::PaywallConfig;
pub use configuration::{ConfigResponse, Configuration, Trigger, TryParse};
pub use diagnostics::Diagnostics;
pub use error::{Error, Result};
pub use evaluator::{
    classify, resolve_trigger, TriggerOutcome, TriggerResult, DEEP_LINK_EVENT,
    DEFAULT_DISALLOWED_EVENTS,
};
pub use event::{AttributeValue, EventData, Parameters};
pub use experiment::{Experiment, RawExperiment, Variant, VariantOption, VariantType};
pub use identity::{IdentityManager, IdentityProvider, UserIdentity};
pub use pipeline::{PresentationOutcome, SuppressionReason};
pub use poller::PollerThread;
pub use presentation::{PresentationError, PresentationInfo, PresentationRequest, Presenter};
pub use rules::{Condition, ConditionValue, Operator, TriggerRule, Value};
pub use sharder::{Md5Sharder, Sharder};
pub use subscription::{SubscriptionStatus, SubscriptionStatusStore};
pub use trigger_logger::{TriggerFireEvent, TriggerLogger};
