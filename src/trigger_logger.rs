use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{evaluator::TriggerOutcome, experiment::Experiment, pipeline::PresentationOutcome};

/// Record of an event that fired a trigger (or a deep link).
///
/// Emitted once the pipeline is done with the event, so that analytics can attribute paywall
/// presentations and holdouts to triggers and experiments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerFireEvent {
    /// Name of the event that was evaluated.
    pub event_name: String,
    /// User the event was evaluated for.
    pub user_id: String,
    /// Classification of the event.
    pub trigger_outcome: TriggerOutcome,
    /// Experiment the user was assigned to, if any.
    pub experiment: Option<Experiment>,
    /// What the pipeline ended up doing.
    pub result: PresentationOutcome,
    /// When the evaluation finished.
    pub timestamp: DateTime<Utc>,
}

/// A trait for logging trigger fire events to your analytics storage.
pub trait TriggerLogger {
    /// Log the trigger fire event.
    ///
    /// This method is called from the pipeline task, so it should return quickly and must not
    /// panic.
    fn log_trigger_fire(&self, event: TriggerFireEvent);
}

pub(crate) struct NoopTriggerLogger;
impl TriggerLogger for NoopTriggerLogger {
    fn log_trigger_fire(&self, _event: TriggerFireEvent) {}
}

impl<T: Fn(TriggerFireEvent)> TriggerLogger for T {
    fn log_trigger_fire(&self, event: TriggerFireEvent) {
        self(event);
    }
}
