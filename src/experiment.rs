//! Experiments attached to trigger rules, and deterministic assignment of their variants.
use serde::{Deserialize, Serialize};

use crate::sharder::Sharder;

/// An experiment definition before a variant has been assigned for the current user.
///
/// Immutable once decoded from the remote configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExperiment {
    /// Experiment identifier.
    pub id: String,
    /// Identifier of the campaign group the experiment belongs to.
    pub group_id: String,
    /// Variants with their traffic percentages.
    pub variants: Vec<VariantOption>,
}

/// One arm of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOption {
    /// Variant identifier.
    pub id: String,
    /// Whether users in this variant see a paywall.
    #[serde(rename = "type")]
    pub variant_type: VariantType,
    /// Share of traffic. Percentages are relative to their sum, so they need not add up to 100.
    pub percentage: u64,
    /// Paywall shown to users in a treatment variant.
    #[serde(default)]
    pub paywall_identifier: Option<String>,
}

/// Kind of an experiment variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariantType {
    /// Users are shown a paywall.
    Treatment,
    /// Control group, users are not shown a paywall.
    Holdout,
}

/// An assigned variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Variant {
    pub id: String,
    #[serde(rename = "type")]
    pub variant_type: VariantType,
    pub paywall_identifier: Option<String>,
}

/// An experiment together with the variant assigned to the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Experiment {
    pub id: String,
    pub group_id: String,
    pub variant: Variant,
}

impl RawExperiment {
    /// Assign a variant to `user_id`.
    ///
    /// Returns `None` if the experiment has no traffic (all percentages are zero) or the
    /// percentages don't fit in a `u64`.
    pub fn assign(&self, user_id: &str, sharder: &impl Sharder) -> Option<Experiment> {
        let Some(total) = self
            .variants
            .iter()
            .try_fold(0u64, |total, v| total.checked_add(v.percentage))
        else {
            log::warn!(target: "paywall",
                       experiment_id:display = self.id;
                       "experiment variant percentages overflow");
            return None;
        };
        if total == 0 {
            log::warn!(target: "paywall",
                       experiment_id:display = self.id;
                       "experiment has no variants with traffic");
            return None;
        }

        let shard = sharder.get_shard(&format!("{}-{}", self.id, user_id), total);

        let mut upper = 0;
        let option = self.variants.iter().find(|v| {
            upper += v.percentage;
            shard < upper
        })?;

        Some(Experiment {
            id: self.id.clone(),
            group_id: self.group_id.clone(),
            variant: Variant {
                id: option.id.clone(),
                variant_type: option.variant_type,
                paywall_identifier: option.paywall_identifier.clone(),
            },
        })
    }
}
