//! Plan-time mutation validation.
//!
//! Runs before any API call. Every field whose value differs between the
//! prior and desired state gets a [`MutationDecision`]; a single
//! `ForceReplace` turns the plan into destroy-and-recreate and a single
//! `Reject` aborts it.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::schema::{DatabaseState, Field, FieldValue};

/// Plan validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(Field),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: Field, reason: String },

    #[error("invalid change to {field}: {reason}")]
    RejectedChange { field: Field, reason: String },
}

/// Outcome of evaluating one field transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationDecision {
    Allow,
    ForceReplace,
    Reject(String),
}

impl MutationDecision {
    fn severity(&self) -> u8 {
        match self {
            MutationDecision::Allow => 0,
            MutationDecision::ForceReplace => 1,
            MutationDecision::Reject(_) => 2,
        }
    }

    /// Keep the more severe of two decisions.
    fn merge(self, other: MutationDecision) -> MutationDecision {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/// A rule evaluated on (old, new) for one field.
pub type MutationRule = fn(&FieldValue, &FieldValue) -> MutationDecision;

/// Sharding cannot be disabled in place.
pub fn sharding_rule(old: &FieldValue, new: &FieldValue) -> MutationDecision {
    match (old.as_bool(), new.as_bool()) {
        (Some(true), Some(false)) => MutationDecision::ForceReplace,
        _ => MutationDecision::Allow,
    }
}

/// Shard count can only grow, and only by an integer multiple.
pub fn shard_count_rule(old: &FieldValue, new: &FieldValue) -> MutationDecision {
    let (Some(old), Some(new)) = (old.as_int(), new.as_int()) else {
        return MutationDecision::Allow;
    };
    // Not set yet
    if old <= 0 {
        return MutationDecision::Allow;
    }
    if new < old {
        return MutationDecision::ForceReplace;
    }
    if new % old != 0 {
        return MutationDecision::Reject(format!(
            "new shard count must be a multiple of the old value: {}",
            old
        ));
    }
    MutationDecision::Allow
}

/// Mutation rules keyed by field.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: BTreeMap<Field, Vec<MutationRule>>,
}

impl RuleTable {
    /// No dynamic rules; only static force-new flags apply.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rules for sharded databases: no disabling sharding, no shrinking
    /// and only multiplicative growth of the shard count.
    pub fn sharding() -> Self {
        Self::empty()
            .with_rule(Field::Sharding, sharding_rule)
            .with_rule(Field::ShardCount, shard_count_rule)
    }

    pub fn with_rule(mut self, field: Field, rule: MutationRule) -> Self {
        self.rules.entry(field).or_default().push(rule);
        self
    }

    /// Evaluate one changed field. Static force-new wins over Allow;
    /// a Reject from any rule wins over everything.
    pub fn decide(&self, field: Field, old: &FieldValue, new: &FieldValue) -> MutationDecision {
        let initial = if field.schema().force_new {
            MutationDecision::ForceReplace
        } else {
            MutationDecision::Allow
        };

        self.rules
            .get(&field)
            .into_iter()
            .flatten()
            .fold(initial, |acc, rule| acc.merge(rule(old, new)))
    }
}

/// One changed field in a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: Field,
    pub old: FieldValue,
    pub new: FieldValue,
    pub decision: MutationDecision,
}

/// Result of planning a transition from prior to desired state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanDiff {
    pub changes: Vec<FieldChange>,
    pub requires_replace: bool,
}

impl PlanDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn decision(&self, field: Field) -> Option<&MutationDecision> {
        self.changes
            .iter()
            .find(|c| c.field == field)
            .map(|c| &c.decision)
    }
}

/// Plan the transition from `old` to `new`.
///
/// `old` is `None` when the resource does not exist yet; such a plan has
/// no per-field decisions.
pub fn plan(
    old: Option<&DatabaseState>,
    new: &DatabaseState,
    rules: &RuleTable,
) -> Result<PlanDiff, ValidationError> {
    new.validate()?;

    let Some(old) = old else {
        return Ok(PlanDiff::default());
    };

    let mut diff = PlanDiff::default();
    for field in Field::ALL {
        let (old_value, new_value) = (old.get(field), new.get(field));
        if old_value == new_value {
            continue;
        }

        let decision = rules.decide(field, &old_value, &new_value);
        debug!("{}: {} -> {} ({:?})", field, old_value, new_value, decision);

        if let MutationDecision::Reject(reason) = &decision {
            return Err(ValidationError::RejectedChange {
                field,
                reason: reason.clone(),
            });
        }
        if decision == MutationDecision::ForceReplace {
            diff.requires_replace = true;
        }
        diff.changes.push(FieldChange {
            field,
            old: old_value,
            new: new_value,
            decision,
        });
    }

    Ok(diff)
}
