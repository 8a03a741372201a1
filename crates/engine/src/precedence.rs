use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{AlertInstance, ExecErrState, InstanceState};

/// Tallies keyed by lowercase state or health name.
pub type Totals = BTreeMap<String, i64>;

pub fn add_totals(dest: &mut Totals, source: &Totals) {
    for (k, v) in source {
        *dest.entry(k.clone()).or_insert(0) += v;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayState {
    Inactive,
    Pending,
    Recovering,
    Firing,
}

impl DisplayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Recovering => "recovering",
            Self::Firing => "firing",
        }
    }

    /// The instance state a state filter compares this display state against.
    pub fn coarse(&self) -> InstanceState {
        match self {
            Self::Inactive => InstanceState::Normal,
            Self::Pending => InstanceState::Pending,
            Self::Recovering => InstanceState::Recovering,
            Self::Firing => InstanceState::Alerting,
        }
    }
}

/// Counts one instance into `totals`. An errored instance is counted under
/// `error` a second time unless the rule's policy already maps execution
/// errors to the `Error` state, where it was counted once already.
pub fn count_instance(totals: &mut Totals, instance: &AlertInstance, policy: ExecErrState) {
    *totals
        .entry(instance.state.totals_key().to_string())
        .or_insert(0) += 1;
    if instance.error.is_some() && policy != ExecErrState::Error {
        *totals.entry("error".to_string()).or_insert(0) += 1;
    }
}

/// Fold of a rule's live instances into one display state.
///
/// `Alerting` always wins. `Pending` and `Recovering` only replace
/// `Inactive`, so between the two the first one observed wins: the result
/// then depends on the order the state manager hands instances over.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMerge {
    pub state: DisplayState,
    pub active_at: Option<DateTime<Utc>>,
    pub totals: Totals,
    policy: ExecErrState,
}

impl StateMerge {
    pub fn new(policy: ExecErrState) -> Self {
        Self {
            state: DisplayState::Inactive,
            active_at: None,
            totals: Totals::new(),
            policy,
        }
    }

    pub fn merge<'a, I>(instances: I, policy: ExecErrState) -> Self
    where
        I: IntoIterator<Item = &'a AlertInstance>,
    {
        let mut merge = Self::new(policy);
        for instance in instances {
            merge.observe(instance);
        }
        merge
    }

    pub fn observe(&mut self, instance: &AlertInstance) {
        count_instance(&mut self.totals, instance, self.policy);

        match instance.state {
            InstanceState::Alerting => {
                self.state = DisplayState::Firing;
                match self.active_at {
                    Some(seen) if seen <= instance.starts_at => {}
                    _ => self.active_at = Some(instance.starts_at),
                }
            }
            InstanceState::Pending if self.state == DisplayState::Inactive => {
                self.state = DisplayState::Pending;
            }
            InstanceState::Recovering if self.state == DisplayState::Inactive => {
                self.state = DisplayState::Recovering;
            }
            _ => {}
        }
    }
}
