use std::collections::BTreeSet;

use crate::model::{Health, InstanceState};
use crate::wire::ProjectedRuleGroup;

/// Filters applied to a projected group after its totals are fixed.
#[derive(Debug, Clone, Copy)]
pub struct PostFilter<'a> {
    pub states: &'a BTreeSet<InstanceState>,
    pub health: &'a BTreeSet<Health>,
    pub limit_rules: i64,
}

impl PostFilter<'_> {
    pub fn apply(&self, group: &mut ProjectedRuleGroup) {
        if !self.states.is_empty() {
            retain_by_state(group, self.states);
        }
        if !self.health.is_empty() {
            retain_by_health(group, self.health);
        }
        if self.limit_rules > -1 && group.rules.len() as i64 > self.limit_rules {
            group.rules.truncate(self.limit_rules as usize);
        }
    }
}

/// Keeps rules whose coarse display state is requested. `nodata` and
/// `error` in the set only affect which alerts are surfaced, not rules.
pub fn retain_by_state(group: &mut ProjectedRuleGroup, states: &BTreeSet<InstanceState>) {
    group.rules.retain(|r| states.contains(&r.state.coarse()));
}

pub fn retain_by_health(group: &mut ProjectedRuleGroup, health: &BTreeSet<Health>) {
    group.rules.retain(|r| health.contains(&r.health));
}
