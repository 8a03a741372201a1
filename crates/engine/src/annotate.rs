use std::collections::BTreeSet;

use crate::matcher::{matches_all, LabelMatcher};
use crate::model::{labels_for_output, AlertInstance, AlertRule, InstanceState, RuleStatus};
use crate::precedence::{count_instance, StateMerge, Totals};
use crate::source::{InstanceReader, StatusReader};
use crate::wire::{ProjectedAlert, ProjectedRule};

/// Decides which of a rule's alerts are surfaced on it.
#[derive(Debug, Clone, Copy)]
pub struct AlertFilter<'a> {
    pub states: &'a BTreeSet<InstanceState>,
    pub matchers: &'a [LabelMatcher],
    pub include_internal_labels: bool,
}

impl AlertFilter<'_> {
    pub fn admits(&self, instance: &AlertInstance) -> bool {
        if !self.states.is_empty() && !self.states.contains(&instance.state) {
            return false;
        }
        matches_all(self.matchers, &instance.labels)
    }
}

/// Per-rule instance tallies: all instances, and only the surfaced ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTotals {
    pub totals: Totals,
    pub filtered: Totals,
}

/// Attaches scheduler health to a projected rule.
pub trait StatusAnnotator: Send + Sync {
    fn annotate_status(&self, rule: &AlertRule, out: &mut ProjectedRule);
}

/// Attaches live alert state to a projected rule: display state, active
/// since, and the surfaced alerts.
pub trait StateAnnotator: Send + Sync {
    fn annotate_states(&self, rule: &AlertRule, out: &mut ProjectedRule, filter: &AlertFilter<'_>) -> RuleTotals;
}

pub struct ReaderStatusAnnotator<R> {
    reader: R,
}

impl<R: StatusReader> ReaderStatusAnnotator<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: StatusReader> StatusAnnotator for ReaderStatusAnnotator<R> {
    fn annotate_status(&self, rule: &AlertRule, out: &mut ProjectedRule) {
        let status = self
            .reader
            .status(&rule.key())
            .unwrap_or_else(RuleStatus::unscheduled);
        out.health = status.health;
        out.last_error = status.last_error.unwrap_or_default();
        out.last_evaluation = status.evaluation_timestamp;
        out.evaluation_time = status.evaluation_duration.as_secs_f64();
    }
}

pub struct InstanceStateAnnotator<M> {
    manager: M,
}

impl<M: InstanceReader> InstanceStateAnnotator<M> {
    pub fn new(manager: M) -> Self {
        Self { manager }
    }
}

impl<M: InstanceReader> StateAnnotator for InstanceStateAnnotator<M> {
    fn annotate_states(&self, rule: &AlertRule, out: &mut ProjectedRule, filter: &AlertFilter<'_>) -> RuleTotals {
        let instances = self.manager.for_rule(rule.org_id, &rule.uid);
        let mut merge = StateMerge::new(rule.exec_err_state);
        let mut filtered = Totals::new();

        for instance in &instances {
            merge.observe(instance);
            if !filter.admits(instance) {
                continue;
            }
            count_instance(&mut filtered, instance, rule.exec_err_state);
            out.alerts
                .push(project_alert(instance, filter.include_internal_labels));
        }

        out.state = merge.state;
        out.active_at = merge.active_at;
        RuleTotals {
            totals: merge.totals,
            filtered,
        }
    }
}

pub fn project_alert(instance: &AlertInstance, include_internal_labels: bool) -> ProjectedAlert {
    let value = if instance.state.carries_value() {
        format_values(instance)
    } else {
        String::new()
    };
    ProjectedAlert {
        labels: labels_for_output(&instance.labels, include_internal_labels),
        annotations: instance.annotations.clone(),
        state: format_state(instance),
        active_at: instance.starts_at,
        value,
        instance_state: instance.state,
    }
}

/// `Alerting`, or `Alerting (NoData)` when the state has a reason.
pub fn format_state(instance: &AlertInstance) -> String {
    if instance.state_reason.is_empty() {
        instance.state.to_string()
    } else {
        format!("{} ({})", instance.state, instance.state_reason)
    }
}

pub fn format_values(instance: &AlertInstance) -> String {
    let values = &instance.last_evaluation_values;
    match values.len() {
        0 => instance.last_evaluation_string.clone(),
        1 => values.values().map(|v| format_float(*v)).collect(),
        _ => {
            let mut parts: Vec<String> = values
                .iter()
                .map(|(k, v)| format!("{k}: {}", format_float(*v)))
                .collect();
            parts.sort();
            parts.join(", ")
        }
    }
}

/// Shortest exponent form with a signed two-digit exponent: `3.5e+01`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NaN".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf".into() } else { "-Inf".into() };
    }
    let raw = format!("{v:e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}
