use std::collections::HashMap;

use crate::annotate::{AlertFilter, StateAnnotator, StatusAnnotator};
use crate::grouping::RuleBucket;
use crate::importance::{sort_by_importance, top_k};
use crate::model::{labels_for_output, zero_time, AlertRule, Health, Provenance, QueryTextError};
use crate::precedence::{DisplayState, Totals};
use crate::wire::{ProjectedRule, ProjectedRuleGroup};

/// Turns a bucket of stored rules into its wire representation, merging
/// in scheduler status, live alert state and provenance.
pub struct GroupProjector<'a> {
    pub status: &'a dyn StatusAnnotator,
    pub states: &'a dyn StateAnnotator,
    pub provenances: &'a HashMap<String, Provenance>,
    pub limit_alerts: i64,
    pub filter: AlertFilter<'a>,
}

impl GroupProjector<'_> {
    /// The returned group's `totals` are complete: post-filters that later
    /// drop rules from it must leave them untouched.
    pub fn project(&self, bucket: &RuleBucket) -> ProjectedRuleGroup {
        let mut group = ProjectedRuleGroup {
            name: bucket.key.rule_group.clone(),
            file: bucket.folder.clone(),
            folder_uid: bucket.key.namespace_uid.clone(),
            rules: Vec::with_capacity(bucket.rules.len()),
            totals: Totals::new(),
            interval: 0.0,
            last_evaluation: zero_time(),
            evaluation_time: 0.0,
        };

        for rule in &bucket.rules {
            let projected = self.project_rule(rule);

            *group
                .totals
                .entry(projected.state.as_str().to_string())
                .or_insert(0) += 1;
            if matches!(projected.health, Health::Error | Health::NoData) {
                *group
                    .totals
                    .entry(projected.health.as_str().to_string())
                    .or_insert(0) += 1;
            }

            // Rules of a group share one evaluation interval upstream.
            group.interval = rule.interval_seconds as f64;
            group.evaluation_time = projected.evaluation_time;
            group.last_evaluation = projected.last_evaluation;
            group.rules.push(projected);
        }

        group
    }

    fn project_rule(&self, rule: &AlertRule) -> ProjectedRule {
        let provenance = self
            .provenances
            .get(rule.resource_id())
            .copied()
            .unwrap_or_default();

        let mut out = ProjectedRule {
            state: DisplayState::Inactive,
            name: rule.title.clone(),
            query: rule_to_query(rule),
            queried_datasource_uids: rule.datasource_uids(),
            duration: rule.for_duration.as_secs_f64(),
            keep_firing_for: rule.keep_firing_for.as_secs_f64(),
            annotations: rule.annotations.clone(),
            active_at: None,
            alerts: Vec::new(),
            totals: Totals::new(),
            totals_filtered: Totals::new(),
            notification_settings: rule.notification_settings.first().cloned(),
            uid: rule.uid.clone(),
            folder_uid: rule.namespace_uid.clone(),
            labels: labels_for_output(&rule.labels, self.filter.include_internal_labels),
            health: Health::Ok,
            last_error: String::new(),
            rule_type: rule.rule_type().as_str().to_string(),
            last_evaluation: zero_time(),
            evaluation_time: 0.0,
            is_paused: rule.is_paused,
            provenance,
        };

        self.status.annotate_status(rule, &mut out);
        let totals = self.states.annotate_states(rule, &mut out, &self.filter);

        if self.limit_alerts > -1 && out.alerts.len() as i64 > self.limit_alerts {
            let alerts = std::mem::take(&mut out.alerts);
            out.alerts = top_k(alerts, self.limit_alerts as usize);
        } else {
            sort_by_importance(&mut out.alerts);
        }

        out.totals = totals.totals;
        out.totals_filtered = totals.filtered;
        out
    }
}

/// Joins the query text of every pipeline step with `" | "`. Steps without
/// a query (conditions, math) are skipped; any other decode failure falls
/// back to the serialized pipeline.
pub fn rule_to_query(rule: &AlertRule) -> String {
    let mut queries = Vec::with_capacity(rule.data.len());
    for step in &rule.data {
        match step.query_text() {
            Ok(q) => queries.push(q),
            Err(QueryTextError::NoQuery) => continue,
            Err(e) => {
                tracing::debug!(rule_uid = %rule.uid, ref_id = %step.ref_id, error = %e, "failed to parse a query");
                return encoded_queries(rule);
            }
        }
    }

    if queries.is_empty() {
        return encoded_queries(rule);
    }
    queries.join(" | ")
}

fn encoded_queries(rule: &AlertRule) -> String {
    serde_json::to_string(&rule.data).unwrap_or_else(|e| e.to_string())
}
