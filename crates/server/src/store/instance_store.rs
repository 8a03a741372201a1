use dashmap::DashMap;
use std::sync::Arc;

use vigil_engine::model::{AlertInstance, AlertRuleKey};
use vigil_engine::source::InstanceReader;

/// Live alert instances keyed by the rule that produced them.
#[derive(Clone, Default)]
pub struct InstanceStore {
    instances: Arc<DashMap<AlertRuleKey, Vec<AlertInstance>>>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, instance: AlertInstance) {
        let key = AlertRuleKey {
            org_id: instance.org_id,
            uid: instance.rule_uid.clone(),
        };
        self.instances.entry(key).or_default().push(instance);
    }
}

impl InstanceReader for InstanceStore {
    fn all(&self, org_id: i64) -> Vec<AlertInstance> {
        let mut keyed: Vec<(String, Vec<AlertInstance>)> = self
            .instances
            .iter()
            .filter(|e| e.key().org_id == org_id)
            .map(|e| (e.key().uid.clone(), e.value().clone()))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.into_iter().flat_map(|(_, v)| v).collect()
    }

    fn for_rule(&self, org_id: i64, rule_uid: &str) -> Vec<AlertInstance> {
        let key = AlertRuleKey {
            org_id,
            uid: rule_uid.to_string(),
        };
        self.instances
            .get(&key)
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}
