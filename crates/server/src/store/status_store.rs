use dashmap::DashMap;
use std::sync::Arc;

use vigil_engine::model::{AlertRuleKey, RuleStatus};
use vigil_engine::source::StatusReader;

#[derive(Clone, Default)]
pub struct StatusStore {
    statuses: Arc<DashMap<AlertRuleKey, RuleStatus>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: AlertRuleKey, status: RuleStatus) {
        self.statuses.insert(key, status);
    }
}

impl StatusReader for StatusStore {
    fn status(&self, key: &AlertRuleKey) -> Option<RuleStatus> {
        self.statuses.get(key).map(|s| s.clone())
    }
}
