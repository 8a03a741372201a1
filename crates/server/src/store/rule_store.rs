use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use vigil_engine::model::{AlertRule, AlertRuleKey};
use vigil_engine::source::{
    GroupCursorLister, ListRulesByGroupQuery, ListRulesQuery, RuleLister, SourceError,
};

use super::FolderStore;

/// Rules keyed by (org, uid). Listing order follows the folder display path
/// looked up in the shared [`FolderStore`], so pages cut by the cursor line
/// up with the order groups are rendered in.
#[derive(Clone)]
pub struct RuleStore {
    rules: Arc<DashMap<AlertRuleKey, AlertRule>>,
    folders: FolderStore,
}

/// Where a rule group sits in listing order. Folders sharing a display path
/// are told apart by namespace uid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct GroupPosition(String, String, String);

impl RuleStore {
    pub fn new(folders: FolderStore) -> Self {
        Self {
            rules: Arc::new(DashMap::new()),
            folders,
        }
    }

    pub fn insert(&self, rule: AlertRule) {
        self.rules.insert(rule.key(), rule);
    }

    pub fn count(&self) -> usize {
        self.rules.len()
    }

    /// Rules matching `query`, ordered by folder path, group, then position
    /// within the group.
    pub fn matching(&self, query: &ListRulesQuery) -> Vec<AlertRule> {
        self.positioned(query).into_iter().map(|(_, r)| r).collect()
    }

    fn positioned(&self, query: &ListRulesQuery) -> Vec<(GroupPosition, AlertRule)> {
        let mut out: Vec<(GroupPosition, AlertRule)> = self
            .rules
            .iter()
            .filter(|r| matches_query(r.value(), query))
            .map(|r| {
                let rule = r.value().clone();
                let path = self
                    .folders
                    .full_path(rule.org_id, &rule.namespace_uid)
                    .unwrap_or_default();
                let pos = GroupPosition(path, rule.rule_group.clone(), rule.namespace_uid.clone());
                (pos, rule)
            })
            .collect();
        out.sort_by(|(pa, a), (pb, b)| {
            pa.cmp(pb)
                .then_with(|| a.rule_group_index.cmp(&b.rule_group_index))
                .then_with(|| a.uid.cmp(&b.uid))
        });
        out
    }
}

fn contains_fold(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_query(rule: &AlertRule, q: &ListRulesQuery) -> bool {
    if rule.org_id != q.org_id {
        return false;
    }
    if !q.namespace_uids.is_empty() && !q.namespace_uids.contains(&rule.namespace_uid) {
        return false;
    }
    if !q.rule_uids.is_empty() && !q.rule_uids.contains(&rule.uid) {
        return false;
    }
    if !q.dashboard_uid.is_empty() {
        if rule.dashboard_uid.as_deref() != Some(q.dashboard_uid.as_str()) {
            return false;
        }
        if q.panel_id != 0 && rule.panel_id != Some(q.panel_id) {
            return false;
        }
    }
    if !q.rule_groups.is_empty() && !q.rule_groups.contains(&rule.rule_group) {
        return false;
    }
    if !q.receiver_name.is_empty()
        && !rule
            .notification_settings
            .iter()
            .any(|n| n.receiver == q.receiver_name)
    {
        return false;
    }
    if !q.datasource_uids.is_empty()
        && !rule
            .datasource_uids()
            .iter()
            .any(|uid| q.datasource_uids.contains(uid))
    {
        return false;
    }
    contains_fold(&rule.title, &q.search_title)
        && contains_fold(&rule.rule_group, &q.search_rule_group)
        && q.rule_type.accepts(rule.rule_type())
}

fn encode_cursor(pos: &GroupPosition) -> Result<String, SourceError> {
    let raw = serde_json::to_vec(pos).map_err(|e| SourceError(e.to_string()))?;
    Ok(URL_SAFE.encode(raw))
}

fn invalid_token(e: impl std::fmt::Display) -> SourceError {
    SourceError(format!("invalid continue token: {e}"))
}

fn decode_cursor(token: &str) -> Result<GroupPosition, SourceError> {
    let raw = URL_SAFE.decode(token).map_err(invalid_token)?;
    serde_json::from_slice(&raw).map_err(invalid_token)
}

#[async_trait]
impl RuleLister for RuleStore {
    async fn list_rules(&self, query: &ListRulesQuery) -> Result<Vec<AlertRule>, SourceError> {
        Ok(self.matching(query))
    }
}

#[async_trait]
impl GroupCursorLister for RuleStore {
    async fn list_rules_by_group(
        &self,
        query: &ListRulesByGroupQuery,
    ) -> Result<(Vec<AlertRule>, String), SourceError> {
        let after = if query.continue_token.is_empty() {
            None
        } else {
            Some(decode_cursor(&query.continue_token)?)
        };

        let mut groups: Vec<(GroupPosition, Vec<AlertRule>)> = Vec::new();
        for (pos, rule) in self.positioned(&query.query) {
            if after.as_ref().is_some_and(|after| pos <= *after) {
                continue;
            }
            match groups.last_mut() {
                Some((last, rules)) if *last == pos => rules.push(rule),
                _ => groups.push((pos, vec![rule])),
            }
        }

        let mut rules = Vec::new();
        let mut taken = 0usize;
        for (_, group) in &groups {
            let groups_full = query.group_limit > 0 && taken as i64 >= query.group_limit;
            let rules_full = query.rule_limit > 0 && rules.len() as i64 >= query.rule_limit;
            if groups_full || rules_full {
                break;
            }
            rules.extend(group.iter().cloned());
            taken += 1;
        }

        let token = match taken.checked_sub(1).filter(|_| taken < groups.len()) {
            Some(last) => encode_cursor(&groups[last].0)?,
            None => String::new(),
        };
        Ok((rules, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_engine::model::{Folder, RuleTypeFilter};

    fn rule(uid: &str, ns: &str, group: &str, index: i64) -> AlertRule {
        serde_json::from_value(json!({
            "org_id": 1,
            "uid": uid,
            "namespace_uid": ns,
            "rule_group": group,
            "rule_group_index": index,
            "title": format!("High {uid}"),
            "data": [{"refId": "A", "datasourceUid": format!("ds-{ns}"), "model": {"expr": "up"}}],
            "notification_settings": [{"receiver": format!("team-{ns}")}],
        }))
        .unwrap()
    }

    fn folder(uid: &str, path: &str) -> Folder {
        Folder {
            uid: uid.into(),
            title: path.into(),
            full_path: path.into(),
        }
    }

    // Folder uids sort opposite to their paths.
    fn store() -> RuleStore {
        let folders = FolderStore::new();
        folders.insert(1, folder("a", "Zeta"));
        folders.insert(1, folder("b", "Alpha"));
        let s = RuleStore::new(folders);
        s.insert(rule("r1", "a", "g1", 2));
        s.insert(rule("r2", "a", "g1", 1));
        s.insert(rule("r3", "a", "g2", 1));
        s.insert(rule("r4", "b", "g1", 1));
        s.insert(rule("r5", "b", "g3", 1));
        s
    }

    fn org1() -> ListRulesQuery {
        ListRulesQuery {
            org_id: 1,
            ..Default::default()
        }
    }

    fn uids(rules: &[AlertRule]) -> Vec<&str> {
        rules.iter().map(|r| r.uid.as_str()).collect()
    }

    #[test]
    fn insert_replaces_same_uid() {
        let s = store();
        assert_eq!(s.count(), 5);
        s.insert(rule("r1", "b", "g9", 1));
        assert_eq!(s.count(), 5);
    }

    #[test]
    fn matching_orders_by_folder_path_group_and_index() {
        assert_eq!(uids(&store().matching(&org1())), vec!["r4", "r5", "r2", "r1", "r3"]);
    }

    #[test]
    fn pushdown_filters() {
        let s = store();
        let q = ListRulesQuery {
            namespace_uids: vec!["b".into()],
            ..org1()
        };
        assert_eq!(uids(&s.matching(&q)), vec!["r4", "r5"]);

        let q = ListRulesQuery {
            receiver_name: "team-a".into(),
            rule_groups: vec!["g2".into()],
            ..org1()
        };
        assert_eq!(uids(&s.matching(&q)), vec!["r3"]);

        let q = ListRulesQuery {
            datasource_uids: vec!["ds-b".into()],
            search_title: "high R5".into(),
            ..org1()
        };
        assert_eq!(uids(&s.matching(&q)), vec!["r5"]);

        let q = ListRulesQuery {
            rule_type: RuleTypeFilter::Recording,
            ..org1()
        };
        assert!(s.matching(&q).is_empty());

        let q = ListRulesQuery {
            org_id: 2,
            ..Default::default()
        };
        assert!(s.matching(&q).is_empty());
    }

    #[tokio::test]
    async fn cursor_pages_whole_groups() {
        let s = store();
        let mut query = ListRulesByGroupQuery {
            query: org1(),
            group_limit: 2,
            rule_limit: -1,
            continue_token: String::new(),
        };
        let (rules, token) = s.list_rules_by_group(&query).await.unwrap();
        assert_eq!(uids(&rules), vec!["r4", "r5"]);
        assert!(!token.is_empty());

        query.continue_token = token;
        let (rules, token) = s.list_rules_by_group(&query).await.unwrap();
        assert_eq!(uids(&rules), vec!["r2", "r1", "r3"]);
        assert!(token.is_empty());
    }

    #[tokio::test]
    async fn cursor_rule_limit_completes_the_group() {
        let query = ListRulesByGroupQuery {
            query: ListRulesQuery {
                namespace_uids: vec!["a".into()],
                ..org1()
            },
            group_limit: -1,
            rule_limit: 1,
            continue_token: String::new(),
        };
        let (rules, token) = store().list_rules_by_group(&query).await.unwrap();
        assert_eq!(uids(&rules), vec!["r2", "r1"]);
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn cursor_walk_matches_full_listing() {
        let s = store();
        let mut query = ListRulesByGroupQuery {
            query: org1(),
            group_limit: 1,
            rule_limit: -1,
            continue_token: String::new(),
        };
        let mut walked = Vec::new();
        loop {
            let (rules, token) = s.list_rules_by_group(&query).await.unwrap();
            walked.extend(rules);
            if token.is_empty() {
                break;
            }
            query.continue_token = token;
        }
        assert_eq!(uids(&walked), uids(&s.matching(&org1())));
    }

    #[tokio::test]
    async fn garbage_token_is_an_error() {
        let query = ListRulesByGroupQuery {
            query: org1(),
            group_limit: 1,
            rule_limit: -1,
            continue_token: "not a token".into(),
        };
        let err = store().list_rules_by_group(&query).await.unwrap_err();
        assert!(err.0.starts_with("invalid continue token"));
    }
}
