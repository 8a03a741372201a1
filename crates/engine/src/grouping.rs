use std::collections::{BTreeSet, HashMap, HashSet};

use crate::model::{AlertRule, RuleGroupKey};
use crate::token::ContinuationToken;

/// Rules of one (org, namespace, group), ordered by group index.
#[derive(Debug, Clone)]
pub struct RuleBucket {
    pub folder: String,
    pub key: RuleGroupKey,
    pub rules: Vec<AlertRule>,
}

impl RuleBucket {
    pub fn token(&self) -> ContinuationToken {
        ContinuationToken::for_group(&self.folder, &self.key.rule_group)
    }
}

/// Buckets `rules` by group key and orders buckets by (folder path, group
/// name). Rules outside `rule_names` (when non-empty) are dropped, as are
/// whole buckets whose namespace is missing from `namespaces`.
pub fn group_rules(
    rules: Vec<AlertRule>,
    rule_names: &HashSet<String>,
    namespaces: &HashMap<String, String>,
) -> Vec<RuleBucket> {
    let mut grouped: HashMap<RuleGroupKey, Vec<AlertRule>> = HashMap::new();
    for rule in rules {
        if !rule_names.is_empty() && !rule_names.contains(&rule.title) {
            continue;
        }
        grouped.entry(rule.group_key()).or_default().push(rule);
    }

    let mut hidden = BTreeSet::new();
    let mut buckets = Vec::with_capacity(grouped.len());
    for (key, mut rules) in grouped {
        let Some(folder) = namespaces.get(&key.namespace_uid) else {
            hidden.insert(key.namespace_uid);
            continue;
        };
        rules.sort_by(|a, b| {
            a.rule_group_index
                .cmp(&b.rule_group_index)
                .then_with(|| a.uid.cmp(&b.uid))
        });
        buckets.push(RuleBucket {
            folder: folder.clone(),
            key,
            rules,
        });
    }

    for folder_uid in hidden {
        tracing::warn!(
            %folder_uid,
            "query returned rules in a folder the caller cannot see, dropping them"
        );
    }

    buckets.sort_by(|a, b| {
        a.folder
            .cmp(&b.folder)
            .then_with(|| a.key.rule_group.cmp(&b.key.rule_group))
            .then_with(|| a.key.namespace_uid.cmp(&b.key.namespace_uid))
    });
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(uid: &str, ns: &str, group: &str, index: i64) -> AlertRule {
        serde_json::from_value(json!({
            "org_id": 1,
            "uid": uid,
            "namespace_uid": ns,
            "rule_group": group,
            "rule_group_index": index,
            "title": format!("title-{uid}"),
        }))
        .unwrap()
    }

    fn namespaces() -> HashMap<String, String> {
        HashMap::from([
            ("f1".to_string(), "Beta".to_string()),
            ("f2".to_string(), "Alpha".to_string()),
        ])
    }

    #[test]
    fn buckets_sorted_by_folder_then_group() {
        let rules = vec![
            rule("r1", "f1", "b", 1),
            rule("r2", "f2", "z", 1),
            rule("r3", "f1", "a", 1),
        ];
        let buckets = group_rules(rules, &HashSet::new(), &namespaces());
        let order: Vec<_> = buckets
            .iter()
            .map(|b| (b.folder.as_str(), b.key.rule_group.as_str()))
            .collect();
        assert_eq!(order, vec![("Alpha", "z"), ("Beta", "a"), ("Beta", "b")]);
    }

    #[test]
    fn rules_sorted_by_group_index_not_insertion() {
        let rules = vec![
            rule("r1", "f1", "g", 7),
            rule("r2", "f1", "g", 2),
            rule("r3", "f1", "g", 4),
        ];
        let buckets = group_rules(rules, &HashSet::new(), &namespaces());
        let uids: Vec<_> = buckets[0].rules.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, vec!["r2", "r3", "r1"]);
    }

    #[test]
    fn invisible_namespace_dropped() {
        let rules = vec![rule("r1", "ghost", "g", 1), rule("r2", "f1", "g", 1)];
        let buckets = group_rules(rules, &HashSet::new(), &namespaces());
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key.namespace_uid, "f1");
    }

    #[test]
    fn name_filter_applies_before_grouping() {
        let rules = vec![rule("r1", "f1", "g", 1), rule("r2", "f1", "h", 1)];
        let names = HashSet::from(["title-r2".to_string()]);
        let buckets = group_rules(rules, &names, &namespaces());
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key.rule_group, "h");
    }

    #[test]
    fn grouping_preserves_visible_rule_count() {
        let rules = vec![
            rule("r1", "f1", "g", 1),
            rule("r2", "f1", "g", 2),
            rule("r3", "f2", "g", 1),
            rule("r4", "ghost", "g", 1),
        ];
        let buckets = group_rules(rules, &HashSet::new(), &namespaces());
        let total: usize = buckets.iter().map(|b| b.rules.len()).sum();
        assert_eq!(total, 3);
    }
}
