//! Contracts of the collaborators the engine reads from.
//!
//! Traits that may perform I/O are async; the status and live-state readers
//! are in-memory snapshots and stay synchronous. The engine holds nothing
//! across an await, so dropping the request future cancels cleanly.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::model::{
    AlertInstance, AlertRule, AlertRuleKey, Caller, Folder, Provenance, RuleStatus, RuleTypeFilter,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError(pub String);

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SourceError {}

/// Filters pushed down to the rule store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRulesQuery {
    pub org_id: i64,
    pub namespace_uids: Vec<String>,
    pub rule_uids: Vec<String>,
    pub dashboard_uid: String,
    pub panel_id: i64,
    pub rule_groups: Vec<String>,
    pub receiver_name: String,
    pub datasource_uids: Vec<String>,
    pub search_title: String,
    pub search_rule_group: String,
    pub rule_type: RuleTypeFilter,
}

/// One page request against a group-cursor store. Limits of `-1` mean
/// unbounded; the token is opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRulesByGroupQuery {
    pub query: ListRulesQuery,
    pub group_limit: i64,
    pub rule_limit: i64,
    pub continue_token: String,
}

#[async_trait]
pub trait NamespaceSource: Send + Sync {
    async fn visible_namespaces(
        &self,
        org_id: i64,
        caller: &Caller,
    ) -> Result<HashMap<String, Folder>, SourceError>;
}

#[async_trait]
pub trait FolderAccess: Send + Sync {
    async fn has_access_in_folder(&self, caller: &Caller, folder: &Folder) -> Result<bool, SourceError>;
}

#[async_trait]
pub trait RuleLister: Send + Sync {
    async fn list_rules(&self, query: &ListRulesQuery) -> Result<Vec<AlertRule>, SourceError>;
}

#[async_trait]
pub trait GroupCursorLister: Send + Sync {
    /// Returns the rules of up to `group_limit` whole groups and the token
    /// of the next page, empty when exhausted. Groups come in folder path
    /// order, then group name, then namespace uid.
    async fn list_rules_by_group(
        &self,
        query: &ListRulesByGroupQuery,
    ) -> Result<(Vec<AlertRule>, String), SourceError>;
}

#[async_trait]
pub trait ProvenanceSource: Send + Sync {
    async fn provenances(
        &self,
        org_id: i64,
        resource_type: &str,
    ) -> Result<HashMap<String, Provenance>, SourceError>;
}

pub trait StatusReader: Send + Sync {
    fn status(&self, key: &AlertRuleKey) -> Option<RuleStatus>;
}

pub trait InstanceReader: Send + Sync {
    fn all(&self, org_id: i64) -> Vec<AlertInstance>;
    fn for_rule(&self, org_id: i64, rule_uid: &str) -> Vec<AlertInstance>;
}

#[async_trait]
impl<T: RuleLister + ?Sized> RuleLister for Arc<T> {
    async fn list_rules(&self, query: &ListRulesQuery) -> Result<Vec<AlertRule>, SourceError> {
        (**self).list_rules(query).await
    }
}

#[async_trait]
impl<T: GroupCursorLister + ?Sized> GroupCursorLister for Arc<T> {
    async fn list_rules_by_group(
        &self,
        query: &ListRulesByGroupQuery,
    ) -> Result<(Vec<AlertRule>, String), SourceError> {
        (**self).list_rules_by_group(query).await
    }
}

impl<T: StatusReader + ?Sized> StatusReader for Arc<T> {
    fn status(&self, key: &AlertRuleKey) -> Option<RuleStatus> {
        (**self).status(key)
    }
}

impl<T: InstanceReader + ?Sized> InstanceReader for Arc<T> {
    fn all(&self, org_id: i64) -> Vec<AlertInstance> {
        (**self).all(org_id)
    }

    fn for_rule(&self, org_id: i64, rule_uid: &str) -> Vec<AlertInstance> {
        (**self).for_rule(org_id, rule_uid)
    }
}
