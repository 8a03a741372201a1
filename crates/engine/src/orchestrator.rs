use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::Instrument;

use crate::annotate::{project_alert, AlertFilter, StateAnnotator, StatusAnnotator};
use crate::filter::PostFilter;
use crate::importance::sort_by_importance;
use crate::model::{Caller, Folder, ALERT_RULE_RESOURCE_TYPE};
use crate::pagination::{Assembler, GroupPager, PageRequest};
use crate::projector::GroupProjector;
use crate::query::{include_internal_labels, QueryError, RawParams, RuleStatusQuery};
use crate::source::{FolderAccess, InstanceReader, ListRulesQuery, NamespaceSource, ProvenanceSource, SourceError};
use crate::wire::{AlertResponse, ErrorType, RuleDiscovery, RuleResponse};

/// Everything the service reads from. Which [`GroupPager`] is wired in
/// decides between store-driven and client-side pagination.
#[derive(Clone)]
pub struct Collaborators {
    pub namespaces: Arc<dyn NamespaceSource>,
    pub access: Arc<dyn FolderAccess>,
    pub provenances: Arc<dyn ProvenanceSource>,
    pub pager: Arc<dyn GroupPager>,
    pub status: Arc<dyn StatusAnnotator>,
    pub states: Arc<dyn StateAnnotator>,
    pub instances: Arc<dyn InstanceReader>,
}

#[derive(Debug)]
enum StatusError {
    Query(QueryError),
    Stage(&'static str, SourceError),
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(e) => write!(f, "{e}"),
            Self::Stage(stage, e) => write!(f, "{stage}: {e}"),
        }
    }
}

impl From<QueryError> for StatusError {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

impl StatusError {
    fn error_type(&self) -> ErrorType {
        match self {
            Self::Query(_) => ErrorType::BadData,
            Self::Stage(..) => ErrorType::Server,
        }
    }
}

/// Read path for rule and alert status. Stateless between requests.
#[derive(Clone)]
pub struct RuleStatusService {
    deps: Collaborators,
}

impl RuleStatusService {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    /// Grouped, filtered and possibly paginated rule statuses. Failures are
    /// reported inside the envelope; partial results are never returned.
    pub async fn rule_statuses(&self, caller: &Caller, params: &RawParams) -> RuleResponse {
        let span = tracing::debug_span!("rule_statuses", org_id = caller.org_id);
        match self.prepare(caller, params).instrument(span).await {
            Ok(data) => RuleResponse::success(data),
            Err(e) => {
                tracing::debug!(error = %e, "rule status request failed");
                RuleResponse::failure(e.error_type(), e.to_string())
            }
        }
    }

    async fn prepare(&self, caller: &Caller, params: &RawParams) -> Result<RuleDiscovery, StatusError> {
        let query = RuleStatusQuery::parse(params)?;
        tracing::debug!(
            limit_rules = query.limit_rules,
            limit_alerts = query.limit_alerts,
            group_limit = query.group_limit,
            rule_limit = query.rule_limit,
            states = query.states.len(),
            health = query.health.len(),
            matchers = query.matchers.len(),
            rule_names = query.rule_names.len(),
            has_token = !query.group_next_token.is_empty(),
            "parsed rule status query"
        );

        const NAMESPACES: &str = "failed to get namespaces visible to the user";
        let visible = self
            .deps
            .namespaces
            .visible_namespaces(caller.org_id, caller)
            .await
            .map_err(|e| StatusError::Stage(NAMESPACES, e))?;

        let mut allowed = HashMap::with_capacity(visible.len());
        for (uid, folder) in visible {
            let granted = self
                .deps
                .access
                .has_access_in_folder(caller, &folder)
                .await
                .map_err(|e| StatusError::Stage(NAMESPACES, e))?;
            if granted {
                allowed.insert(uid, folder);
            }
        }
        if allowed.is_empty() {
            tracing::debug!("caller has no visible namespaces");
            return Ok(RuleDiscovery::default());
        }

        let provenances = self
            .deps
            .provenances
            .provenances(caller.org_id, ALERT_RULE_RESOURCE_TYPE)
            .await
            .map_err(|e| StatusError::Stage("failed to get provenances visible to the user", e))?;

        let namespaces = select_namespaces(&allowed, &query.folder_uid, &query.search_folder);
        if namespaces.is_empty() {
            tracing::debug!(search_folder = %query.search_folder, "no folder matched the search");
            return Ok(RuleDiscovery::default());
        }

        let mut namespace_uids: Vec<String> = namespaces.keys().cloned().collect();
        namespace_uids.sort();
        let list = ListRulesQuery {
            org_id: caller.org_id,
            namespace_uids,
            rule_uids: query.rule_uids.clone(),
            dashboard_uid: query.dashboard_uid.clone(),
            panel_id: query.panel_id,
            rule_groups: query.rule_groups.clone(),
            receiver_name: query.receiver_name.clone(),
            datasource_uids: query.datasource_uids.clone(),
            search_title: query.search_rule_name.clone(),
            search_rule_group: query.search_rule_group.clone(),
            rule_type: query.rule_type,
        };

        let assembler = Assembler {
            projector: GroupProjector {
                status: &*self.deps.status,
                states: &*self.deps.states,
                provenances: &provenances,
                limit_alerts: query.limit_alerts,
                filter: AlertFilter {
                    states: &query.states,
                    matchers: &query.matchers,
                    include_internal_labels: query.include_internal_labels,
                },
            },
            post: PostFilter {
                states: &query.states,
                health: &query.health,
                limit_rules: query.limit_rules,
            },
        };
        let request = PageRequest {
            query: &list,
            rule_names: &query.rule_names,
            namespaces: &namespaces,
            group_limit: query.group_limit,
            rule_limit: query.rule_limit,
            token: &query.group_next_token,
        };

        let page = self
            .deps
            .pager
            .page(&request, &assembler)
            .await
            .map_err(|e| StatusError::Stage("failure getting rules", e))?;
        tracing::debug!(
            groups = page.groups.len(),
            has_next = !page.next_token.is_empty(),
            "assembled rule groups"
        );

        let totals = (!self.deps.pager.paginates(&request)).then_some(page.totals);
        Ok(RuleDiscovery {
            groups: page.groups,
            next_token: page.next_token,
            totals,
        })
    }

    /// Every live alert of the org, most important first.
    pub async fn alert_statuses(&self, org_id: i64, params: &RawParams) -> AlertResponse {
        let include_internal = include_internal_labels(params);
        let mut alerts: Vec<_> = self
            .deps
            .instances
            .all(org_id)
            .iter()
            .map(|i| project_alert(i, include_internal))
            .collect();
        sort_by_importance(&mut alerts);
        AlertResponse::success(alerts)
    }
}

/// Narrows the caller's folders to the ones a request asks for, as a map of
/// namespace uid to display path. A `folder_uid` the caller cannot see is
/// ignored; `search_folder` is a case-insensitive substring of the path.
pub fn select_namespaces(
    allowed: &HashMap<String, Folder>,
    folder_uid: &str,
    search_folder: &str,
) -> HashMap<String, String> {
    if let Some(folder) = allowed.get(folder_uid) {
        return HashMap::from([(folder_uid.to_string(), folder.full_path.clone())]);
    }

    let needle = search_folder.to_lowercase();
    allowed
        .iter()
        .filter(|(_, f)| needle.is_empty() || f.full_path.to_lowercase().contains(&needle))
        .map(|(uid, f)| (uid.clone(), f.full_path.clone()))
        .collect()
}
