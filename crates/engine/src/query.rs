use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::matcher::{LabelMatcher, MatcherError};
use crate::model::{Health, InstanceState, RuleTypeFilter};

pub const INCLUDE_INTERNAL_LABELS: &str = "includeInternalLabels";

/// Raw request parameters in arrival order. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams(Vec<(String, String)>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// First value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl From<Vec<(String, String)>> for RawParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug)]
pub enum QueryError {
    InvalidPanelId(String),
    PanelWithoutDashboard,
    Matcher(MatcherError),
    UnknownState(String),
    UnknownHealth(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPanelId(msg) => write!(f, "invalid panel_id: {msg}"),
            Self::PanelWithoutDashboard => write!(f, "panel_id must be set with dashboard_uid"),
            Self::Matcher(e) => write!(f, "{e}"),
            Self::UnknownState(s) => write!(f, "unknown state '{s}'"),
            Self::UnknownHealth(s) => write!(f, "unknown health '{s}'"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<MatcherError> for QueryError {
    fn from(e: MatcherError) -> Self {
        Self::Matcher(e)
    }
}

/// Validated filter and pagination options of a rule-status request.
/// Limits use `-1` for "unbounded".
#[derive(Debug, Clone)]
pub struct RuleStatusQuery {
    pub dashboard_uid: String,
    pub panel_id: i64,
    pub limit_rules: i64,
    pub limit_alerts: i64,
    pub matchers: Vec<LabelMatcher>,
    pub states: BTreeSet<InstanceState>,
    pub health: BTreeSet<Health>,
    pub rule_names: HashSet<String>,
    pub rule_groups: Vec<String>,
    pub rule_uids: Vec<String>,
    pub datasource_uids: Vec<String>,
    pub rule_type: RuleTypeFilter,
    pub folder_uid: String,
    pub search_folder: String,
    pub search_rule_name: String,
    pub search_rule_group: String,
    pub receiver_name: String,
    pub group_limit: i64,
    pub rule_limit: i64,
    pub group_next_token: String,
    pub include_internal_labels: bool,
}

impl RuleStatusQuery {
    pub fn parse(params: &RawParams) -> Result<Self, QueryError> {
        let dashboard_uid = params.get("dashboard_uid").to_string();
        let panel_id = parse_panel_id(params)?;
        if dashboard_uid.is_empty() && panel_id != 0 {
            return Err(QueryError::PanelWithoutDashboard);
        }

        Ok(Self {
            dashboard_uid,
            panel_id,
            limit_rules: int_or(params, "limit_rules", -1),
            limit_alerts: int_or(params, "limit_alerts", -1),
            matchers: parse_matchers(params)?,
            states: parse_states(params)?,
            health: parse_health(params)?,
            rule_names: params.all("rule_name").into_iter().collect(),
            rule_groups: params.all("rule_group"),
            rule_uids: params.all("rule_uid"),
            datasource_uids: params.all("datasource_uid"),
            rule_type: RuleTypeFilter::parse(params.get("rule_type")),
            folder_uid: params.get("folder_uid").to_string(),
            search_folder: params.get("search.folder").to_string(),
            search_rule_name: params.get("search.rule_name").to_string(),
            search_rule_group: params.get("search.rule_group").to_string(),
            receiver_name: params.get("receiver_name").to_string(),
            group_limit: int_or(params, "group_limit", -1),
            rule_limit: int_or(params, "rule_limit", -1),
            group_next_token: params.get("group_next_token").to_string(),
            include_internal_labels: include_internal_labels(params),
        })
    }
}

pub fn include_internal_labels(params: &RawParams) -> bool {
    bool_or(params, INCLUDE_INTERNAL_LABELS, false)
}

fn parse_panel_id(params: &RawParams) -> Result<i64, QueryError> {
    let raw = params.get("panel_id").trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<i64>()
        .map_err(|e| QueryError::InvalidPanelId(format!("{raw:?}: {e}")))
}

fn parse_matchers(params: &RawParams) -> Result<Vec<LabelMatcher>, QueryError> {
    params
        .all("matcher")
        .iter()
        .map(|raw| LabelMatcher::from_json(raw).map_err(QueryError::from))
        .collect()
}

pub fn parse_states(params: &RawParams) -> Result<BTreeSet<InstanceState>, QueryError> {
    let mut states = BTreeSet::new();
    for raw in params.all("state") {
        let s = raw.to_lowercase();
        let state = match s.as_str() {
            "normal" | "inactive" => InstanceState::Normal,
            "alerting" | "firing" => InstanceState::Alerting,
            "pending" => InstanceState::Pending,
            "nodata" => InstanceState::NoData,
            "error" => InstanceState::Error,
            "recovering" => InstanceState::Recovering,
            _ => return Err(QueryError::UnknownState(s)),
        };
        states.insert(state);
    }
    Ok(states)
}

pub fn parse_health(params: &RawParams) -> Result<BTreeSet<Health>, QueryError> {
    let mut health = BTreeSet::new();
    for raw in params.all("health") {
        let s = raw.to_lowercase();
        match Health::parse(&s) {
            Some(h) => {
                health.insert(h);
            }
            None => return Err(QueryError::UnknownHealth(s)),
        }
    }
    Ok(health)
}

fn int_or(params: &RawParams, key: &str, default: i64) -> i64 {
    let raw = params.get(key);
    if raw.is_empty() {
        return default;
    }
    raw.parse().unwrap_or(default)
}

fn bool_or(params: &RawParams, key: &str, default: bool) -> bool {
    match params.get(key) {
        "" => default,
        "1" | "t" | "T" | "true" | "TRUE" | "True" => true,
        _ => false,
    }
}
