use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub type Labels = BTreeMap<String, String>;

/// Datasource UIDs reserved for server-side expressions (math, reduce,
/// threshold, classic conditions). They never carry a user-facing query.
pub const EXPR_DATASOURCE_UID: &str = "__expr__";
pub const LEGACY_EXPR_DATASOURCE_UID: &str = "-100";

pub const ALERT_RULE_RESOURCE_TYPE: &str = "alertRule";

pub fn is_expression_datasource(uid: &str) -> bool {
    uid == EXPR_DATASOURCE_UID || uid == LEGACY_EXPR_DATASOURCE_UID
}

/// Labels like `__alert_rule_uid__` are attached by the evaluator for
/// bookkeeping and hidden unless explicitly requested.
pub fn is_internal_label(name: &str) -> bool {
    name.len() >= 4 && name.starts_with("__") && name.ends_with("__")
}

pub fn without_internal_labels(labels: &Labels) -> Labels {
    labels
        .iter()
        .filter(|(k, _)| !is_internal_label(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub fn labels_for_output(labels: &Labels, include_internal: bool) -> Labels {
    if include_internal {
        labels.clone()
    } else {
        without_internal_labels(labels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertRuleKey {
    pub org_id: i64,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleGroupKey {
    pub org_id: i64,
    pub namespace_uid: String,
    pub rule_group: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExecErrState {
    #[default]
    Error,
    Alerting,
    #[serde(rename = "OK")]
    Ok,
    KeepLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NoDataState {
    #[default]
    NoData,
    Alerting,
    #[serde(rename = "OK")]
    Ok,
    KeepLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Alerting,
    Recording,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alerting => "alerting",
            Self::Recording => "recording",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleTypeFilter {
    #[default]
    All,
    Alerting,
    Recording,
}

impl RuleTypeFilter {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "alerting" => Self::Alerting,
            "recording" => Self::Recording,
            _ => Self::All,
        }
    }

    pub fn accepts(&self, rule_type: RuleType) -> bool {
        match self {
            Self::All => true,
            Self::Alerting => rule_type == RuleType::Alerting,
            Self::Recording => rule_type == RuleType::Recording,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Provenance {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "api")]
    Api,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "converted_prometheus")]
    ConvertedPrometheus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct RelativeTimeRange {
    pub from: i64,
    pub to: i64,
}

/// Why a step of the expression pipeline yielded no query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTextError {
    /// The step is a condition/math expression or otherwise has no `expr`.
    NoQuery,
    Undecodable(String),
}

impl fmt::Display for QueryTextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoQuery => write!(f, "no query found"),
            Self::Undecodable(msg) => write!(f, "failed to decode query: {msg}"),
        }
    }
}

impl std::error::Error for QueryTextError {}

/// One step of a rule's expression pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    pub ref_id: String,
    #[serde(default)]
    pub query_type: String,
    #[serde(default)]
    pub relative_time_range: RelativeTimeRange,
    pub datasource_uid: String,
    #[serde(default)]
    pub model: serde_json::Value,
}

impl AlertQuery {
    pub fn query_text(&self) -> Result<String, QueryTextError> {
        let props = match &self.model {
            serde_json::Value::Object(props) => props,
            other => {
                return Err(QueryTextError::Undecodable(format!(
                    "model is not an object: {other}"
                )))
            }
        };
        match props.get("expr") {
            None => Err(QueryTextError::NoQuery),
            Some(serde_json::Value::String(expr)) => Ok(expr.clone()),
            Some(other) => Err(QueryTextError::Undecodable(format!(
                "failed to cast query to string: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub receiver: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_wait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_interval: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mute_time_intervals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub metric: String,
    pub from: String,
}

/// A persisted rule definition, read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub org_id: i64,
    pub uid: String,
    pub namespace_uid: String,
    pub rule_group: String,
    #[serde(default)]
    pub rule_group_index: i64,
    pub title: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub data: Vec<AlertQuery>,
    #[serde(default = "default_interval")]
    pub interval_seconds: i64,
    #[serde(default, rename = "for", with = "duration_secs")]
    pub for_duration: Duration,
    #[serde(default, with = "duration_secs")]
    pub keep_firing_for: Duration,
    #[serde(default)]
    pub no_data_state: NoDataState,
    #[serde(default)]
    pub exec_err_state: ExecErrState,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    #[serde(default)]
    pub notification_settings: Vec<NotificationSettings>,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub record: Option<Record>,
    #[serde(default)]
    pub dashboard_uid: Option<String>,
    #[serde(default)]
    pub panel_id: Option<i64>,
}

fn default_interval() -> i64 {
    60
}

impl AlertRule {
    pub fn key(&self) -> AlertRuleKey {
        AlertRuleKey {
            org_id: self.org_id,
            uid: self.uid.clone(),
        }
    }

    pub fn group_key(&self) -> RuleGroupKey {
        RuleGroupKey {
            org_id: self.org_id,
            namespace_uid: self.namespace_uid.clone(),
            rule_group: self.rule_group.clone(),
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.uid
    }

    pub fn rule_type(&self) -> RuleType {
        if self.record.is_some() {
            RuleType::Recording
        } else {
            RuleType::Alerting
        }
    }

    pub fn datasource_uids(&self) -> Vec<String> {
        self.data
            .iter()
            .filter(|q| !is_expression_datasource(&q.datasource_uid))
            .map(|q| q.datasource_uid.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstanceState {
    Normal,
    Alerting,
    Pending,
    NoData,
    Error,
    Recovering,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Alerting => "Alerting",
            Self::Pending => "Pending",
            Self::NoData => "NoData",
            Self::Error => "Error",
            Self::Recovering => "Recovering",
        }
    }

    /// Key under which the state is tallied in totals maps.
    pub fn totals_key(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Alerting => "alerting",
            Self::Pending => "pending",
            Self::NoData => "nodata",
            Self::Error => "error",
            Self::Recovering => "recovering",
        }
    }

    pub fn carries_value(&self) -> bool {
        matches!(self, Self::Alerting | Self::Pending | Self::Recovering)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one live alert instance for a single label set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertInstance {
    pub org_id: i64,
    pub rule_uid: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    pub state: InstanceState,
    #[serde(default)]
    pub state_reason: String,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub last_evaluation_values: BTreeMap<String, f64>,
    #[serde(default)]
    pub last_evaluation_string: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Ok,
    Error,
    #[serde(rename = "nodata")]
    NoData,
    Unknown,
}

impl Health {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ok" => Some(Self::Ok),
            "error" => Some(Self::Error),
            "nodata" => Some(Self::NoData),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::NoData => "nodata",
            Self::Unknown => "unknown",
        }
    }
}

/// Scheduler-observed health of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStatus {
    pub health: Health,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default = "zero_time")]
    pub evaluation_timestamp: DateTime<Utc>,
    #[serde(default, with = "duration_secs")]
    pub evaluation_duration: Duration,
}

impl RuleStatus {
    /// Status reported for a rule the scheduler has never evaluated. Health is
    /// `ok`, not `nodata`: an unscheduled rule has not failed to produce data.
    pub fn unscheduled() -> Self {
        Self {
            health: Health::Ok,
            last_error: None,
            evaluation_timestamp: zero_time(),
            evaluation_duration: Duration::ZERO,
        }
    }
}

/// `0001-01-01T00:00:00Z`, the timestamp clients read as "never".
pub fn zero_time() -> DateTime<Utc> {
    DateTime::from_timestamp(-62_135_596_800, 0).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub uid: String,
    pub title: String,
    pub full_path: String,
}

/// The identity a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub org_id: i64,
    pub login: String,
}

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
