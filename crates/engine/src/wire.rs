//! Response documents in the Prometheus rule/alert discovery format, with
//! the extra fields the rule-status view carries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Health, InstanceState, Labels, NotificationSettings, Provenance};
use crate::precedence::{DisplayState, Totals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorType {
    #[serde(rename = "bad_data")]
    BadData,
    #[serde(rename = "server_error")]
    Server,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectedAlert {
    pub labels: Labels,
    pub annotations: Labels,
    pub state: String,
    #[serde(rename = "activeAt")]
    pub active_at: DateTime<Utc>,
    pub value: String,
    #[serde(skip)]
    pub instance_state: InstanceState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedRule {
    pub state: DisplayState,
    pub name: String,
    pub query: String,
    #[serde(rename = "queriedDatasourceUIDs", skip_serializing_if = "Vec::is_empty")]
    pub queried_datasource_uids: Vec<String>,
    pub duration: f64,
    pub keep_firing_for: f64,
    pub annotations: Labels,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_at: Option<DateTime<Utc>>,
    pub alerts: Vec<ProjectedAlert>,
    #[serde(skip_serializing_if = "Totals::is_empty")]
    pub totals: Totals,
    #[serde(skip_serializing_if = "Totals::is_empty")]
    pub totals_filtered: Totals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_settings: Option<NotificationSettings>,
    pub uid: String,
    pub folder_uid: String,
    pub labels: Labels,
    pub health: Health,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_error: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    pub last_evaluation: DateTime<Utc>,
    pub evaluation_time: f64,
    pub is_paused: bool,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedRuleGroup {
    pub name: String,
    /// Folder display path; the discovery format calls it `file`.
    pub file: String,
    pub folder_uid: String,
    pub rules: Vec<ProjectedRule>,
    #[serde(skip_serializing_if = "Totals::is_empty")]
    pub totals: Totals,
    pub interval: f64,
    pub last_evaluation: DateTime<Utc>,
    pub evaluation_time: f64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct RuleDiscovery {
    pub groups: Vec<ProjectedRuleGroup>,
    #[serde(rename = "groupNextToken", skip_serializing_if = "String::is_empty")]
    pub next_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<Totals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleResponse {
    pub status: ResponseStatus,
    pub data: RuleDiscovery,
    #[serde(rename = "errorType", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl RuleResponse {
    pub fn success(data: RuleDiscovery) -> Self {
        Self {
            status: ResponseStatus::Success,
            data,
            error_type: None,
            error: String::new(),
        }
    }

    pub fn failure(error_type: ErrorType, error: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: RuleDiscovery::default(),
            error_type: Some(error_type),
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AlertDiscovery {
    pub alerts: Vec<ProjectedAlert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertResponse {
    pub status: ResponseStatus,
    pub data: AlertDiscovery,
    #[serde(rename = "errorType", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl AlertResponse {
    pub fn success(alerts: Vec<ProjectedAlert>) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: AlertDiscovery { alerts },
            error_type: None,
            error: String::new(),
        }
    }

    pub fn failure(error_type: ErrorType, error: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: AlertDiscovery::default(),
            error_type: Some(error_type),
            error: error.into(),
        }
    }
}
