use regex::Regex;
use serde::Deserialize;
use std::fmt;

use crate::model::Labels;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Equal,
    NotEqual,
    Regex,
    NotRegex,
}

#[derive(Debug)]
pub enum MatcherError {
    Json(serde_json::Error),
    BlankName,
    Regex(regex::Error),
}

impl fmt::Display for MatcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "bad matcher: {e}"),
            Self::BlankName => write!(f, "bad matcher: the name cannot be blank"),
            Self::Regex(e) => write!(f, "bad matcher: {e}"),
        }
    }
}

impl std::error::Error for MatcherError {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMatcher {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    is_regex: bool,
    #[serde(default = "default_is_equal")]
    is_equal: bool,
}

fn default_is_equal() -> bool {
    true
}

/// A label matcher in the alertmanager JSON form
/// `{"name":"team","value":"infra","isRegex":false,"isEqual":true}`.
/// Regex values are fully anchored.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    pub name: String,
    pub value: String,
    pub kind: MatchKind,
    re: Option<Regex>,
}

impl LabelMatcher {
    pub fn new(kind: MatchKind, name: &str, value: &str) -> Result<Self, MatcherError> {
        if name.is_empty() {
            return Err(MatcherError::BlankName);
        }
        let re = match kind {
            MatchKind::Regex | MatchKind::NotRegex => {
                Some(Regex::new(&format!("^(?:{value})$")).map_err(MatcherError::Regex)?)
            }
            MatchKind::Equal | MatchKind::NotEqual => None,
        };
        Ok(Self {
            name: name.to_string(),
            value: value.to_string(),
            kind,
            re,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, MatcherError> {
        let wire: WireMatcher = serde_json::from_str(raw).map_err(MatcherError::Json)?;
        let kind = match (wire.is_regex, wire.is_equal) {
            (false, true) => MatchKind::Equal,
            (false, false) => MatchKind::NotEqual,
            (true, true) => MatchKind::Regex,
            (true, false) => MatchKind::NotRegex,
        };
        Self::new(kind, &wire.name, &wire.value)
    }

    pub fn matches(&self, value: &str) -> bool {
        match (self.kind, &self.re) {
            (MatchKind::Equal, _) => value == self.value,
            (MatchKind::NotEqual, _) => value != self.value,
            (MatchKind::Regex, Some(re)) => re.is_match(value),
            (MatchKind::NotRegex, Some(re)) => !re.is_match(value),
            (MatchKind::Regex | MatchKind::NotRegex, None) => false,
        }
    }
}

/// A missing label is matched as the empty string.
pub fn matches_all(matchers: &[LabelMatcher], labels: &Labels) -> bool {
    matchers.iter().all(|m| {
        let value = labels.get(&m.name).map(String::as_str).unwrap_or("");
        m.matches(value)
    })
}
