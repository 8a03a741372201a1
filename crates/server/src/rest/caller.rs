use axum::http::HeaderMap;
use std::fmt;

use vigil_engine::model::Caller;

pub const ORG_ID_HEADER: &str = "x-vigil-org-id";
pub const USER_HEADER: &str = "x-vigil-user";

#[derive(Debug, PartialEq, Eq)]
pub enum CallerError {
    InvalidOrgId(String),
}

impl fmt::Display for CallerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOrgId(raw) => write!(f, "invalid X-Vigil-Org-Id header '{raw}'"),
        }
    }
}

impl std::error::Error for CallerError {}

/// Identity the request is served for. Authentication happens upstream;
/// the org falls back to `default_org_id` when the header is absent.
pub fn caller_from_headers(headers: &HeaderMap, default_org_id: i64) -> Result<Caller, CallerError> {
    let org_id = match headers.get(ORG_ID_HEADER) {
        None => default_org_id,
        Some(v) => {
            let raw = v.to_str().unwrap_or_default().trim();
            match raw.parse::<i64>() {
                Ok(id) if id > 0 => id,
                _ => return Err(CallerError::InvalidOrgId(raw.to_string())),
            }
        }
    };
    let login = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Ok(Caller { org_id, login })
}
