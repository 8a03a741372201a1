use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use std::cmp::Ordering;

/// Opaque resume marker of the client-side scan: URL-safe base64 of
/// `"<folder path>/<group name>"`. Ordering compares the decoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken {
    encoded: String,
    decoded: Vec<u8>,
}

impl ContinuationToken {
    pub fn for_group(folder: &str, group: &str) -> Self {
        let decoded = format!("{folder}/{group}").into_bytes();
        Self {
            encoded: URL_SAFE.encode(&decoded),
            decoded,
        }
    }

    /// `None` for an empty or undecodable token; callers treat that as
    /// "start from the beginning".
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        let decoded = URL_SAFE.decode(raw).ok()?;
        Some(Self {
            encoded: raw.to_string(),
            decoded,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn decoded(&self) -> &[u8] {
        &self.decoded
    }

    pub fn into_string(self) -> String {
        self.encoded
    }
}

impl PartialOrd for ContinuationToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ContinuationToken {
    fn cmp(&self, other: &Self) -> Ordering {
        self.decoded.cmp(&other.decoded)
    }
}
