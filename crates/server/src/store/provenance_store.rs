use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use vigil_engine::model::Provenance;
use vigil_engine::source::{ProvenanceSource, SourceError};

/// Provenance per (org, resource type), keyed by resource id.
#[derive(Clone, Default)]
pub struct ProvenanceStore {
    records: Arc<DashMap<(i64, String), HashMap<String, Provenance>>>,
}

impl ProvenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, org_id: i64, resource_type: &str, resource_id: &str, provenance: Provenance) {
        self.records
            .entry((org_id, resource_type.to_string()))
            .or_default()
            .insert(resource_id.to_string(), provenance);
    }
}

#[async_trait]
impl ProvenanceSource for ProvenanceStore {
    async fn provenances(
        &self,
        org_id: i64,
        resource_type: &str,
    ) -> Result<HashMap<String, Provenance>, SourceError> {
        Ok(self
            .records
            .get(&(org_id, resource_type.to_string()))
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}
