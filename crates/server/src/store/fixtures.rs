use serde::Deserialize;
use std::path::Path;

use vigil_engine::model::{
    AlertInstance, AlertRule, AlertRuleKey, Folder, Provenance, RuleStatus, ALERT_RULE_RESOURCE_TYPE,
};

use super::Stores;
use crate::config::LoadError;

/// Seed document for the in-memory stores.
#[derive(Debug, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub folders: Vec<FolderFixture>,
    #[serde(default)]
    pub rules: Vec<AlertRule>,
    #[serde(default)]
    pub statuses: Vec<StatusFixture>,
    #[serde(default)]
    pub instances: Vec<AlertInstance>,
    #[serde(default)]
    pub provenances: Vec<ProvenanceFixture>,
}

#[derive(Debug, Deserialize)]
pub struct FolderFixture {
    #[serde(default = "default_org_id")]
    pub org_id: i64,
    pub uid: String,
    pub title: String,
    /// Defaults to the title.
    #[serde(default)]
    pub full_path: Option<String>,
    #[serde(default)]
    pub denied: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusFixture {
    #[serde(default = "default_org_id")]
    pub org_id: i64,
    pub rule_uid: String,
    #[serde(flatten)]
    pub status: RuleStatus,
}

#[derive(Debug, Deserialize)]
pub struct ProvenanceFixture {
    #[serde(default = "default_org_id")]
    pub org_id: i64,
    pub rule_uid: String,
    pub provenance: Provenance,
}

fn default_org_id() -> i64 {
    1
}

impl Fixtures {
    pub fn load_from_file(path: &Path) -> Result<Self, LoadError> {
        let contents = std::fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    pub fn load_from_str(yaml: &str) -> Result<Self, LoadError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn apply(self, stores: &Stores) {
        tracing::info!(
            folders = self.folders.len(),
            rules = self.rules.len(),
            statuses = self.statuses.len(),
            instances = self.instances.len(),
            "seeding stores from fixtures"
        );

        for f in self.folders {
            let folder = Folder {
                full_path: f.full_path.unwrap_or_else(|| f.title.clone()),
                uid: f.uid,
                title: f.title,
            };
            let uid = folder.uid.clone();
            stores.folders.insert(f.org_id, folder);
            for login in &f.denied {
                stores.folders.deny(f.org_id, &uid, login);
            }
        }
        for rule in self.rules {
            stores.rules.insert(rule);
        }
        for s in self.statuses {
            let key = AlertRuleKey {
                org_id: s.org_id,
                uid: s.rule_uid,
            };
            stores.statuses.set(key, s.status);
        }
        for instance in self.instances {
            stores.instances.insert(instance);
        }
        for p in self.provenances {
            stores
                .provenances
                .set(p.org_id, ALERT_RULE_RESOURCE_TYPE, &p.rule_uid, p.provenance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vigil_engine::model::Health;
    use vigil_engine::source::{InstanceReader, StatusReader};

    const SAMPLE: &str = r#"
folders:
  - uid: infra
    title: Infra
    denied: [intern]
rules:
  - org_id: 1
    uid: r1
    namespace_uid: infra
    rule_group: cpu
    title: High CPU
statuses:
  - rule_uid: r1
    health: error
    last_error: query timed out
    evaluation_duration: 0.25
instances:
  - org_id: 1
    rule_uid: r1
    state: Alerting
    starts_at: 2024-05-01T10:00:00Z
    labels:
      host: db-1
provenances:
  - rule_uid: r1
    provenance: file
"#;

    #[test]
    fn seeds_every_store() {
        let stores = Stores::new();
        Fixtures::load_from_str(SAMPLE).unwrap().apply(&stores);

        assert_eq!(stores.rules.count(), 1);
        assert_eq!(stores.folders.count(), 1);
        let key = AlertRuleKey {
            org_id: 1,
            uid: "r1".into(),
        };
        let status = stores.statuses.status(&key).unwrap();
        assert_eq!(status.health, Health::Error);
        assert_eq!(status.evaluation_duration.as_millis(), 250);
        assert_eq!(stores.instances.for_rule(1, "r1").len(), 1);
    }

    #[test]
    fn empty_document() {
        let f = Fixtures::load_from_str("  \n").unwrap();
        assert!(f.rules.is_empty());
    }

    #[test]
    fn from_tempfile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let f = Fixtures::load_from_file(file.path()).unwrap();
        assert_eq!(f.folders[0].denied, vec!["intern"]);
        assert_eq!(f.provenances[0].provenance, Provenance::File);
    }
}
