mod fixtures;
mod folder_store;
mod instance_store;
mod provenance_store;
mod rule_store;
mod status_store;

use std::sync::Arc;

use vigil_engine::annotate::{InstanceStateAnnotator, ReaderStatusAnnotator};
use vigil_engine::pagination::{CursorPager, GroupPager, ScanPager};
use vigil_engine::{Collaborators, RuleStatusService};

use crate::config::PaginationMode;

pub use fixtures::Fixtures;
pub use folder_store::FolderStore;
pub use instance_store::InstanceStore;
pub use provenance_store::ProvenanceStore;
pub use rule_store::RuleStore;
pub use status_store::StatusStore;

/// The in-memory collaborators behind one server. The rule store shares the
/// folder store so it can page in folder path order.
#[derive(Clone)]
pub struct Stores {
    pub rules: RuleStore,
    pub folders: FolderStore,
    pub instances: InstanceStore,
    pub statuses: StatusStore,
    pub provenances: ProvenanceStore,
}

impl Default for Stores {
    fn default() -> Self {
        Self::new()
    }
}

impl Stores {
    pub fn new() -> Self {
        let folders = FolderStore::new();
        Self {
            rules: RuleStore::new(folders.clone()),
            folders,
            instances: InstanceStore::default(),
            statuses: StatusStore::default(),
            provenances: ProvenanceStore::default(),
        }
    }

    pub fn service(&self, mode: PaginationMode) -> RuleStatusService {
        let pager: Arc<dyn GroupPager> = match mode {
            PaginationMode::Cursor => Arc::new(CursorPager::new(self.rules.clone())),
            PaginationMode::Scan => Arc::new(ScanPager::new(self.rules.clone())),
        };
        let folders = Arc::new(self.folders.clone());
        RuleStatusService::new(Collaborators {
            namespaces: folders.clone(),
            access: folders,
            provenances: Arc::new(self.provenances.clone()),
            pager,
            status: Arc::new(ReaderStatusAnnotator::new(self.statuses.clone())),
            states: Arc::new(InstanceStateAnnotator::new(self.instances.clone())),
            instances: Arc::new(self.instances.clone()),
        })
    }
}
