use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use vigil_engine::model::{Caller, Folder};
use vigil_engine::source::{FolderAccess, NamespaceSource, SourceError};

#[derive(Debug, Clone)]
struct FolderEntry {
    folder: Folder,
    /// Logins without rule access in this folder.
    denied: HashSet<String>,
}

/// Folders per org, with per-login rule access.
#[derive(Clone, Default)]
pub struct FolderStore {
    folders: Arc<DashMap<(i64, String), FolderEntry>>,
}

impl FolderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, org_id: i64, folder: Folder) {
        self.folders.insert(
            (org_id, folder.uid.clone()),
            FolderEntry {
                folder,
                denied: HashSet::new(),
            },
        );
    }

    pub fn deny(&self, org_id: i64, folder_uid: &str, login: &str) -> bool {
        match self.folders.get_mut(&(org_id, folder_uid.to_string())) {
            Some(mut entry) => {
                entry.denied.insert(login.to_string());
                true
            }
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        self.folders.len()
    }

    pub fn full_path(&self, org_id: i64, folder_uid: &str) -> Option<String> {
        self.folders
            .get(&(org_id, folder_uid.to_string()))
            .map(|e| e.folder.full_path.clone())
    }
}

#[async_trait]
impl NamespaceSource for FolderStore {
    async fn visible_namespaces(
        &self,
        org_id: i64,
        _caller: &Caller,
    ) -> Result<HashMap<String, Folder>, SourceError> {
        Ok(self
            .folders
            .iter()
            .filter(|e| e.key().0 == org_id)
            .map(|e| (e.key().1.clone(), e.value().folder.clone()))
            .collect())
    }
}

#[async_trait]
impl FolderAccess for FolderStore {
    async fn has_access_in_folder(&self, caller: &Caller, folder: &Folder) -> Result<bool, SourceError> {
        Ok(self
            .folders
            .get(&(caller.org_id, folder.uid.clone()))
            .is_some_and(|e| !e.denied.contains(&caller.login)))
    }
}
