//! # Catalog (Permission Manager)
//!
//! Pure in-memory bookkeeping of which files are locally announced or
//! offered, and which files remote peers have announced or offered to us.
//! Holds no filesystem or bus state; every method is synchronous and
//! guarded by a single lock, never held across an `.await`.

use std::collections::HashMap;

use crate::descriptor::{FileDescriptor, FileId};

#[derive(Debug, Default)]
struct CatalogState {
    announced_local: HashMap<FileId, FileDescriptor>,
    offered_local: HashMap<FileId, FileDescriptor>,
    announced_remote: HashMap<String, HashMap<FileId, FileDescriptor>>,
    offered_remote: HashMap<String, HashMap<FileId, FileDescriptor>>,
}

/// In-memory indexes of announced/offered files, local and remote.
pub struct Catalog {
    state: parking_lot::RwLock<CatalogState>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self {
            state: parking_lot::RwLock::new(CatalogState::default()),
        }
    }

    /// Records descriptors as locally announced. A descriptor whose
    /// `file_id` already exists (announced under a different path)
    /// silently replaces the prior entry — this mirrors the file-id-keyed
    /// replacement semantics of the original protocol.
    pub fn add_announced_local(&self, descriptors: Vec<FileDescriptor>) {
        let mut state = self.state.write();
        for d in descriptors {
            state.announced_local.insert(d.file_id, d);
        }
    }

    /// Removes every local descriptor whose path matches one in `paths`.
    /// Paths matching nothing are returned as `failed_paths`.
    pub fn remove_announced_local(&self, paths: &[std::path::PathBuf]) -> Vec<std::path::PathBuf> {
        let mut state = self.state.write();
        let mut failed = Vec::new();
        for path in paths {
            let matched = state
                .announced_local
                .iter()
                .find(|(_, d)| &d.full_path() == path)
                .map(|(id, _)| *id);
            match matched {
                Some(id) => {
                    state.announced_local.remove(&id);
                }
                None => failed.push(path.clone()),
            }
        }
        failed
    }

    /// Every currently announced local descriptor.
    pub fn announced_local(&self) -> Vec<FileDescriptor> {
        self.state.read().announced_local.values().cloned().collect()
    }

    /// Every currently offered local descriptor (unsolicited offers and
    /// offer-request responses).
    pub fn offered_local(&self) -> Vec<FileDescriptor> {
        self.state.read().offered_local.values().cloned().collect()
    }

    /// Replaces `peer`'s entire remote-announced set with `list`.
    pub fn update_announced_remote(&self, list: Vec<FileDescriptor>, peer: &str) {
        let map: HashMap<FileId, FileDescriptor> =
            list.into_iter().map(|d| (d.file_id, d)).collect();
        self.state
            .write()
            .announced_remote
            .insert(peer.to_string(), map);
    }

    /// Every descriptor `peer` has announced to us.
    pub fn announced_remote(&self, peer: &str) -> Vec<FileDescriptor> {
        self.state
            .read()
            .announced_remote
            .get(peer)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Records a descriptor as locally offered (in response to an offer
    /// request, or as an unsolicited offer we made).
    pub fn add_offered_local(&self, descriptor: FileDescriptor) {
        self.state
            .write()
            .offered_local
            .insert(descriptor.file_id, descriptor);
    }

    /// Records a descriptor a peer offered to us, or that we directly
    /// requested from them.
    pub fn add_offered_remote(&self, descriptor: FileDescriptor, peer: &str) {
        self.state
            .write()
            .offered_remote
            .entry(peer.to_string())
            .or_default()
            .insert(descriptor.file_id, descriptor);
    }

    /// Looks up a descriptor by `file_id` across the local maps (announced
    /// takes precedence over offered, since a file may legitimately be
    /// both).
    pub fn find_local(&self, file_id: FileId) -> Option<FileDescriptor> {
        let state = self.state.read();
        state
            .announced_local
            .get(&file_id)
            .or_else(|| state.offered_local.get(&file_id))
            .cloned()
    }

    /// Looks up a descriptor `peer` has made available to us, by
    /// `file_id`, across both the announced and offered remote maps.
    pub fn find_remote(&self, peer: &str, file_id: FileId) -> Option<FileDescriptor> {
        let state = self.state.read();
        state
            .announced_remote
            .get(peer)
            .and_then(|m| m.get(&file_id))
            .or_else(|| state.offered_remote.get(peer).and_then(|m| m.get(&file_id)))
            .cloned()
    }

    /// Rewrites the `owner` field of every local descriptor to
    /// `local_bus_id`, or clears it if `None` (offline mode). Called on
    /// session reset.
    pub fn reset(&self, local_bus_id: Option<&str>) {
        let mut state = self.state.write();
        let owner = local_bus_id.unwrap_or("").to_string();
        for d in state.announced_local.values_mut() {
            d.owner = owner.clone();
        }
        for d in state.offered_local.values_mut() {
            d.owner = owner.clone();
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(id: u8, path: &str, owner: &str) -> FileDescriptor {
        FileDescriptor {
            owner: owner.to_string(),
            shared_path: "".into(),
            relative_path: "".into(),
            filename: path.into(),
            file_id: [id; 20],
            size: 10,
        }
    }

    #[test]
    fn duplicate_announcement_replaces_by_file_id() {
        let cat = Catalog::new();
        cat.add_announced_local(vec![desc(1, "old.bin", "me")]);
        cat.add_announced_local(vec![desc(1, "new.bin", "me")]);
        let all = cat.announced_local();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].filename, "new.bin");
    }

    #[test]
    fn remove_by_path_reports_unmatched_as_failed() {
        let cat = Catalog::new();
        cat.add_announced_local(vec![desc(1, "a.bin", "me")]);
        let failed = cat.remove_announced_local(&[
            std::path::PathBuf::from("a.bin"),
            std::path::PathBuf::from("missing.bin"),
        ]);
        assert_eq!(failed, vec![std::path::PathBuf::from("missing.bin")]);
        assert!(cat.announced_local().is_empty());
    }

    #[test]
    fn update_announced_remote_is_a_full_replacement() {
        let cat = Catalog::new();
        cat.update_announced_remote(vec![desc(1, "a.bin", "peerA"), desc(2, "b.bin", "peerA")], "peerA");
        cat.update_announced_remote(vec![desc(3, "c.bin", "peerA")], "peerA");
        let list = cat.announced_remote("peerA");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].file_id, [3; 20]);
    }

    #[test]
    fn reset_rewrites_local_owners() {
        let cat = Catalog::new();
        cat.add_announced_local(vec![desc(1, "a.bin", "old-name")]);
        cat.reset(Some("new-name"));
        assert_eq!(cat.announced_local()[0].owner, "new-name");
        cat.reset(None);
        assert_eq!(cat.announced_local()[0].owner, "");
    }

    #[test]
    fn find_local_checks_offered_as_fallback() {
        let cat = Catalog::new();
        cat.add_offered_local(desc(5, "offer.bin", "me"));
        assert!(cat.find_local([5; 20]).is_some());
        assert!(cat.find_local([9; 20]).is_none());
    }
}
