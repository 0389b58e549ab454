//! # Announcement Manager
//!
//! Broadcasts the local file list, answers inbound `request_announcement`
//! signals, and applies the configured path-visibility policy before a
//! descriptor ever leaves the process. Hashing happens off the caller's
//! thread: [`AnnouncementManager::announce`] returns as soon as the work
//! is queued.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Action;
use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::descriptor::FileDescriptor;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::fs_adapter::FileSystemAdapter;
use crate::receiver::AnnouncementTarget;

/// Fired once a background `announce()` finishes, with the paths that
/// could not be described.
pub type AnnouncementSentObserver = Arc<dyn Fn(Vec<PathBuf>) + Send + Sync>;
/// Fired whenever a remote peer's file list is learned, either via a
/// broadcast announcement or a directed offer response.
pub type AnnouncementReceivedObserver =
    Arc<dyn Fn(Vec<FileDescriptor>, bool, String) + Send + Sync>;

/// Broadcast announcements, announcement requests, and path policy.
pub struct AnnouncementManager {
    local_owner: parking_lot::RwLock<String>,
    catalog: Arc<Catalog>,
    fsa: Arc<FileSystemAdapter>,
    dispatcher: Arc<Dispatcher>,
    config: Arc<CoreConfig>,
    session_attached: AtomicBool,
    announcement_sent: parking_lot::RwLock<Option<AnnouncementSentObserver>>,
    announcement_received: parking_lot::RwLock<Option<AnnouncementReceivedObserver>>,
}

impl AnnouncementManager {
    /// Builds an announcement manager. `local_owner` is the bus identity
    /// stamped onto every descriptor this peer announces.
    pub fn new(
        local_owner: String,
        catalog: Arc<Catalog>,
        fsa: Arc<FileSystemAdapter>,
        dispatcher: Arc<Dispatcher>,
        config: Arc<CoreConfig>,
    ) -> Arc<Self> {
        Arc::new(Self {
            local_owner: parking_lot::RwLock::new(local_owner),
            catalog,
            fsa,
            dispatcher,
            config,
            session_attached: AtomicBool::new(true),
            announcement_sent: parking_lot::RwLock::new(None),
            announcement_received: parking_lot::RwLock::new(None),
        })
    }

    /// Sets the observer fired when a background `announce()` completes.
    pub fn set_announcement_sent_observer(&self, observer: AnnouncementSentObserver) {
        *self.announcement_sent.write() = Some(observer);
    }

    /// Sets the observer fired when a remote peer's file list is learned.
    pub fn set_announcement_received_observer(&self, observer: AnnouncementReceivedObserver) {
        *self.announcement_received.write() = Some(observer);
    }

    /// Marks the session as attached or detached; `request_announcement`
    /// fails with `NoAjConnection` while detached.
    pub fn set_session_attached(&self, attached: bool) {
        self.session_attached.store(attached, Ordering::SeqCst);
    }

    /// Rewrites the owner stamped onto newly announced descriptors (on
    /// session change).
    pub fn set_local_owner(&self, owner: String) {
        *self.local_owner.write() = owner;
    }

    /// Hashes and broadcasts `paths`. Returns immediately; the work runs
    /// on a background task.
    pub fn announce(self: &Arc<Self>, paths: Vec<PathBuf>) {
        let this = self.clone();
        tokio::spawn(async move {
            this.announce_blocking(paths);
        });
    }

    fn announce_blocking(&self, paths: Vec<PathBuf>) {
        let owner = self.local_owner.read().clone();
        let (mut descriptors, failed) = self.fsa.describe(&paths, &owner);
        for d in &mut descriptors {
            if !self.config.show_shared_path {
                d.shared_path.clear();
            }
            if !self.config.show_relative_path {
                d.relative_path.clear();
            }
        }
        self.catalog.add_announced_local(descriptors);
        self.broadcast_current_catalog();

        if let Some(observer) = self.announcement_sent.read().clone() {
            observer(failed);
        }
    }

    /// Stops announcing `paths` and re-broadcasts the remaining local
    /// file list. Returns paths that did not match any announced file.
    pub fn stop_announce(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let failed = self.catalog.remove_announced_local(paths);
        self.broadcast_current_catalog();
        failed
    }

    /// Sends `request_announcement` to `peer`.
    pub fn request_announcement(&self, peer: &str) -> Result<()> {
        if self.announcement_received.read().is_none() {
            return Err(Error::NoAnnouncementListener);
        }
        if !self.session_attached.load(Ordering::SeqCst) {
            return Err(Error::NoSession);
        }
        self.dispatcher.insert_action(Action::RequestAnnouncement {
            peer: peer.to_string(),
        });
        Ok(())
    }

    /// Invokes the announcement-received observer directly; used by the
    /// directed announcement manager to report offer responses through
    /// the same observer slot as broadcast announcements.
    pub fn notify_received(&self, list: Vec<FileDescriptor>, is_offer_response: bool, peer: String) {
        if let Some(observer) = self.announcement_received.read().clone() {
            observer(list, is_offer_response, peer);
        }
    }

    fn broadcast_current_catalog(&self) {
        self.dispatcher.insert_action(Action::Announce {
            peer: String::new(),
            file_list: self.catalog.announced_local(),
            is_offer_response: false,
        });
    }
}

#[async_trait]
impl AnnouncementTarget for AnnouncementManager {
    async fn handle_announced_files(&self, list: Vec<FileDescriptor>, peer: &str) {
        self.catalog.update_announced_remote(list.clone(), peer);
        if let Some(observer) = self.announcement_received.read().clone() {
            observer(list, false, peer.to_string());
        }
    }

    async fn handle_announcement_request(&self, peer: &str) {
        self.dispatcher.insert_action(Action::Announce {
            peer: peer.to_string(),
            file_list: self.catalog.announced_local(),
            is_offer_response: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockBus;
    use crate::transmitter::Transmitter;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn setup() -> (Arc<AnnouncementManager>, Arc<MockBus>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(Catalog::new());
        let fsa = Arc::new(FileSystemAdapter::new());
        let bus = Arc::new(MockBus::new());
        let tx = Arc::new(Transmitter::new(bus.clone()));
        let dispatcher = Dispatcher::new(tx);
        let config = Arc::new(CoreConfig::default());
        let mgr = AnnouncementManager::new("me".into(), catalog, fsa, dispatcher, config);
        (mgr, bus, dir)
    }

    #[tokio::test]
    async fn announce_returns_immediately_and_broadcasts_in_background() {
        let (mgr, bus, dir) = setup();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hi").unwrap();
        mgr.announce(vec![path]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(bus.sent_calls(), vec!["announce"]);
    }

    #[tokio::test]
    async fn request_announcement_requires_a_listener() {
        let (mgr, _bus, _dir) = setup();
        assert!(mgr.request_announcement("peerB").is_err());
        mgr.set_announcement_received_observer(Arc::new(|_, _, _| {}));
        assert!(mgr.request_announcement("peerB").is_ok());
    }

    #[tokio::test]
    async fn request_announcement_fails_without_session() {
        let (mgr, _bus, _dir) = setup();
        mgr.set_announcement_received_observer(Arc::new(|_, _, _| {}));
        mgr.set_session_attached(false);
        assert!(matches!(
            mgr.request_announcement("peerB"),
            Err(Error::NoSession)
        ));
    }

    #[tokio::test]
    async fn visibility_policy_blanks_configured_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hi").unwrap();

        let catalog = Arc::new(Catalog::new());
        let fsa = Arc::new(FileSystemAdapter::new());
        let bus = Arc::new(MockBus::new());
        let tx = Arc::new(Transmitter::new(bus));
        let dispatcher = Dispatcher::new(tx);
        let config = Arc::new(CoreConfig {
            show_relative_path: false,
            show_shared_path: false,
            ..CoreConfig::default()
        });
        let mgr = AnnouncementManager::new("me".into(), catalog.clone(), fsa, dispatcher, config);
        mgr.announce_blocking(vec![path]);

        let list = catalog.announced_local();
        assert_eq!(list.len(), 1);
        assert!(list[0].shared_path.is_empty());
        assert!(list[0].relative_path.is_empty());
    }

    #[tokio::test]
    async fn handle_announced_files_updates_catalog_and_notifies() {
        let (mgr, _bus, _dir) = setup();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        mgr.set_announcement_received_observer(Arc::new(move |_list, is_offer, _peer| {
            assert!(!is_offer);
            seen2.fetch_add(1, Ordering::SeqCst);
        }));
        mgr.handle_announced_files(vec![], "peerB").await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
