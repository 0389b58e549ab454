//! # File Transfer Module (facade)
//!
//! Wires the ten components together into one object with a public API.
//! This is glue, not a core component in its own right: a single
//! construction/lifecycle point an application holds onto.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         FileTransferModule                          │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  Catalog ◄──────┬─────────────┬─────────────┬─────────────┐         │
//! │                 │             │             │             │        │
//! │  Announcement  Directed     Offer         Send          Receive    │
//! │  Manager       Announcement Manager       Manager       Manager    │
//! │                 Manager                                            │
//! │       │             │             │             │            │    │
//! │       └─────────────┴──────┬──────┴─────────────┴────────────┘    │
//! │                       Dispatcher ──► Transmitter ──► SessionBus     │
//! │                                                                     │
//! │  inbound signals/calls from the bus enter through the methods       │
//! │  below and are routed to the manager above that owns them          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::announcement::{AnnouncementManager, AnnouncementReceivedObserver, AnnouncementSentObserver};
use crate::bus::SessionBus;
use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::descriptor::FileDescriptor;
use crate::descriptor::FileId;
use crate::directed_announcement::{DirectedAnnouncementManager, UnannouncedFileRequestDelegate};
use crate::dispatcher::Dispatcher;
use crate::fs_adapter::FileSystemAdapter;
use crate::offer::{OfferManager, OfferReceivedDelegate};
use crate::receive::{FileCompletedObserver, ReceiveManager};
use crate::receiver::Receiver;
use crate::send::{RequestReceivedObserver, SendManager};
use crate::status::StatusCode;
use crate::transmitter::Transmitter;

/// Top-level handle to the protocol engine.
pub struct FileTransferModule {
    catalog: Arc<Catalog>,
    fsa: Arc<FileSystemAdapter>,
    config: Arc<CoreConfig>,
    dispatcher: parking_lot::RwLock<Arc<Dispatcher>>,
    announcement: Arc<AnnouncementManager>,
    directed_announcement: Arc<DirectedAnnouncementManager>,
    offer: Arc<OfferManager>,
    send: Arc<SendManager>,
    receive: Arc<ReceiveManager>,
    receiver: Receiver,
}

impl FileTransferModule {
    /// Builds the engine against an initial bus and local identity.
    pub fn new(bus: Arc<dyn SessionBus>, local_owner: String, config: CoreConfig) -> Arc<Self> {
        let config = Arc::new(config);
        let catalog = Arc::new(Catalog::new());
        let fsa = Arc::new(FileSystemAdapter::new());
        if let Some(cache_path) = &config.hash_cache_file_path {
            let _ = fsa.set_cache_file(Some(cache_path.clone()));
        }

        let transmitter = Arc::new(Transmitter::new(bus));
        let dispatcher = Dispatcher::new(transmitter);

        let announcement = AnnouncementManager::new(
            local_owner.clone(),
            catalog.clone(),
            fsa.clone(),
            dispatcher.clone(),
            config.clone(),
        );
        let directed_announcement = DirectedAnnouncementManager::new(
            local_owner.clone(),
            catalog.clone(),
            fsa.clone(),
            dispatcher.clone(),
            announcement.clone(),
        );
        dispatcher.set_file_id_response_handler(directed_announcement.clone());

        let send = SendManager::new(catalog.clone(), fsa.clone(), dispatcher.clone(), config.clone());
        dispatcher.set_chunk_drained_listener(send.clone());

        let receive = ReceiveManager::new(catalog.clone(), fsa.clone(), dispatcher.clone(), config.clone());

        let offer = OfferManager::new(
            catalog.clone(),
            fsa.clone(),
            dispatcher.clone(),
            config.clone(),
            send.clone(),
            receive.clone(),
        );

        let receiver = Receiver::new(
            announcement.clone(),
            directed_announcement.clone(),
            send.clone(),
            receive.clone(),
        );

        Arc::new(Self {
            catalog,
            fsa,
            config,
            dispatcher: parking_lot::RwLock::new(dispatcher),
            announcement,
            directed_announcement,
            offer,
            send,
            receive,
            receiver,
        })
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Replaces the bus (and hence the transmitter) and rewrites local
    /// descriptor ownership. In-flight transfers are not migrated: the
    /// dispatcher drops anything still queued against the prior session.
    pub fn reset_session(&self, bus: Option<Arc<dyn SessionBus>>, local_owner: Option<String>) {
        self.catalog.reset(local_owner.as_deref());
        self.announcement.set_session_attached(bus.is_some());
        if let Some(owner) = &local_owner {
            self.announcement.set_local_owner(owner.clone());
            self.directed_announcement.set_local_owner(owner.clone());
        }
        if let Some(bus) = bus {
            let transmitter = Arc::new(Transmitter::new(bus));
            self.dispatcher.read().clone().reset(transmitter);
        }
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Fired once per background `announce()` with the paths that failed.
    pub fn on_announcement_sent(&self, observer: AnnouncementSentObserver) {
        self.announcement.set_announcement_sent_observer(observer);
    }

    /// Fired whenever a remote peer's file list is learned.
    pub fn on_announcement_received(&self, observer: AnnouncementReceivedObserver) {
        self.announcement.set_announcement_received_observer(observer);
    }

    /// Asked once per unannounced-path offer-request; default-deny.
    pub fn on_unannounced_file_request(&self, delegate: UnannouncedFileRequestDelegate) {
        self.directed_announcement
            .set_unannounced_file_request_delegate(delegate);
    }

    /// Asked once per inbound unsolicited offer; default-reject.
    pub fn on_offer_received(&self, delegate: OfferReceivedDelegate) {
        self.offer.set_offer_received_delegate(delegate);
    }

    /// Fired once a remote `request_data` is accepted for a file we hold.
    pub fn on_request_received(&self, observer: RequestReceivedObserver) {
        self.send.set_request_received_observer(observer);
    }

    /// Fired once per terminal receive event.
    pub fn on_file_completed(&self, observer: FileCompletedObserver) {
        self.receive.set_file_completed_observer(observer);
    }

    // ------------------------------------------------------------------
    // Catalog enumeration
    // ------------------------------------------------------------------

    /// Every file currently announced locally.
    pub fn local_announced_files(&self) -> Vec<FileDescriptor> {
        self.catalog.announced_local()
    }

    /// Every file currently offered locally (unsolicited offers and
    /// offer-request responses).
    pub fn local_offered_files(&self) -> Vec<FileDescriptor> {
        self.catalog.offered_local()
    }

    // ------------------------------------------------------------------
    // Outbound operations
    // ------------------------------------------------------------------

    /// Announces `paths`; hashing happens in the background.
    pub fn announce(&self, paths: Vec<PathBuf>) {
        self.announcement.announce(paths);
    }

    /// Stops announcing `paths`, returning any that weren't announced.
    pub fn stop_announce(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        self.announcement.stop_announce(paths)
    }

    /// Asks `peer` to announce its files.
    pub fn request_announcement(&self, peer: &str) -> StatusCode {
        self.announcement.request_announcement(peer).err().map(|e| (&e).into()).unwrap_or(StatusCode::Ok)
    }

    /// Asks `peer` to announce a file we haven't seen announced.
    pub async fn request_offer(&self, peer: &str, path: &str) -> StatusCode {
        self.directed_announcement
            .request_offer(peer, path)
            .await
            .err()
            .map(|e| (&e).into())
            .unwrap_or(StatusCode::Ok)
    }

    /// Offers `path` unsolicited to `peer`, blocking up to `timeout_ms`.
    pub async fn offer_file(&self, peer: &str, path: &Path, timeout_ms: u64) -> StatusCode {
        match self.offer.offer_file(peer, path, timeout_ms).await {
            Ok(()) => StatusCode::Ok,
            Err(e) => (&e).into(),
        }
    }

    /// Requests the whole of `file_id` from `peer`.
    pub fn request_file(
        &self,
        peer: &str,
        file_id: FileId,
        save_name: &str,
        save_dir: Option<&Path>,
    ) -> StatusCode {
        self.receive
            .request_file(peer, file_id, save_name, save_dir)
            .err()
            .map(|e| (&e).into())
            .unwrap_or(StatusCode::Ok)
    }

    /// Pauses an in-progress receive.
    pub fn pause_receiving(&self, file_id: FileId) -> StatusCode {
        self.receive.pause(file_id).err().map(|e| (&e).into()).unwrap_or(StatusCode::Ok)
    }

    /// Cancels an in-progress receive and deletes its partial file.
    pub fn cancel_receiving(&self, file_id: FileId) -> StatusCode {
        self.receive.cancel(file_id).err().map(|e| (&e).into()).unwrap_or(StatusCode::Ok)
    }

    /// Cancels a transfer we are sending.
    pub fn cancel_sending(&self, file_id: FileId) -> StatusCode {
        self.send.cancel(file_id).err().map(|e| (&e).into()).unwrap_or(StatusCode::Ok)
    }

    // ------------------------------------------------------------------
    // Inbound entry points (called by a transport adapter)
    // ------------------------------------------------------------------

    /// Inbound `announce` signal.
    pub async fn inbound_announce(&self, list: Vec<FileDescriptor>, is_offer_response: bool, peer: &str) {
        self.receiver.announce(list, is_offer_response, peer).await;
    }

    /// Inbound `request_announcement` signal.
    pub async fn inbound_request_announcement(&self, peer: &str) {
        self.receiver.request_announcement(peer).await;
    }

    /// Inbound `data_chunk` signal.
    pub async fn inbound_data_chunk(&self, file_id: FileId, start_byte: u64, bytes: Vec<u8>, peer: &str) {
        self.receiver.data_chunk(file_id, start_byte, bytes, peer).await;
    }

    /// Inbound `stop_xfer` signal.
    pub async fn inbound_stop_xfer(&self, file_id: FileId, peer: &str) {
        self.receiver.stop_xfer(file_id, peer).await;
    }

    /// Inbound `xfer_cancelled` signal.
    pub async fn inbound_xfer_cancelled(&self, file_id: FileId, peer: &str) {
        self.receiver.xfer_cancelled(file_id, peer).await;
    }

    /// Server side of the `request_data` method call. Routes to the
    /// offer manager first (in case this fulfills a pending offer),
    /// falling back to the send manager for a plain announced/offered
    /// file request.
    pub fn inbound_request_data(
        &self,
        peer: &str,
        file_id: FileId,
        start_byte: u64,
        length: u64,
        max_chunk_size: u32,
    ) -> StatusCode {
        let result = if self.offer.is_offer_pending(file_id) {
            self.offer.handle_request(peer, file_id, start_byte, length, max_chunk_size)
        } else {
            self.send.handle_request(peer, file_id, start_byte, length, max_chunk_size)
        };
        result.err().map(|e| (&e).into()).unwrap_or(StatusCode::Ok)
    }

    /// Server side of the `offer_file` method call.
    pub async fn inbound_offer_file(&self, peer: &str, descriptor: FileDescriptor) -> StatusCode {
        self.offer.handle_offer(peer, descriptor).await
    }

    /// Server side of the `request_offer` method call.
    pub fn inbound_request_offer(&self, path: &str, peer: &str) -> StatusCode {
        self.directed_announcement
            .handle_offer_request(path, peer)
            .err()
            .map(|e| (&e).into())
            .unwrap_or(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockBus;

    fn new_module(dir: &tempfile::TempDir) -> Arc<FileTransferModule> {
        let bus: Arc<dyn SessionBus> = Arc::new(MockBus::new());
        let config = CoreConfig {
            default_save_directory: Some(dir.path().to_path_buf()),
            ..CoreConfig::default()
        };
        FileTransferModule::new(bus, "peerA".into(), config)
    }

    #[tokio::test]
    async fn announce_then_request_announcement_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let module = new_module(&dir);
        module.on_announcement_received(Arc::new(|_, _, _| {}));
        let status = module.request_announcement("peerB");
        assert_eq!(status, StatusCode::Ok);
    }

    #[tokio::test]
    async fn request_announcement_without_a_listener_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let module = new_module(&dir);
        let status = module.request_announcement("peerB");
        assert_eq!(status, StatusCode::NoFileAnnouncementListener);
    }

    #[tokio::test]
    async fn request_file_without_known_descriptor_is_bad_file_id() {
        let dir = tempfile::tempdir().unwrap();
        let module = new_module(&dir);
        let status = module.request_file("peerB", [1; 20], "out.bin", None);
        assert_eq!(status, StatusCode::BadFileID);
    }

    #[tokio::test]
    async fn end_to_end_chunk_transfer_between_two_modules() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();

        let source_path = dir_a.path().join("payload.bin");
        std::fs::write(&source_path, vec![7u8; 10]).unwrap();

        let bus_a: Arc<dyn SessionBus> = Arc::new(MockBus::new());
        let config_a = CoreConfig {
            default_chunk_size: 4,
            ..CoreConfig::default()
        };
        let a = FileTransferModule::new(bus_a, "peerA".into(), config_a);
        a.announce(vec![source_path.clone()]);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let file_id = a.catalog.announced_local()[0].file_id;

        let bus_b: Arc<dyn SessionBus> = Arc::new(MockBus::new());
        let config_b = CoreConfig {
            default_chunk_size: 4,
            default_save_directory: Some(dir_b.path().to_path_buf()),
            ..CoreConfig::default()
        };
        let b = FileTransferModule::new(bus_b, "peerB".into(), config_b);
        b.inbound_announce(a.catalog.announced_local(), false, "peerA").await;

        let status = b.request_file("peerA", file_id, "payload.bin", None);
        assert_eq!(status, StatusCode::Ok);

        // deliver chunks directly, as a real bus adapter would after
        // routing A's outbound DataChunk actions to B's inbound path
        let mut offset = 0u64;
        let total = 10u64;
        while offset < total {
            let len = (total - offset).min(4) as usize;
            let chunk = vec![7u8; len];
            b.inbound_data_chunk(file_id, offset, chunk, "peerA").await;
            offset += len as u64;
        }

        let written = std::fs::read(dir_b.path().join("payload.bin")).unwrap();
        assert_eq!(written, vec![7u8; 10]);
    }
}
