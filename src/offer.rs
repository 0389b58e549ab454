//! # Offer Manager
//!
//! Synchronous unsolicited file offers. `offer_file` blocks the caller
//! until the remote peer either rejects the offer, times out without
//! following up, or actually requests the data — at which point
//! `handle_request` (invoked from the send manager's inbound path)
//! signals the waiter. The pending-offer table is guarded so the entry
//! is removed on every exit path, including a timeout or a panic during
//! the wait, preventing a leak.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::action::Action;
use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::descriptor::{FileDescriptor, FileId};
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::fs_adapter::FileSystemAdapter;
use crate::send::SendManager;
use crate::receive::ReceiveManager;
use crate::status::StatusCode;

struct PendingOffer {
    descriptor: FileDescriptor,
    notify: oneshot::Sender<()>,
}

/// Asked once per inbound unsolicited offer; returns `true` to accept.
/// With no delegate registered, every offer is rejected.
pub type OfferReceivedDelegate = Arc<dyn Fn(&FileDescriptor) -> bool + Send + Sync>;

/// Offer negotiation and the pending-offers table.
pub struct OfferManager {
    catalog: Arc<Catalog>,
    fsa: Arc<FileSystemAdapter>,
    dispatcher: Arc<Dispatcher>,
    config: Arc<CoreConfig>,
    send: Arc<SendManager>,
    receive: Arc<ReceiveManager>,
    pending: parking_lot::Mutex<HashMap<FileId, PendingOffer>>,
    offer_received: parking_lot::RwLock<Option<OfferReceivedDelegate>>,
}

impl OfferManager {
    /// Builds an offer manager. `send`/`receive` are the managers this
    /// one hands accepted/offered transfers off to.
    pub fn new(
        catalog: Arc<Catalog>,
        fsa: Arc<FileSystemAdapter>,
        dispatcher: Arc<Dispatcher>,
        config: Arc<CoreConfig>,
        send: Arc<SendManager>,
        receive: Arc<ReceiveManager>,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            fsa,
            dispatcher,
            config,
            send,
            receive,
            pending: parking_lot::Mutex::new(HashMap::new()),
            offer_received: parking_lot::RwLock::new(None),
        })
    }

    /// Sets the default-reject delegate asked about inbound offers.
    pub fn set_offer_received_delegate(&self, delegate: OfferReceivedDelegate) {
        *self.offer_received.write() = Some(delegate);
    }

    /// True while an offer for `file_id` is still awaiting the remote
    /// peer's follow-up request.
    pub fn is_offer_pending(&self, file_id: FileId) -> bool {
        self.pending.lock().contains_key(&file_id)
    }

    /// Offers `path` to `peer`. Blocks up to `timeout_ms` (or the
    /// configured default when `0`) after the peer accepts, waiting for
    /// their follow-up `request_data`.
    pub async fn offer_file(&self, peer: &str, path: &std::path::Path, timeout_ms: u64) -> Result<()> {
        let owner = String::new();
        let (descriptors, failed) = self.fsa.describe(&[path.to_path_buf()], &owner);
        if !failed.is_empty() || descriptors.is_empty() {
            return Err(Error::InvalidPath(path.display().to_string()));
        }
        let descriptor = descriptors.into_iter().next().unwrap();
        let file_id = descriptor.file_id;
        self.catalog.add_offered_local(descriptor.clone());

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(
            file_id,
            PendingOffer {
                descriptor: descriptor.clone(),
                notify: tx,
            },
        );

        // Guarantees pending-table cleanup on every exit path below,
        // including the timeout branch and an unexpected early return.
        let cleanup = |mgr: &Self| {
            mgr.pending.lock().remove(&file_id);
        };

        let status = self
            .dispatcher
            .transmit_immediately(&Action::OfferFile {
                peer: peer.to_string(),
                descriptor,
            })
            .await;

        if status != StatusCode::OfferAccepted {
            cleanup(self);
            return Err(Error::OfferRejected);
        }

        let timeout = self.config.effective_offer_timeout_ms(timeout_ms);
        let result = tokio::time::timeout(Duration::from_millis(timeout), rx).await;
        cleanup(self);

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(Error::OfferTimeout),
        }
    }

    /// Server side of `request_data` when it matches a pending offer:
    /// fulfills the waiting `offer_file` caller and hands the transfer
    /// to the send manager.
    pub fn handle_request(
        &self,
        peer: &str,
        file_id: FileId,
        start_byte: u64,
        length: u64,
        max_chunk_size: u32,
    ) -> Result<()> {
        let pending = self.pending.lock().remove(&file_id);
        match pending {
            Some(entry) => {
                let _ = entry.notify.send(());
                self.send.handle_request(peer, file_id, start_byte, length, max_chunk_size)
            }
            None => Err(Error::UnknownFileId),
        }
    }

    /// Server side of `offer_file`: asks the delegate whether to accept,
    /// and if so records the descriptor and immediately requests the
    /// whole file via the receive manager.
    pub async fn handle_offer(&self, peer: &str, descriptor: FileDescriptor) -> StatusCode {
        let accept = self
            .offer_received
            .read()
            .as_ref()
            .map(|f| f(&descriptor))
            .unwrap_or(false);

        if !accept {
            return StatusCode::OfferRejected;
        }

        self.catalog.add_offered_remote(descriptor.clone(), peer);
        let filename = descriptor.filename.clone();
        if let Err(e) = self.receive.request_file(peer, descriptor.file_id, &filename, None) {
            tracing::warn!(error = %e, "offer: accepted but request_file failed");
            return StatusCode::OfferRejected;
        }
        StatusCode::OfferAccepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockBus;
    use crate::transmitter::Transmitter;

    fn setup() -> (Arc<OfferManager>, Arc<MockBus>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(Catalog::new());
        let fsa = Arc::new(FileSystemAdapter::new());
        let bus = Arc::new(MockBus::new());
        let tx = Arc::new(Transmitter::new(bus.clone()));
        let dispatcher = Dispatcher::new(tx);
        let config = Arc::new(CoreConfig {
            default_offer_timeout_ms: 100,
            default_save_directory: Some(dir.path().to_path_buf()),
            ..CoreConfig::default()
        });
        let send = SendManager::new(catalog.clone(), fsa.clone(), dispatcher.clone(), config.clone());
        dispatcher.set_chunk_drained_listener(send.clone());
        let receive = ReceiveManager::new(catalog.clone(), fsa.clone(), dispatcher.clone(), config.clone());
        let mgr = OfferManager::new(catalog, fsa, dispatcher, config, send, receive);
        (mgr, bus, dir)
    }

    #[tokio::test]
    async fn offer_times_out_when_never_requested() {
        let (mgr, bus, dir) = setup();
        bus.set_status_to_return(StatusCode::OfferAccepted);
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"hello").unwrap();
        let result = mgr.offer_file("peerB", &path, 0).await;
        assert!(matches!(result, Err(Error::OfferTimeout)));
        // pending table cleaned up
        let (descs, _) = FileSystemAdapter::new().describe(&[path], "x");
        assert!(!mgr.is_offer_pending(descs[0].file_id));
    }

    #[tokio::test]
    async fn offer_rejected_by_remote_returns_immediately() {
        let (mgr, bus, dir) = setup();
        bus.set_status_to_return(StatusCode::OfferRejected);
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"hello").unwrap();
        let result = mgr.offer_file("peerB", &path, 1000).await;
        assert!(matches!(result, Err(Error::OfferRejected)));
    }

    #[tokio::test]
    async fn late_request_for_timed_out_offer_is_bad_file_id() {
        let (mgr, bus, dir) = setup();
        bus.set_status_to_return(StatusCode::OfferAccepted);
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"hello").unwrap();
        let (descs, _) = FileSystemAdapter::new().describe(&[path.clone()], "x");
        let file_id = descs[0].file_id;

        let _ = mgr.offer_file("peerB", &path, 0).await;
        let err = mgr.handle_request("peerB", file_id, 0, 5, 1024).unwrap_err();
        assert!(matches!(err, Error::UnknownFileId));
    }

    #[tokio::test]
    async fn handle_offer_defaults_to_reject_without_delegate() {
        let (mgr, _bus, _dir) = setup();
        let status = mgr
            .handle_offer(
                "peerA",
                FileDescriptor {
                    owner: "peerA".into(),
                    shared_path: "".into(),
                    relative_path: "".into(),
                    filename: "f".into(),
                    file_id: [1; 20],
                    size: 1,
                },
            )
            .await;
        assert_eq!(status, StatusCode::OfferRejected);
    }
}
