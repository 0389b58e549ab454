//! # Dispatcher
//!
//! A single-consumer FIFO queue with one worker task that serializes
//! outbound signal transmission. Method-call actions bypass the queue
//! entirely via [`Dispatcher::transmit_immediately`] — queueing a method
//! call behind a slow broadcast would deadlock request/response flows,
//! since the caller blocks waiting for the remote peer's reply.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           DISPATCHER                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  insert_action(signal) ──► mpsc queue ──► worker task ──► Transmitter│
//! │                                              │                      │
//! │                                              ├─ DataChunk ─► notify │
//! │                                              │   Send Manager       │
//! │                                              └─ FileIDResponse ─►   │
//! │                                                  Directed           │
//! │                                                  Announcement Mgr   │
//! │                                                                     │
//! │  transmit_immediately(method_call) ──► Transmitter (bypasses queue) │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::descriptor::FileId;
use crate::status::StatusCode;
use crate::transmitter::Transmitter;

/// Notified once a queued [`Action::DataChunk`] has been handed to the
/// transmitter, so the send manager can produce the next chunk.
#[async_trait]
pub trait ChunkDrainedListener: Send + Sync {
    /// One chunk for `file_id` has been transmitted to `peer`.
    async fn chunk_drained(&self, file_id: FileId, peer: &str);
}

/// Notified when an internal [`Action::FileIDResponse`] reaches the front
/// of the queue, so the directed announcement manager can perform the
/// (potentially slow) hashing work on the worker task rather than the
/// caller's thread.
#[async_trait]
pub trait FileIdResponseHandler: Send + Sync {
    /// Hash `file_path` and announce the resulting descriptor to `peer`.
    async fn handle_file_id_response(&self, peer: &str, file_path: &str);
}

/// The action queue and its worker task.
pub struct Dispatcher {
    sender: RwLock<mpsc::UnboundedSender<Action>>,
    worker: RwLock<Option<tokio::task::JoinHandle<()>>>,
    transmitter: Arc<RwLock<Arc<Transmitter>>>,
    chunk_drained: RwLock<Option<Arc<dyn ChunkDrainedListener>>>,
    file_id_response: RwLock<Option<Arc<dyn FileIdResponseHandler>>>,
}

impl Dispatcher {
    /// Builds a dispatcher bound to `transmitter` and spawns its worker.
    pub fn new(transmitter: Arc<Transmitter>) -> Arc<Self> {
        let transmitter = Arc::new(RwLock::new(transmitter));
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(Self {
            sender: RwLock::new(tx),
            worker: RwLock::new(None),
            transmitter,
            chunk_drained: RwLock::new(None),
            file_id_response: RwLock::new(None),
        });
        let handle = dispatcher.clone().spawn_worker(rx);
        *dispatcher.worker.write() = Some(handle);
        dispatcher
    }

    /// Registers the send manager's chunk-drained callback.
    pub fn set_chunk_drained_listener(&self, listener: Arc<dyn ChunkDrainedListener>) {
        *self.chunk_drained.write() = Some(listener);
    }

    /// Registers the directed announcement manager's file-id-response
    /// handler.
    pub fn set_file_id_response_handler(&self, handler: Arc<dyn FileIdResponseHandler>) {
        *self.file_id_response.write() = Some(handler);
    }

    /// Enqueues a non-method-call action. Preserves submission order for
    /// a single dispatcher instance.
    pub fn insert_action(&self, action: Action) {
        debug_assert!(
            !action.is_method_call(),
            "method calls must use transmit_immediately"
        );
        if self.sender.read().send(action).is_err() {
            tracing::warn!("dispatcher worker is not running, action dropped");
        }
    }

    /// Sends a method-call action directly on the caller's task,
    /// bypassing the queue so the blocking request/response round trip
    /// never waits behind queued broadcasts.
    pub async fn transmit_immediately(&self, action: &Action) -> StatusCode {
        let transmitter = self.transmitter.read().clone();
        transmitter.transmit(action).await
    }

    /// Replaces the transmitter (on session change) and restarts the
    /// worker against a fresh queue. Anything still queued against the
    /// old transmitter is dropped: a session change invalidates peer
    /// identities, so draining stale actions against the new session
    /// would be meaningless.
    pub fn reset(self: &Arc<Self>, transmitter: Arc<Transmitter>) {
        *self.transmitter.write() = transmitter;

        let (tx, rx) = mpsc::unbounded_channel();
        let old_sender = std::mem::replace(&mut *self.sender.write(), tx);
        drop(old_sender);

        if let Some(old_worker) = self.worker.write().take() {
            old_worker.abort();
        }
        let handle = self.clone().spawn_worker(rx);
        *self.worker.write() = Some(handle);
    }

    fn spawn_worker(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Action>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(action) = rx.recv().await {
                self.drain_one(action).await;
            }
        })
    }

    async fn drain_one(&self, action: Action) {
        match action {
            Action::FileIDResponse { peer, file_path } => {
                let handler = self.file_id_response.read().clone();
                if let Some(handler) = handler {
                    handler.handle_file_id_response(&peer, &file_path).await;
                } else {
                    tracing::warn!("no FileIDResponse handler registered, dropping action");
                }
            }
            Action::DataChunk {
                ref peer,
                file_id,
                ..
            } => {
                let peer = peer.clone();
                let transmitter = self.transmitter.read().clone();
                transmitter.transmit(&action).await;
                let listener = self.chunk_drained.read().clone();
                if let Some(listener) = listener {
                    listener.chunk_drained(file_id, &peer).await;
                }
            }
            other => {
                let transmitter = self.transmitter.read().clone();
                transmitter.transmit(&other).await;
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.write().take() {
            worker.abort();
        }
    }
}
