//! # Send Manager
//!
//! Owns the outbound transfer state machine, one entry per `file_id`
//! currently being sent:
//!
//! ```text
//! IDLE ──(valid request)──► SENDING ──(chunk drained, more to send)──► SENDING
//!                               │
//!                               ├──(length reached)────────────► DONE
//!                               ├──(local cancel)──────────────► CANCELLED_BY_SENDER
//!                               └──(stop_xfer received)────────► STOPPED_BY_RECEIVER
//! ```
//!
//! All terminal states destroy the [`FileStatus`] entry; there are no
//! transitions out of a terminal state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Action;
use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::descriptor::{FileId, FileStatus};
use crate::dispatcher::{ChunkDrainedListener, Dispatcher};
use crate::error::{Error, Result};
use crate::fs_adapter::FileSystemAdapter;
use crate::receiver::SendTarget;

/// Callback invoked once a request to send a file has been accepted.
pub type RequestReceivedObserver = Arc<dyn Fn(FileId, &str) + Send + Sync>;

/// The outbound transfer state machine.
pub struct SendManager {
    catalog: Arc<Catalog>,
    fsa: Arc<FileSystemAdapter>,
    dispatcher: Arc<Dispatcher>,
    config: Arc<CoreConfig>,
    in_flight: parking_lot::RwLock<HashMap<FileId, FileStatus>>,
    request_received: parking_lot::RwLock<Option<RequestReceivedObserver>>,
}

impl SendManager {
    /// Builds a send manager sharing the catalog, filesystem adapter,
    /// dispatcher, and config with the rest of the engine.
    pub fn new(
        catalog: Arc<Catalog>,
        fsa: Arc<FileSystemAdapter>,
        dispatcher: Arc<Dispatcher>,
        config: Arc<CoreConfig>,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            fsa,
            dispatcher,
            config,
            in_flight: parking_lot::RwLock::new(HashMap::new()),
            request_received: parking_lot::RwLock::new(None),
        })
    }

    /// Sets the observer fired each time a remote `request_data` is
    /// accepted.
    pub fn set_request_received_observer(&self, observer: RequestReceivedObserver) {
        *self.request_received.write() = Some(observer);
    }

    /// A peer requested a byte range of a file we've announced or
    /// offered. Starts the transfer and enqueues the first chunk.
    pub fn handle_request(
        &self,
        peer: &str,
        file_id: FileId,
        start_byte: u64,
        length: u64,
        max_chunk_size: u32,
    ) -> Result<()> {
        self.catalog.find_local(file_id).ok_or(Error::UnknownFileId)?;

        let chunk_length = max_chunk_size.min(self.config.default_chunk_size);
        let status = FileStatus {
            file_id,
            peer: peer.to_string(),
            start_byte,
            length,
            bytes_transferred: 0,
            chunk_length,
            save_directory: None,
            save_filename: None,
        };
        self.in_flight.write().insert(file_id, status);

        tracing::debug!(peer, chunk_length, file_id = %crate::wire::file_id_hex(&file_id), "send: starting transfer");
        self.send_next_chunk(file_id, peer);

        if let Some(observer) = self.request_received.read().clone() {
            observer(file_id, peer);
        }
        Ok(())
    }

    /// Cancels a transfer we are sending. Idempotent: a second call
    /// returns [`Error::FileNotBeingTransferred`] without side effects.
    pub fn cancel(&self, file_id: FileId) -> Result<()> {
        let status = self
            .in_flight
            .write()
            .remove(&file_id)
            .ok_or(Error::FileNotBeingTransferred)?;
        tracing::info!(peer = %status.peer, file_id = %crate::wire::file_id_hex(&file_id), "send: cancelled by sender");
        self.dispatcher.insert_action(Action::XferCancelled {
            peer: status.peer,
            file_id,
        });
        Ok(())
    }

    fn send_next_chunk(&self, file_id: FileId, peer: &str) {
        let path = {
            let status = self.in_flight.read();
            let status = match status.get(&file_id) {
                Some(s) => s.clone(),
                None => return,
            };
            let descriptor = match self.catalog.find_local(file_id) {
                Some(d) => d,
                None => return,
            };
            (self.fsa.build_path(&descriptor), status)
        };
        let (path, status) = path;

        let remaining = status.length - status.bytes_transferred;
        if remaining == 0 {
            self.in_flight.write().remove(&file_id);
            tracing::info!(peer, file_id = %crate::wire::file_id_hex(&file_id), "send: transfer complete");
            return;
        }

        let want = remaining.min(status.chunk_length as u64) as u32;
        let chunk = match self.fsa.read_chunk(&path, status.start_byte + status.bytes_transferred, want) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "send: read_chunk failed, cancelling");
                self.in_flight.write().remove(&file_id);
                return;
            }
        };
        let chunk_length = chunk.len() as u32;
        let start_byte = status.start_byte + status.bytes_transferred;

        if let Some(entry) = self.in_flight.write().get_mut(&file_id) {
            entry.bytes_transferred += chunk_length as u64;
        }

        self.dispatcher.insert_action(Action::DataChunk {
            peer: peer.to_string(),
            file_id,
            start_byte,
            chunk_length,
            chunk,
        });
    }
}

#[async_trait]
impl ChunkDrainedListener for SendManager {
    async fn chunk_drained(&self, file_id: FileId, peer: &str) {
        self.send_next_chunk(file_id, peer);
    }
}

#[async_trait]
impl SendTarget for SendManager {
    async fn handle_stop_xfer(&self, file_id: FileId, _peer: &str) {
        if self.in_flight.write().remove(&file_id).is_some() {
            tracing::info!("send: stopped by receiver");
        }
    }
}
