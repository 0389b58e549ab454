//! # Receive Manager
//!
//! Owns the inbound transfer state machine, one entry per `file_id`
//! currently being received:
//!
//! ```text
//! IDLE ──(request_file acknowledged)──► RECEIVING ──(chunk appended)──► RECEIVING
//!                                            │
//!                                            ├──(all bytes)──────► DONE
//!                                            ├──(xfer_cancelled)──► CANCELLED_BY_SENDER
//!                                            ├──(cancel)──────────► CANCELLED_BY_SELF
//!                                            └──(pause)───────────► PAUSED (status kept)
//! ```
//!
//! `PAUSED` and `CANCELLED_BY_SELF` both enqueue a `StopXfer` signal; the
//! only difference is whether the [`FileStatus`] (and partial file) is
//! retained.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Action;
use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::descriptor::{FileId, FileStatus};
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::fs_adapter::FileSystemAdapter;
use crate::receiver::ReceiveTarget;
use crate::status::StatusCode;

/// Callback fired once per terminal event for a received file.
pub type FileCompletedObserver = Arc<dyn Fn(&str, StatusCode) + Send + Sync>;

/// The inbound transfer state machine.
pub struct ReceiveManager {
    catalog: Arc<Catalog>,
    fsa: Arc<FileSystemAdapter>,
    dispatcher: Arc<Dispatcher>,
    config: Arc<CoreConfig>,
    in_flight: parking_lot::RwLock<HashMap<FileId, FileStatus>>,
    file_completed: parking_lot::RwLock<Option<FileCompletedObserver>>,
}

impl ReceiveManager {
    /// Builds a receive manager sharing the catalog, filesystem adapter,
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
            file_completed: parking_lot::RwLock::new(None),
        })
    }

    /// Sets the observer fired once a file finishes (successfully or via
    /// cancellation).
    pub fn set_file_completed_observer(&self, observer: FileCompletedObserver) {
        *self.file_completed.write() = Some(observer);
    }

    /// Requests the whole of `file_id` from `peer`, saving it to
    /// `save_dir`/`save_name`.
    pub fn request_file(
        &self,
        peer: &str,
        file_id: FileId,
        save_name: &str,
        save_dir: Option<&std::path::Path>,
    ) -> Result<()> {
        let descriptor = self
            .catalog
            .find_remote(peer, file_id)
            .ok_or(Error::UnknownFileId)?;

        let dir = save_dir
            .map(PathBuf::from)
            .or_else(|| self.config.default_save_directory.clone())
            .ok_or_else(|| Error::BadDirectory("no save directory configured".into()))?;
        if !self.fsa.is_valid(&dir) {
            return Err(Error::BadDirectory(dir.display().to_string()));
        }

        if self.in_flight.read().contains_key(&file_id) {
            return Err(Error::OutstandingFileIDRequest);
        }

        let chunk_length = self.config.default_chunk_size;
        let status = FileStatus {
            file_id,
            peer: peer.to_string(),
            start_byte: 0,
            length: descriptor.size,
            bytes_transferred: 0,
            chunk_length,
            save_directory: Some(dir),
            save_filename: Some(save_name.to_string()),
        };
        self.in_flight.write().insert(file_id, status);

        self.dispatcher.insert_action(Action::RequestData {
            peer: peer.to_string(),
            file_id,
            start_byte: 0,
            length: descriptor.size,
            max_chunk_size: chunk_length,
        });
        Ok(())
    }

    /// Pauses a transfer: stops further chunks but keeps the partial file
    /// and the [`FileStatus`] so the caller may design their own resume.
    pub fn pause(&self, file_id: FileId) -> Result<()> {
        let status = self.in_flight.read().get(&file_id).cloned().ok_or(Error::UnknownFileId)?;
        self.dispatcher.insert_action(Action::StopXfer {
            peer: status.peer,
            file_id,
        });
        Ok(())
    }

    /// Cancels a transfer: stops further chunks, forgets the
    /// [`FileStatus`], and deletes the partial file.
    pub fn cancel(&self, file_id: FileId) -> Result<()> {
        let status = self.in_flight.write().remove(&file_id).ok_or(Error::UnknownFileId)?;
        self.dispatcher.insert_action(Action::StopXfer {
            peer: status.peer.clone(),
            file_id,
        });
        if let Some(path) = status.save_path() {
            self.fsa.delete(&path);
        }
        self.notify_completed(&status, StatusCode::Cancelled);
        Ok(())
    }

    fn notify_completed(&self, status: &FileStatus, code: StatusCode) {
        if let Some(observer) = self.file_completed.read().clone() {
            let name = status.save_filename.clone().unwrap_or_default();
            observer(&name, code);
        }
    }
}

#[async_trait]
impl ReceiveTarget for ReceiveManager {
    async fn handle_chunk(&self, file_id: FileId, start_byte: u64, bytes: Vec<u8>, _peer: &str) {
        // Order matters: remove the FileStatus before deleting/writing so
        // a racing cancel() cannot resurrect a just-deleted partial file.
        let (path, done, status) = {
            let mut in_flight = self.in_flight.write();
            let status = match in_flight.get_mut(&file_id) {
                Some(s) => s,
                None => return, // caller cancelled; discard silently
            };
            let path = match status.save_path() {
                Some(p) => p,
                None => return,
            };
            status.bytes_transferred += bytes.len() as u64;
            let done = status.is_complete();
            let status_clone = status.clone();
            if done {
                in_flight.remove(&file_id);
            }
            (path, done, status_clone)
        };

        if let Err(e) = self.fsa.append_chunk(&path, &bytes, start_byte) {
            tracing::warn!(error = %e, file_id = %crate::wire::file_id_hex(&file_id), "receive: append_chunk failed");
            return;
        }

        if done {
            tracing::info!(peer = %status.peer, file_id = %crate::wire::file_id_hex(&file_id), "receive: transfer complete");
            self.notify_completed(&status, StatusCode::Ok);
        }
    }

    async fn handle_xfer_cancelled(&self, file_id: FileId, _peer: &str) {
        if let Some(status) = self.in_flight.write().remove(&file_id) {
            tracing::info!(file_id = %crate::wire::file_id_hex(&file_id), "receive: cancelled by sender");
            self.notify_completed(&status, StatusCode::Cancelled);
        }
    }
}
