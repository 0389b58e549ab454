//! # Receiver
//!
//! Decodes inbound bus signals and delegates to the manager responsible
//! for each one. The receiver does no work itself beyond decoding and
//! routing — in a real transport this module is the bus's signal-handler
//! registration callback; here it is invoked directly by whatever adapts
//! [`crate::bus::SessionBus`] to an actual wire.

use std::sync::Arc;

use async_trait::async_trait;

use crate::descriptor::{FileDescriptor, FileId};

/// Target for inbound `announce` / `request_announcement` signals where
/// `is_offer_response` is `false`.
#[async_trait]
pub trait AnnouncementTarget: Send + Sync {
    /// A peer announced (or re-announced) its file list.
    async fn handle_announced_files(&self, list: Vec<FileDescriptor>, peer: &str);
    /// A peer asked us to announce our files.
    async fn handle_announcement_request(&self, peer: &str);
}

/// Target for inbound directed announcements (`is_offer_response == true`).
#[async_trait]
pub trait DirectedAnnouncementTarget: Send + Sync {
    /// A peer responded to our offer request with a descriptor.
    async fn handle_offer_response(&self, list: Vec<FileDescriptor>, peer: &str);
}

/// Target for inbound signals affecting a transfer we are sending.
#[async_trait]
pub trait SendTarget: Send + Sync {
    /// The receiver asked us to stop sending (pause or cancel; the sender
    /// cannot distinguish the two).
    async fn handle_stop_xfer(&self, file_id: FileId, peer: &str);
}

/// Target for inbound signals affecting a transfer we are receiving.
#[async_trait]
pub trait ReceiveTarget: Send + Sync {
    /// One chunk of data arrived.
    async fn handle_chunk(&self, file_id: FileId, start_byte: u64, bytes: Vec<u8>, peer: &str);
    /// The sender cancelled the transfer.
    async fn handle_xfer_cancelled(&self, file_id: FileId, peer: &str);
}

/// Demultiplexes inbound signals to the five managers that can act on
/// them.
pub struct Receiver {
    announcement: Arc<dyn AnnouncementTarget>,
    directed_announcement: Arc<dyn DirectedAnnouncementTarget>,
    send: Arc<dyn SendTarget>,
    receive: Arc<dyn ReceiveTarget>,
}

impl Receiver {
    /// Builds a receiver wired to its four targets.
    pub fn new(
        announcement: Arc<dyn AnnouncementTarget>,
        directed_announcement: Arc<dyn DirectedAnnouncementTarget>,
        send: Arc<dyn SendTarget>,
        receive: Arc<dyn ReceiveTarget>,
    ) -> Self {
        Self {
            announcement,
            directed_announcement,
            send,
            receive,
        }
    }

    /// Inbound `announce` signal.
    pub async fn announce(&self, file_list: Vec<FileDescriptor>, is_offer_response: bool, peer: &str) {
        if is_offer_response {
            self.directed_announcement.handle_offer_response(file_list, peer).await;
        } else {
            self.announcement.handle_announced_files(file_list, peer).await;
        }
    }

    /// Inbound `request_announcement` signal.
    pub async fn request_announcement(&self, peer: &str) {
        self.announcement.handle_announcement_request(peer).await;
    }

    /// Inbound `data_chunk` signal.
    pub async fn data_chunk(&self, file_id: FileId, start_byte: u64, bytes: Vec<u8>, peer: &str) {
        self.receive.handle_chunk(file_id, start_byte, bytes, peer).await;
    }

    /// Inbound `stop_xfer` signal.
    pub async fn stop_xfer(&self, file_id: FileId, peer: &str) {
        self.send.handle_stop_xfer(file_id, peer).await;
    }

    /// Inbound `xfer_cancelled` signal.
    pub async fn xfer_cancelled(&self, file_id: FileId, peer: &str) {
        self.receive.handle_xfer_cancelled(file_id, peer).await;
    }
}
