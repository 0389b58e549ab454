//! # Directed Announcement Manager
//!
//! Handles offer-requests: a peer asking for a file by path that was
//! never announced. Local policy defaults to deny — a file is only
//! produced if it's already in the catalog, or the
//! [`UnannouncedFileRequestDelegate`](type@UnannouncedFileRequestDelegate)
//! explicitly allows it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::action::Action;
use crate::announcement::AnnouncementManager;
use crate::catalog::Catalog;
use crate::descriptor::FileDescriptor;
use crate::dispatcher::{Dispatcher, FileIdResponseHandler};
use crate::error::{Error, Result};
use crate::fs_adapter::FileSystemAdapter;
use crate::receiver::DirectedAnnouncementTarget;
use crate::status::StatusCode;

/// Asked once per unannounced-path offer-request; returns `true` to
/// allow the file to be described and announced back to the requester.
/// With no delegate registered, every such request is denied.
pub type UnannouncedFileRequestDelegate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Per-peer requested-file announcements.
pub struct DirectedAnnouncementManager {
    local_owner: parking_lot::RwLock<String>,
    catalog: Arc<Catalog>,
    fsa: Arc<FileSystemAdapter>,
    dispatcher: Arc<Dispatcher>,
    announcement: Arc<AnnouncementManager>,
    unannounced_file_request: parking_lot::RwLock<Option<UnannouncedFileRequestDelegate>>,
}

impl DirectedAnnouncementManager {
    /// Builds a directed announcement manager, sharing the
    /// announcement-received observer slot with `announcement`.
    pub fn new(
        local_owner: String,
        catalog: Arc<Catalog>,
        fsa: Arc<FileSystemAdapter>,
        dispatcher: Arc<Dispatcher>,
        announcement: Arc<AnnouncementManager>,
    ) -> Arc<Self> {
        Arc::new(Self {
            local_owner: parking_lot::RwLock::new(local_owner),
            catalog,
            fsa,
            dispatcher,
            announcement,
            unannounced_file_request: parking_lot::RwLock::new(None),
        })
    }

    /// Sets the default-deny delegate asked about paths we haven't
    /// announced.
    pub fn set_unannounced_file_request_delegate(&self, delegate: UnannouncedFileRequestDelegate) {
        *self.unannounced_file_request.write() = Some(delegate);
    }

    /// Rewrites the owner stamped onto descriptors produced in response
    /// to an offer request (on session change).
    pub fn set_local_owner(&self, owner: String) {
        *self.local_owner.write() = owner;
    }

    /// Asks `peer` to announce `path` via a method call.
    pub async fn request_offer(&self, peer: &str, path: &str) -> Result<()> {
        let status = self
            .dispatcher
            .transmit_immediately(&Action::RequestOffer {
                peer: peer.to_string(),
                file_path: path.to_string(),
            })
            .await;
        match status {
            StatusCode::Ok => Ok(()),
            _ => Err(Error::RequestDenied),
        }
    }

    /// Server side of `request_offer`: decides whether to produce a
    /// descriptor for `path` and, if so, defers the hashing to the
    /// dispatcher's worker task via an internal `FileIDResponse` action.
    pub fn handle_offer_request(&self, path: &str, peer: &str) -> Result<()> {
        let already_known = self
            .catalog
            .announced_local()
            .iter()
            .any(|d| d.full_path().to_string_lossy() == path);

        let allowed = already_known
            || self
                .unannounced_file_request
                .read()
                .as_ref()
                .map(|f| f(path))
                .unwrap_or(false);

        if !allowed {
            return Err(Error::RequestDenied);
        }

        self.dispatcher.insert_action(Action::FileIDResponse {
            peer: peer.to_string(),
            file_path: path.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl FileIdResponseHandler for DirectedAnnouncementManager {
    async fn handle_file_id_response(&self, peer: &str, file_path: &str) {
        let owner = self.local_owner.read().clone();
        let (descriptors, failed) = self
            .fsa
            .describe(&[std::path::PathBuf::from(file_path)], &owner);
        if !failed.is_empty() || descriptors.is_empty() {
            tracing::warn!(file_path, "directed announcement: describe failed");
            return;
        }
        let descriptor = descriptors.into_iter().next().unwrap();
        self.catalog.add_offered_local(descriptor.clone());
        self.dispatcher.insert_action(Action::Announce {
            peer: peer.to_string(),
            file_list: vec![descriptor],
            is_offer_response: true,
        });
    }
}

#[async_trait]
impl DirectedAnnouncementTarget for DirectedAnnouncementManager {
    async fn handle_offer_response(&self, list: Vec<FileDescriptor>, peer: &str) {
        for d in &list {
            self.catalog.add_offered_remote(d.clone(), peer);
        }
        self.announcement.notify_received(list, true, peer.to_string());
    }
}
