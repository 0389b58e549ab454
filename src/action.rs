//! The outbound protocol event. Every operation a manager wants to place
//! on the wire is expressed as one [`Action`] and handed to the
//! [`crate::dispatcher::Dispatcher`].

use crate::descriptor::{FileDescriptor, FileId};

/// A single outbound protocol event. `peer` on broadcast-capable variants
/// may be empty to mean "everyone in the session"; the dispatcher treats
/// that as a broadcast signal instead of a directed one.
#[derive(Debug, Clone)]
pub enum Action {
    /// Broadcast or directed announcement of a descriptor list.
    Announce {
        /// Destination peer, or empty for a broadcast.
        peer: String,
        /// The descriptors being announced.
        file_list: Vec<FileDescriptor>,
        /// `true` when this is a directed response to an offer request.
        is_offer_response: bool,
    },
    /// Method call requesting a byte range of a file.
    RequestData {
        /// Destination peer.
        peer: String,
        /// The file being requested.
        file_id: FileId,
        /// Starting byte offset.
        start_byte: u64,
        /// Number of bytes requested.
        length: u64,
        /// Maximum chunk size the requester can accept.
        max_chunk_size: u32,
    },
    /// A signal carrying one chunk of file data.
    DataChunk {
        /// Destination peer.
        peer: String,
        /// The file this chunk belongs to.
        file_id: FileId,
        /// Byte offset of this chunk within the file.
        start_byte: u64,
        /// Length of `chunk` in bytes.
        chunk_length: u32,
        /// The chunk's bytes.
        chunk: Vec<u8>,
    },
    /// Method call offering a file unsolicited.
    OfferFile {
        /// Destination peer.
        peer: String,
        /// The file being offered.
        descriptor: FileDescriptor,
    },
    /// Broadcast signal requesting that peers announce their files.
    RequestAnnouncement {
        /// Destination peer, or empty for a broadcast.
        peer: String,
    },
    /// Signal telling the sender to stop transmitting chunks.
    StopXfer {
        /// Destination peer.
        peer: String,
        /// The file whose transfer should stop.
        file_id: FileId,
    },
    /// Signal telling the receiver the sender cancelled the transfer.
    XferCancelled {
        /// Destination peer.
        peer: String,
        /// The cancelled file.
        file_id: FileId,
    },
    /// Method call asking a peer to announce a file it has not announced.
    RequestOffer {
        /// Destination peer.
        peer: String,
        /// The path being requested, as known to the requester.
        file_path: String,
    },
    /// Internal-only: never transmitted. Routes a path through the
    /// dispatcher's worker so hashing happens off the caller's thread,
    /// then the directed announcement manager turns it into a real
    /// descriptor and a directed `Announce`.
    FileIDResponse {
        /// Destination peer the eventual announcement should go to.
        peer: String,
        /// Path to hash and describe.
        file_path: String,
    },
}

impl Action {
    /// True for the three actions that are method calls rather than
    /// signals; these bypass the dispatcher queue entirely via
    /// `transmit_immediately`.
    pub fn is_method_call(&self) -> bool {
        matches!(
            self,
            Action::RequestData { .. } | Action::OfferFile { .. } | Action::RequestOffer { .. }
        )
    }

    /// True for the internal marker variant that never reaches the bus.
    pub fn is_internal_only(&self) -> bool {
        matches!(self, Action::FileIDResponse { .. })
    }
}
