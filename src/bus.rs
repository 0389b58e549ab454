//! The session bus: named sessions, directed/broadcast signals, and method
//! calls. This is the external collaborator the core is layered on top of;
//! [`SessionBus`] is the interface a concrete transport adapter implements.
//! The crate ships [`MockBus`], an in-memory test double modeled on the
//! upstream protocol's mock transmitter/dispatcher test doubles, used by
//! every manager's unit tests and by the integration test in `tests/`.

use async_trait::async_trait;

use crate::descriptor::{FileDescriptor, FileId};
use crate::status::StatusCode;

/// Operations a concrete bus transport must provide. Signal methods return
/// once the bus has accepted the signal for transmission; method-call
/// methods block until the remote peer replies.
#[async_trait]
pub trait SessionBus: Send + Sync {
    /// Broadcast or directed announcement signal.
    async fn send_announcement(
        &self,
        file_list: &[FileDescriptor],
        peer: &str,
        is_offer_response: bool,
    ) -> StatusCode;

    /// `request_data` method call.
    async fn send_request_data(
        &self,
        file_id: FileId,
        start_byte: u64,
        length: u64,
        max_chunk_size: u32,
        peer: &str,
    ) -> StatusCode;

    /// `data_chunk` signal.
    async fn send_data_chunk(
        &self,
        file_id: FileId,
        start_byte: u64,
        chunk: &[u8],
        peer: &str,
    ) -> StatusCode;

    /// `offer_file` method call.
    async fn send_offer_file(&self, descriptor: &FileDescriptor, peer: &str) -> StatusCode;

    /// `request_announcement` signal.
    async fn send_announcement_request(&self, peer: &str) -> StatusCode;

    /// `stop_xfer` signal.
    async fn send_stop_xfer(&self, file_id: FileId, peer: &str) -> StatusCode;

    /// `xfer_cancelled` signal.
    async fn send_xfer_cancelled(&self, file_id: FileId, peer: &str) -> StatusCode;

    /// `request_offer` method call.
    async fn send_request_offer(&self, file_path: &str, peer: &str) -> StatusCode;
}

/// An in-memory [`SessionBus`] test double. Records every call it receives
/// and returns a single programmable status code, mirroring the upstream
/// mock transmitter's `statusCodeToReturn` field.
#[derive(Debug)]
pub struct MockBus {
    status_to_return: parking_lot::Mutex<StatusCode>,
    sent: parking_lot::Mutex<Vec<String>>,
}

impl MockBus {
    /// A mock bus that reports success for every call.
    pub fn new() -> Self {
        Self {
            status_to_return: parking_lot::Mutex::new(StatusCode::Ok),
            sent: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Overrides the status code returned by every subsequent call.
    pub fn set_status_to_return(&self, status: StatusCode) {
        *self.status_to_return.lock() = status;
    }

    /// The label of every call made so far, in order, for assertions in
    /// unit tests (e.g. `["announce", "request_data"]`).
    pub fn sent_calls(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    fn record(&self, label: &str) -> StatusCode {
        self.sent.lock().push(label.to_string());
        *self.status_to_return.lock()
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionBus for MockBus {
    async fn send_announcement(
        &self,
        _file_list: &[FileDescriptor],
        _peer: &str,
        _is_offer_response: bool,
    ) -> StatusCode {
        self.record("announce")
    }

    async fn send_request_data(
        &self,
        _file_id: FileId,
        _start_byte: u64,
        _length: u64,
        _max_chunk_size: u32,
        _peer: &str,
    ) -> StatusCode {
        self.record("request_data")
    }

    async fn send_data_chunk(
        &self,
        _file_id: FileId,
        _start_byte: u64,
        _chunk: &[u8],
        _peer: &str,
    ) -> StatusCode {
        self.record("data_chunk")
    }

    async fn send_offer_file(&self, _descriptor: &FileDescriptor, _peer: &str) -> StatusCode {
        self.record("offer_file")
    }

    async fn send_announcement_request(&self, _peer: &str) -> StatusCode {
        self.record("request_announcement")
    }

    async fn send_stop_xfer(&self, _file_id: FileId, _peer: &str) -> StatusCode {
        self.record("stop_xfer")
    }

    async fn send_xfer_cancelled(&self, _file_id: FileId, _peer: &str) -> StatusCode {
        self.record("xfer_cancelled")
    }

    async fn send_request_offer(&self, _file_path: &str, _peer: &str) -> StatusCode {
        self.record("request_offer")
    }
}
