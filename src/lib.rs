//! # file-transfer-core
//!
//! A peer-to-peer chunked file transfer protocol engine layered over an
//! abstracted message bus providing named sessions, directed/broadcast
//! signals, and method calls.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         PROTOCOL ENGINE                             │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │   File System   Catalog        Announcement   Directed Announce-   │
//! │   Adapter        (permissions)  Manager        ment Manager         │
//! │       │              │               │               │             │
//! │       └──────────────┴───────┬───────┴───────────────┘             │
//! │                               │                                     │
//! │                    Offer ─────┼───── Send ─────┬───── Receive       │
//! │                    Manager    │      Manager    │      Manager      │
//! │                               │                 │                   │
//! │                               ▼                 │                   │
//! │                         Dispatcher ◄─────────────┘                  │
//! │                               │                                     │
//! │                         Transmitter                                 │
//! │                               │                                     │
//! │                         SessionBus (external)                       │
//! │                                                                     │
//! │   Inbound signals: SessionBus ──► Receiver ──► manager above         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`facade::FileTransferModule`] wires the ten components together and
//! is the type most applications construct directly.

pub mod action;
pub mod announcement;
pub mod bus;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod directed_announcement;
pub mod dispatcher;
pub mod error;
pub mod facade;
pub mod fs_adapter;
pub mod offer;
pub mod receive;
pub mod receiver;
pub mod send;
pub mod status;
pub mod transmitter;
pub mod wire;

pub use config::CoreConfig;
pub use descriptor::{FileDescriptor, FileId, FileStatus, ProgressDescriptor, ProgressState};
pub use error::{Error, Result};
pub use facade::FileTransferModule;
pub use status::StatusCode;

/// The crate version, for diagnostics and logging.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
