//! # Error Handling
//!
//! Errors raised by the protocol engine, categorized by the component that
//! raises them. Every public API call ultimately converts its terminal
//! [`Result`] into a [`crate::status::StatusCode`] at the boundary; internal
//! code always propagates with `?`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          ERROR CATEGORIES                           │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  Catalog (100-199)     │ lookups and replacement in the permission  │
//! │                        │ manager's in-memory maps                  │
//! │  Filesystem (200-299)  │ the file system adapter: hashing, chunk    │
//! │                        │ I/O, path validation, the hash cache       │
//! │  Dispatch (300-399)    │ the action queue and bus transmission      │
//! │  Transfer (400-499)    │ send/receive state machine violations      │
//! │  Offer (500-599)       │ offer negotiation and timeouts             │
//! │  Internal (900-999)    │ should not happen in normal operation      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for the protocol engine.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Catalog Errors (100-199)
    // ========================================================================
    /// No descriptor is known for the given file id.
    #[error("unknown file id")]
    UnknownFileId,

    /// A path passed to `remove_announced_local` matches no announced file.
    #[error("path is not announced: {0}")]
    PathNotAnnounced(String),

    // ========================================================================
    // Filesystem Errors (200-299)
    // ========================================================================
    /// The path does not exist or is not accessible in the required mode.
    #[error("invalid file path: {0}")]
    InvalidPath(String),

    /// Underlying I/O failure while hashing, reading, or writing a file.
    #[error("filesystem I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The hash cache file could not be decoded; treated as non-fatal by
    /// callers, but surfaced here for logging.
    #[error("hash cache decode error: {0}")]
    CacheDecode(String),

    // ========================================================================
    // Dispatch Errors (300-399)
    // ========================================================================
    /// The dispatcher's worker task has already shut down.
    #[error("dispatcher worker is not running")]
    DispatcherStopped,

    /// No session is currently attached; signals and method calls cannot be
    /// transmitted.
    #[error("no session attached")]
    NoSession,

    /// `request_announcement` was called with no announcement-received
    /// observer registered to receive the reply.
    #[error("no announcement-received listener is registered")]
    NoAnnouncementListener,

    /// A bus-level failure while sending a signal or method call.
    #[error("bus transmission error: {0}")]
    Bus(String),

    // ========================================================================
    // Transfer Errors (400-499)
    // ========================================================================
    /// No in-flight transfer matches the given file id.
    #[error("file is not currently being transferred")]
    FileNotBeingTransferred,

    /// A second `request_file` for a file id already being received.
    #[error("a request for this file id is already outstanding")]
    OutstandingFileIDRequest,

    /// The requested save directory failed validation.
    #[error("invalid save directory: {0}")]
    BadDirectory(String),

    // ========================================================================
    // Offer Errors (500-599)
    // ========================================================================
    /// The remote peer rejected an unsolicited offer.
    #[error("offer was rejected by the remote peer")]
    OfferRejected,

    /// The remote peer accepted but never followed up with a data request
    /// before the timeout elapsed.
    #[error("offer timed out waiting for the remote peer's request")]
    OfferTimeout,

    /// A peer asked for a file we have not announced and the
    /// unannounced-file-request observer declined (or is unset).
    #[error("request was denied")]
    RequestDenied,

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================
    /// Catch-all for invariant violations that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric code used for logging and cross-boundary reporting,
    /// independent of the public [`crate::status::StatusCode`] mapping.
    pub fn code(&self) -> i32 {
        match self {
            Error::UnknownFileId => 100,
            Error::PathNotAnnounced(_) => 101,

            Error::InvalidPath(_) => 200,
            Error::Io(_) => 201,
            Error::CacheDecode(_) => 202,

            Error::DispatcherStopped => 300,
            Error::NoSession => 301,
            Error::Bus(_) => 302,
            Error::NoAnnouncementListener => 303,

            Error::FileNotBeingTransferred => 400,
            Error::OutstandingFileIDRequest => 401,
            Error::BadDirectory(_) => 402,

            Error::OfferRejected => 500,
            Error::OfferTimeout => 501,
            Error::RequestDenied => 502,

            Error::Internal(_) => 900,
        }
    }
}
