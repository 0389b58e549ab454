//! Stable status codes returned from every public API call.
//!
//! These mirror the original status enum one-for-one: ordinal values are
//! part of the wire contract (a `request_data`/`offer_file`/`request_offer`
//! method call returns one of these as its reply) and must never be
//! reordered.

use crate::error::Error;

/// Stable integer status returned by public operations instead of an
/// exception-style error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    /// The operation succeeded.
    Ok = 0,
    /// `file_id` does not match any known descriptor.
    BadFileID = 1,
    /// The remote peer (or a local observer) denied the request.
    RequestDenied = 2,
    /// The peer name is malformed or unknown to the session.
    BadPeerName = 3,
    /// The directory name is malformed or inaccessible.
    BadDirectoryName = 4,
    /// A transfer request was denied.
    TransferRequestDenied = 5,
    /// The data id in a chunk does not match any in-flight transfer.
    BadDataID = 6,
    /// The file path is invalid or inaccessible.
    BadFilePath = 7,
    /// An offer was accepted but the peer never followed up in time.
    OfferTimeout = 8,
    /// An offer was rejected by the remote peer.
    OfferRejected = 9,
    /// An offer was accepted by the remote peer.
    OfferAccepted = 10,
    /// No announcement-received observer is registered.
    NoFileAnnouncementListener = 11,
    /// The operation was cancelled.
    Cancelled = 12,
    /// No in-flight transfer matches the given file id.
    FileNotBeingTransferred = 13,
    /// The operation timed out.
    TimedOut = 14,
    /// The request or argument was invalid.
    Invalid = 15,
    /// A request for this file id is already outstanding.
    OutstandingFileIDRequest = 16,
    /// No session is currently attached.
    NoAjConnection = 17,
}

impl From<&Error> for StatusCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::UnknownFileId => StatusCode::BadFileID,
            Error::PathNotAnnounced(_) => StatusCode::BadFilePath,

            Error::InvalidPath(_) => StatusCode::BadFilePath,
            Error::Io(_) => StatusCode::Invalid,
            Error::CacheDecode(_) => StatusCode::Invalid,

            Error::DispatcherStopped => StatusCode::NoAjConnection,
            Error::NoSession => StatusCode::NoAjConnection,
            Error::Bus(_) => StatusCode::Invalid,
            Error::NoAnnouncementListener => StatusCode::NoFileAnnouncementListener,

            Error::FileNotBeingTransferred => StatusCode::FileNotBeingTransferred,
            Error::OutstandingFileIDRequest => StatusCode::OutstandingFileIDRequest,
            Error::BadDirectory(_) => StatusCode::BadDirectoryName,

            Error::OfferRejected => StatusCode::OfferRejected,
            Error::OfferTimeout => StatusCode::OfferTimeout,
            Error::RequestDenied => StatusCode::RequestDenied,

            Error::Internal(_) => StatusCode::Invalid,
        }
    }
}

impl From<Error> for StatusCode {
    fn from(err: Error) -> Self {
        StatusCode::from(&err)
    }
}

impl<T> From<crate::error::Result<T>> for StatusCode {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(_) => StatusCode::Ok,
            Err(e) => StatusCode::from(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_match_the_wire_contract() {
        assert_eq!(StatusCode::Ok as i32, 0);
        assert_eq!(StatusCode::BadFileID as i32, 1);
        assert_eq!(StatusCode::NoAjConnection as i32, 17);
    }

    #[test]
    fn error_conversion_is_lossy_but_deterministic() {
        let s: StatusCode = (&Error::OfferTimeout).into();
        assert_eq!(s, StatusCode::OfferTimeout);
    }

    #[test]
    fn missing_announcement_listener_maps_to_its_own_ordinal() {
        let s: StatusCode = (&Error::NoAnnouncementListener).into();
        assert_eq!(s, StatusCode::NoFileAnnouncementListener);
        assert_eq!(s as i32, 11);
    }
}
