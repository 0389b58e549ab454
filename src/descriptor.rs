//! Wire-level data types shared by every component: the content-addressed
//! file descriptor, per-transfer status, and the externally-visible
//! progress view of that status.

use serde::{Deserialize, Serialize};

/// 20-byte SHA-1 digest identifying a file by content.
pub type FileId = [u8; 20];

/// The wire-level identity of a file: who holds it, where, and its content
/// hash. Two descriptors with equal `file_id` denote identical content
/// regardless of path, so equality is structural over every field (matching
/// the upstream protocol, which hashes on the full tuple).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Bus identity of the peer that holds this file.
    pub owner: String,
    /// Absolute directory the file was announced from. May be blanked by
    /// the announcing peer's visibility policy.
    pub shared_path: String,
    /// Sub-path beneath `shared_path`. May be blanked by visibility policy.
    pub relative_path: String,
    /// The bare file name.
    pub filename: String,
    /// SHA-1 of the file's full byte stream at announcement time.
    pub file_id: FileId,
    /// Size in bytes at announcement time.
    pub size: u64,
}

impl FileDescriptor {
    /// Reconstructs the path this descriptor was announced from, joining
    /// whichever of `shared_path`/`relative_path` are non-empty.
    pub fn full_path(&self) -> std::path::PathBuf {
        let mut p = std::path::PathBuf::new();
        if !self.shared_path.is_empty() {
            p.push(&self.shared_path);
        }
        if !self.relative_path.is_empty() {
            p.push(&self.relative_path);
        }
        p.push(&self.filename);
        p
    }
}

/// Per-transfer progress record held by both the sending and receiving
/// side. Created when a transfer begins; mutated only by its owning
/// manager; destroyed on completion, cancel, or session reset.
#[derive(Debug, Clone)]
pub struct FileStatus {
    /// The file being transferred.
    pub file_id: FileId,
    /// The peer on the other end of the transfer.
    pub peer: String,
    /// Byte offset the transfer started at (always `0` in this design).
    pub start_byte: u64,
    /// Total number of bytes to transfer.
    pub length: u64,
    /// Bytes transferred so far.
    pub bytes_transferred: u64,
    /// Maximum chunk size in force for this transfer.
    pub chunk_length: u32,
    /// Receiver-only: directory the incoming file is saved to.
    pub save_directory: Option<std::path::PathBuf>,
    /// Receiver-only: file name the incoming file is saved as.
    pub save_filename: Option<String>,
}

impl FileStatus {
    /// True once every byte has been accounted for.
    pub fn is_complete(&self) -> bool {
        self.bytes_transferred >= self.length
    }

    /// The absolute path a receive-side status is being written to.
    pub fn save_path(&self) -> Option<std::path::PathBuf> {
        let dir = self.save_directory.as_ref()?;
        let name = self.save_filename.as_ref()?;
        Some(dir.join(name))
    }
}

/// The externally visible state of a [`FileStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    /// Bytes are actively flowing.
    InProgress,
    /// The transfer has been paused by the receiver.
    Paused,
    /// An offer timed out waiting for a follow-up request.
    TimedOut,
}

/// External, read-only view of a [`FileStatus`] for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressDescriptor {
    /// The file being transferred.
    pub file_id: FileId,
    /// Bytes transferred so far.
    pub bytes_transferred: u64,
    /// Total number of bytes to transfer.
    pub length: u64,
    /// Current state.
    pub state: ProgressState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(b: u8) -> FileId {
        [b; 20]
    }

    #[test]
    fn descriptor_equality_is_structural() {
        let a = FileDescriptor {
            owner: "peerA".into(),
            shared_path: "/tmp".into(),
            relative_path: "".into(),
            filename: "x.bin".into(),
            file_id: fid(1),
            size: 10,
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        b.size = 11;
        assert_ne!(a, b);
    }

    #[test]
    fn full_path_skips_blanked_fields() {
        let d = FileDescriptor {
            owner: "p".into(),
            shared_path: "".into(),
            relative_path: "".into(),
            filename: "x.bin".into(),
            file_id: fid(2),
            size: 0,
        };
        assert_eq!(d.full_path(), std::path::PathBuf::from("x.bin"));
    }

    #[test]
    fn status_completion() {
        let mut s = FileStatus {
            file_id: fid(3),
            peer: "p".into(),
            start_byte: 0,
            length: 100,
            bytes_transferred: 99,
            chunk_length: 1024,
            save_directory: None,
            save_filename: None,
        };
        assert!(!s.is_complete());
        s.bytes_transferred = 100;
        assert!(s.is_complete());
    }
}
