//! # File System Adapter
//!
//! Turns local paths into content-addressed [`FileDescriptor`]s, streams
//! chunks for the send side, appends chunks for the receive side, and
//! maintains an optional, non-authoritative hash cache so re-announcing a
//! large tree doesn't re-hash every file on every call.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      FILE SYSTEM ADAPTER                            │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  describe(paths) ──► walk directories ──► hash (or cache hit)       │
//! │                  ──► (descriptors, failed_paths)                   │
//! │                                                                     │
//! │  read_chunk(path, offset, len)   ──► exact-length read, short at EOF │
//! │  append_chunk(path, bytes, off)  ──► write at offset                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::descriptor::{FileDescriptor, FileId};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct CacheEntry {
    mtime_secs: u64,
    size: u64,
    sha1: FileId,
}

/// Content-hash identification, chunked I/O, and the hash cache. One
/// instance is constructed and shared (via `Arc`) across every manager
/// that needs filesystem access.
pub struct FileSystemAdapter {
    cache: parking_lot::Mutex<HashMap<PathBuf, CacheEntry>>,
    cache_file: parking_lot::Mutex<Option<PathBuf>>,
}

impl FileSystemAdapter {
    /// An adapter with no persisted cache.
    pub fn new() -> Self {
        Self {
            cache: parking_lot::Mutex::new(HashMap::new()),
            cache_file: parking_lot::Mutex::new(None),
        }
    }

    /// Describes every file reachable from `paths` (recursing into
    /// directories), returning the successfully-described files and the
    /// subset of input paths that failed (missing or unreadable).
    pub fn describe(
        &self,
        paths: &[PathBuf],
        local_owner: &str,
    ) -> (Vec<FileDescriptor>, Vec<PathBuf>) {
        let mut descriptors = Vec::new();
        let mut failed = Vec::new();

        for root in paths {
            match self.describe_one_root(root, local_owner) {
                Ok(mut found) => descriptors.append(&mut found),
                Err(_) => failed.push(root.clone()),
            }
        }

        (descriptors, failed)
    }

    fn describe_one_root(&self, root: &Path, local_owner: &str) -> Result<Vec<FileDescriptor>> {
        let meta = fs::metadata(root).map_err(|_| Error::InvalidPath(root.display().to_string()))?;

        if meta.is_file() {
            let parent = root
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .to_path_buf();
            let filename = root
                .file_name()
                .ok_or_else(|| Error::InvalidPath(root.display().to_string()))?
                .to_string_lossy()
                .to_string();
            return Ok(vec![self.describe_file(&parent, "", &filename, local_owner)?]);
        }

        let mut entries: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        entries.sort();

        let mut out = Vec::with_capacity(entries.len());
        for path in entries {
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            let filename = path
                .file_name()
                .ok_or_else(|| Error::InvalidPath(path.display().to_string()))?
                .to_string_lossy()
                .to_string();
            out.push(self.describe_file(root, &relative, &filename, local_owner)?);
        }
        Ok(out)
    }

    fn describe_file(
        &self,
        shared: &Path,
        relative: &str,
        filename: &str,
        owner: &str,
    ) -> Result<FileDescriptor> {
        let mut full = shared.to_path_buf();
        if !relative.is_empty() {
            full.push(relative);
        }
        full.push(filename);

        let meta = fs::metadata(&full).map_err(|_| Error::InvalidPath(full.display().to_string()))?;
        let size = meta.len();
        let mtime_secs = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let file_id = self.hash_with_cache(&full, size, mtime_secs)?;

        Ok(FileDescriptor {
            owner: owner.to_string(),
            shared_path: shared.to_string_lossy().to_string(),
            relative_path: relative.to_string(),
            filename: filename.to_string(),
            file_id,
            size,
        })
    }

    fn hash_with_cache(&self, path: &Path, size: u64, mtime_secs: u64) -> Result<FileId> {
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.get(path) {
                if entry.size == size && entry.mtime_secs == mtime_secs {
                    return Ok(entry.sha1);
                }
            }
        }

        let file_id = hash_file(path)?;
        self.cache.lock().insert(
            path.to_path_buf(),
            CacheEntry {
                mtime_secs,
                size,
                sha1: file_id,
            },
        );
        Ok(file_id)
    }

    /// Reads exactly `length` bytes starting at `offset`, or fewer if the
    /// file ends first.
    pub fn read_chunk(&self, path: &Path, offset: u64, length: u32) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        let mut total = 0usize;
        loop {
            let n = file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
            if total == buf.len() {
                break;
            }
        }
        buf.truncate(total);
        Ok(buf)
    }

    /// Writes `bytes` into `path` at `offset`, creating the file and any
    /// parent directories if needed.
    pub fn append_chunk(&self, path: &Path, bytes: &[u8], offset: u64) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(())
    }

    /// Removes a file; returns `false` if it did not exist.
    pub fn delete(&self, path: &Path) -> bool {
        fs::remove_file(path).is_ok()
    }

    /// A path is valid if it exists and its containing directory is
    /// readable and writable, or, for a not-yet-created save target, if
    /// its parent directory exists and is writable.
    pub fn is_valid(&self, path: &Path) -> bool {
        if path.exists() {
            return fs::metadata(path).is_ok();
        }
        path.parent().map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Joins a descriptor's path components using the platform separator.
    pub fn build_path(&self, descriptor: &FileDescriptor) -> PathBuf {
        descriptor.full_path()
    }

    /// Points the adapter at a new cache file: flushes the current cache
    /// to the previous file (if any) then loads from the new one.
    pub fn set_cache_file(&self, path: Option<PathBuf>) -> Result<()> {
        {
            let prev = self.cache_file.lock().clone();
            if let Some(prev) = prev {
                self.flush_cache_to(&prev)?;
            }
        }
        match &path {
            Some(p) => self.load_cache_from(p),
            None => {
                self.cache.lock().clear();
            }
        }
        *self.cache_file.lock() = path;
        Ok(())
    }

    /// Drops cache entries whose backing file is gone or whose size/mtime
    /// no longer match.
    pub fn clean_cache_file(&self) {
        let mut cache = self.cache.lock();
        cache.retain(|path, entry| {
            match fs::metadata(path) {
                Ok(meta) => {
                    let mtime_secs = meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
                        .map(|d| d.as_secs())
                        .unwrap_or(0);
                    meta.len() == entry.size && mtime_secs == entry.mtime_secs
                }
                Err(_) => false,
            }
        });
    }

    fn flush_cache_to(&self, path: &Path) -> Result<()> {
        let cache = self.cache.lock();
        let bytes = bincode::serialize(&*cache).map_err(|e| Error::CacheDecode(e.to_string()))?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Corrupt or missing cache files are never a hard error: the cache is
    /// purely an optimization, so on any decode failure we fall back to an
    /// empty cache and log a warning.
    fn load_cache_from(&self, path: &Path) {
        let mut cache = self.cache.lock();
        match fs::read(path) {
            Ok(bytes) => match bincode::deserialize::<HashMap<PathBuf, CacheEntry>>(&bytes) {
                Ok(loaded) => *cache = loaded,
                Err(e) => {
                    tracing::warn!(error = %e, "hash cache file is corrupt, starting empty");
                    cache.clear();
                }
            },
            Err(_) => cache.clear(),
        }
    }
}

impl Default for FileSystemAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the SHA-1 of a file's full byte stream.
pub fn hash_file(path: &Path) -> Result<FileId> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    Ok(out)
}
