//! Configuration for the protocol engine.

use std::path::PathBuf;

/// Tuning options consumed by the core. Constructed once and shared
/// (read-only) across every manager.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Maximum bytes requested per data chunk unless the peer asks for less.
    pub default_chunk_size: u32,
    /// Directory new incoming files are saved to when the caller doesn't
    /// specify one explicitly. Required before any `request_file` call that
    /// omits a directory.
    pub default_save_directory: Option<PathBuf>,
    /// How long `offer_file` blocks waiting for the peer's follow-up
    /// request before returning `OfferTimeout`. `0` means "use the default".
    pub default_offer_timeout_ms: u64,
    /// Whether announced descriptors carry their relative path.
    pub show_relative_path: bool,
    /// Whether announced descriptors carry their shared (root) path.
    pub show_shared_path: bool,
    /// Optional path to a persisted hash cache file.
    pub hash_cache_file_path: Option<PathBuf>,
}

/// Default timeout applied when `default_offer_timeout_ms` is `0`.
pub const DEFAULT_OFFER_TIMEOUT_MS: u64 = 5000;

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: 1024,
            default_save_directory: None,
            default_offer_timeout_ms: DEFAULT_OFFER_TIMEOUT_MS,
            show_relative_path: true,
            show_shared_path: false,
            hash_cache_file_path: None,
        }
    }
}

impl CoreConfig {
    /// The offer timeout to actually apply, substituting the default when
    /// the configured value is `0`.
    pub fn effective_offer_timeout_ms(&self, requested: u64) -> u64 {
        if requested != 0 {
            requested
        } else if self.default_offer_timeout_ms != 0 {
            self.default_offer_timeout_ms
        } else {
            DEFAULT_OFFER_TIMEOUT_MS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.default_chunk_size, 1024);
        assert_eq!(cfg.default_offer_timeout_ms, 5000);
        assert!(cfg.show_relative_path);
        assert!(!cfg.show_shared_path);
    }

    #[test]
    fn effective_timeout_falls_back_to_configured_default() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.effective_offer_timeout_ms(0), 5000);
        assert_eq!(cfg.effective_offer_timeout_ms(250), 250);
    }
}
