use crate::block_grid::PixelBuffer;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Results above this size are handed back but never kept.
pub const DEFAULT_MAX_CACHED_BYTES: usize = 10 * 1024 * 1024;

/// How an image was (or is to be) loaded. Cache entries are tagged with it so a reduced decode
/// is never mistaken for a full one.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DecodeMode {
    #[default]
    Full,
    Half,
    Quarter,
    Eighth,
    DcOnly,
}

impl DecodeMode {
    /// Downscale applied after a full decode. A DC-only decode is already 1/8 in each axis.
    pub fn scale_factor(&self) -> usize {
        match self {
            DecodeMode::Full | DecodeMode::DcOnly => 1,
            DecodeMode::Half => 2,
            DecodeMode::Quarter => 4,
            DecodeMode::Eighth => 8,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    path: PathBuf,
    mode: DecodeMode,
    buffer: PixelBuffer,
}

/// Holds the most recent decode of a single (path, mode) pair.
///
/// Not synchronized. Threads that want caching own their own instance.
#[derive(Debug, Clone)]
pub struct DecodeCache {
    slot: Option<CacheEntry>,
    max_cached_bytes: usize,
}

impl Default for DecodeCache {
    fn default() -> Self {
        DecodeCache::with_max_cached_bytes(DEFAULT_MAX_CACHED_BYTES)
    }
}

impl DecodeCache {
    pub fn new() -> Self {
        DecodeCache::default()
    }

    pub fn with_max_cached_bytes(max_cached_bytes: usize) -> Self {
        DecodeCache {
            slot: None,
            max_cached_bytes,
        }
    }

    /// Returns a copy of the cached buffer if both `path` and `mode` match. Any other request
    /// evicts the slot.
    pub fn lookup(&mut self, path: &Path, mode: DecodeMode) -> Option<PixelBuffer> {
        match &self.slot {
            Some(entry) if entry.path == path && entry.mode == mode => {
                info!("cache hit for {} ({:?})", path.display(), mode);
                Some(entry.buffer.clone())
            }
            Some(entry) => {
                debug!(
                    "evicting {} ({:?}) for {} ({:?})",
                    entry.path.display(),
                    entry.mode,
                    path.display(),
                    mode
                );
                self.slot = None;
                None
            }
            None => None,
        }
    }

    /// Replaces the slot with `buffer`. Returns false, leaving the cache empty, when the buffer
    /// is larger than the cache accepts.
    pub fn store(&mut self, path: &Path, mode: DecodeMode, buffer: &PixelBuffer) -> bool {
        if buffer.byte_len() > self.max_cached_bytes {
            debug!(
                "not caching {} bytes for {}, limit is {}",
                buffer.byte_len(),
                path.display(),
                self.max_cached_bytes
            );
            self.slot = None;
            return false;
        }

        self.slot = Some(CacheEntry {
            path: path.to_path_buf(),
            mode,
            buffer: buffer.clone(),
        });

        true
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}
