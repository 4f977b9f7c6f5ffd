use crate::block_grid::{BlockGrid, PixelBuffer};
use crate::cache::{DecodeCache, DecodeMode};
use crate::error::{DecodeError, Result};
use crate::parser::Parser;
use crate::probe::{probe_bytes, Compatibility};
use log::{debug, info};
use memmap::Mmap;
use std::fs::File;
use std::path::Path;

pub const DEFAULT_MAX_MCUS_PER_AXIS: usize = 1000;
pub const DEFAULT_MAX_OUTPUT_BYTES: u64 = 16 * 1024 * 1024;

/// Bounds a decode must stay within before anything is allocated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Largest MCU grid dimension, checked when the frame header is parsed.
    pub max_mcus_per_axis: usize,

    /// Largest preview buffer in bytes.
    pub max_output_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_mcus_per_axis: DEFAULT_MAX_MCUS_PER_AXIS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// DC-only decoder over a memory-mapped JPEG file.
pub struct Decoder {
    /// `None` for empty files, which cannot be mapped.
    mmap: Option<Mmap>,
    limits: Limits,
}

impl Decoder {
    pub fn from_file(file: File) -> Result<Self> {
        let mmap = match file.metadata()?.len() {
            0 => None,
            _ => Some(unsafe { Mmap::map(&file)? }),
        };

        Ok(Decoder {
            mmap,
            limits: Limits::default(),
        })
    }

    pub fn from_file_path(file_path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(file_path)?;
        Decoder::from_file(file)
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }

    pub(crate) fn probe(&self) -> Compatibility {
        probe_bytes(self.data(), self.limits)
    }

    /// True when headers parse through the first scan and the preview fits the limits.
    pub fn is_compatible(&self) -> bool {
        let compatibility = self.probe();
        match &compatibility {
            Compatibility::Compatible(frame_header) => debug!(
                "probe: {}x{} frame with {} components",
                frame_header.image_width,
                frame_header.image_height,
                frame_header.components.len()
            ),
            Compatibility::NotJpeg => debug!("probe: not a JPEG"),
            Compatibility::Invalid(err) => debug!("probe: {}", err),
        }

        compatibility.is_compatible()
    }

    /// Decodes the first scan into an image with one pixel per 8x8 block, scaled back up so
    /// every block is a flat square of its DC intensity.
    pub fn decode(&self) -> Result<PixelBuffer> {
        let data = self.data();
        if data.is_empty() {
            return Err(DecodeError::header("not a JPEG: empty file"));
        }

        let mut parser = Parser::new(data, self.limits);
        let frame_header = parser.parse_headers()?;

        // sized before any entropy decoding so oversized frames fail without work
        let block_grid = BlockGrid::for_frame(&frame_header, &self.limits)?;
        let dc_grid = parser.decode_scan()?;

        Ok(block_grid.fill(&dc_grid))
    }
}

/// Whether `path` can be decoded with [`decode_dc_preview`]. A `false` answer means a DC-only
/// decode should not be attempted.
pub fn probe_compatibility(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();

    match Decoder::from_file_path(path) {
        Ok(decoder) => decoder.is_compatible(),
        Err(err) => {
            debug!("probe: cannot open {}: {}", path.display(), err);
            false
        }
    }
}

/// Decodes a blocky preview of a baseline JPEG from its DC coefficients only. With a `cache`,
/// a previous DC-only result for the same path is returned instead, and a fresh result is kept.
pub fn decode_dc_preview(
    path: impl AsRef<Path>,
    cache: Option<&mut DecodeCache>,
) -> Result<PixelBuffer> {
    let path = path.as_ref();
    let mut cache = cache;

    if let Some(buffer) = cache
        .as_deref_mut()
        .and_then(|cache| cache.lookup(path, DecodeMode::DcOnly))
    {
        return Ok(buffer);
    }

    let buffer = Decoder::from_file_path(path)?.decode()?;
    info!(
        "DC preview of {}: {}x{}x{}",
        path.display(),
        buffer.width,
        buffer.height,
        buffer.channels
    );

    if let Some(cache) = cache {
        cache.store(path, DecodeMode::DcOnly, &buffer);
    }

    Ok(buffer)
}
