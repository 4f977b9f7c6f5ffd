//! Fast, approximate previews of baseline JPEG files built from the DC coefficient of every
//! block, plus the frame comparison helpers a motion detector needs.

/// The decoder takes a memory-mapped JPEG file, parses its headers and the DC terms of its
/// first scan, and produces one flat 8x8 block per MCU cell.
pub mod decoder;

pub mod cache;
pub mod error;
pub mod loader;
pub mod motion;

mod bitreader;
mod block_grid;
mod coding;
mod entropy_decoder;
pub(crate) mod frame_header;
pub(crate) mod huffman_table;
pub(crate) mod marker;
pub(crate) mod parser;
mod probe;
pub(crate) mod quantization_table;
pub(crate) mod sample_precision;
pub(crate) mod scan_header;

#[cfg(test)]
mod test_utils;

pub use block_grid::PixelBuffer;
pub use cache::{DecodeCache, DecodeMode};
pub use decoder::{decode_dc_preview, probe_compatibility, Decoder, Limits};
pub use error::DecodeError;
pub use frame_header::{Component, FrameHeader};
pub use loader::{load_image, LoadOptions, LoadedImage};
pub use motion::MotionParams;
