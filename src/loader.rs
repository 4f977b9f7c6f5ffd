use crate::block_grid::PixelBuffer;
use crate::cache::{DecodeCache, DecodeMode};
use crate::decoder::{decode_dc_preview, probe_compatibility};
use anyhow::{bail, Context, Result};
use log::info;
use std::path::Path;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub mode: DecodeMode,

    /// With `DecodeMode::DcOnly`, fail instead of falling back to a full decode.
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub buffer: PixelBuffer,

    /// A DC-only load that ended up going through the full image decoder.
    pub fallback_used: bool,
}

/// Loads `path` the way `options` asks, consulting and refreshing `cache` when given one.
pub fn load_image(
    path: impl AsRef<Path>,
    options: &LoadOptions,
    cache: Option<&mut DecodeCache>,
) -> Result<LoadedImage> {
    let path = path.as_ref();
    let mut cache = cache;

    if let Some(buffer) = cache
        .as_deref_mut()
        .and_then(|cache| cache.lookup(path, options.mode))
    {
        return Ok(LoadedImage {
            buffer,
            fallback_used: false,
        });
    }

    let loaded = match options.mode {
        DecodeMode::DcOnly => load_dc_only(path, options.strict)?,
        mode => LoadedImage {
            buffer: load_full(path, mode.scale_factor())?,
            fallback_used: false,
        },
    };

    if let Some(cache) = cache {
        cache.store(path, options.mode, &loaded.buffer);
    }

    Ok(loaded)
}

fn load_dc_only(path: &Path, strict: bool) -> Result<LoadedImage> {
    if strict {
        if !probe_compatibility(path) {
            bail!("{} is not compatible with JPEG DC-only mode", path.display());
        }

        let buffer = decode_dc_preview(path, None)
            .with_context(|| format!("DC-only decode of {} failed", path.display()))?;

        return Ok(LoadedImage {
            buffer,
            fallback_used: false,
        });
    }

    match decode_dc_preview(path, None) {
        Ok(buffer) => Ok(LoadedImage {
            buffer,
            fallback_used: false,
        }),
        Err(err) => {
            info!(
                "DC-only decode of {} failed ({}), loading the full image",
                path.display(),
                err
            );

            Ok(LoadedImage {
                buffer: load_full(path, 1)?,
                fallback_used: true,
            })
        }
    }
}

/// Decodes any format the `image` crate knows into one channel for luma sources and three for
/// everything else, then shrinks it by `scale_factor`.
fn load_full(path: &Path, scale_factor: usize) -> Result<PixelBuffer> {
    let img = image::open(path).with_context(|| format!("failed to load {}", path.display()))?;

    let buffer = if img.color().has_color() {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        PixelBuffer {
            width: width as usize,
            height: height as usize,
            channels: 3,
            pixels: rgb.into_raw(),
        }
    } else {
        let luma = img.to_luma8();
        let (width, height) = luma.dimensions();
        PixelBuffer {
            width: width as usize,
            height: height as usize,
            channels: 1,
            pixels: luma.into_raw(),
        }
    };

    Ok(downscale(&buffer, scale_factor))
}

/// Nearest-neighbor reduction keeping every `factor`-th pixel in both axes. Images not larger
/// than `factor` in both dimensions are returned as they are.
pub fn downscale(buffer: &PixelBuffer, factor: usize) -> PixelBuffer {
    if factor <= 1 || buffer.width <= factor || buffer.height <= factor {
        return buffer.clone();
    }

    let (width, height, channels) = (buffer.width / factor, buffer.height / factor, buffer.channels);
    let mut pixels = Vec::with_capacity(width * height * channels);

    for y in 0..height {
        for x in 0..width {
            if let Some(pixel) = buffer.pixel(x * factor, y * factor) {
                pixels.extend_from_slice(pixel);
            }
        }
    }

    PixelBuffer {
        width,
        height,
        channels,
        pixels,
    }
}
