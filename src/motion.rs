use crate::block_grid::PixelBuffer;
use anyhow::{bail, Result};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MotionParams {
    /// A sample has changed once it differs by more than this.
    pub pixel_threshold: u8,

    /// Only every `step`-th pixel of every `step`-th row is compared.
    pub step: usize,

    /// Compare the luma of RGB pixels instead of each channel.
    pub grayscale: bool,

    pub blur: bool,

    /// Percentage of changed pixels from which on a pair counts as motion.
    pub motion_threshold: f32,
}

impl Default for MotionParams {
    fn default() -> Self {
        MotionParams {
            pixel_threshold: 25,
            step: 1,
            grayscale: true,
            blur: false,
            motion_threshold: 1.0,
        }
    }
}

/// Integer BT.601 luma with weights summing to 256.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

/// Single channel copy of an RGB or RGBA buffer, alpha is dropped. Other layouts are returned
/// unchanged.
pub fn to_grayscale(src: &PixelBuffer) -> PixelBuffer {
    if !matches!(src.channels, 3 | 4) {
        return src.clone();
    }

    let pixels = src
        .pixels
        .par_chunks_exact(src.channels)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect();

    PixelBuffer {
        width: src.width,
        height: src.height,
        channels: 1,
        pixels,
    }
}

/// 3x3 box blur. The outermost rows and columns are copied through.
pub fn blur_3x3(src: &PixelBuffer) -> PixelBuffer {
    let (width, height, channels) = (src.width, src.height, src.channels);
    let mut dst = src.clone();

    if width < 3 || height < 3 || src.pixels.len() != width * height * channels {
        return dst;
    }

    let stride = width * channels;
    dst.pixels
        .par_chunks_exact_mut(stride)
        .enumerate()
        .skip(1)
        .take(height - 2)
        .for_each(|(y, row)| {
            for x in 1..width - 1 {
                for c in 0..channels {
                    let mut sum = 0u32;
                    for ny in y - 1..=y + 1 {
                        for nx in x - 1..=x + 1 {
                            sum += src.pixels[ny * stride + nx * channels + c] as u32;
                        }
                    }
                    row[x * channels + c] = (sum / 9) as u8;
                }
            }
        });

    dst
}

/// Share of sampled pixels, in percent, that changed between `a` and `b`.
pub fn motion_percentage(a: &PixelBuffer, b: &PixelBuffer, params: &MotionParams) -> Result<f32> {
    if (a.width, a.height, a.channels) != (b.width, b.height, b.channels) {
        bail!(
            "images must have the same dimensions and format, got {}x{}x{} and {}x{}x{}",
            a.width,
            a.height,
            a.channels,
            b.width,
            b.height,
            b.channels
        );
    }

    let (width, channels) = (a.width, a.channels);
    for buffer in [a, b] {
        if buffer.byte_len() != width * buffer.height * channels {
            bail!(
                "{} bytes do not fit a {}x{}x{} image",
                buffer.byte_len(),
                width,
                buffer.height,
                channels
            );
        }
    }

    if width == 0 || a.height == 0 || channels == 0 {
        return Ok(0.0);
    }

    let step = params.step.max(1);
    let threshold = params.pixel_threshold as i32;
    let compare_luma = params.grayscale && channels == 3;
    let stride = width * channels;

    let (changed, checked) = a
        .pixels
        .par_chunks_exact(stride)
        .zip(b.pixels.par_chunks_exact(stride))
        .step_by(step)
        .map(|(row_a, row_b)| {
            let mut changed = 0usize;
            let mut checked = 0usize;

            for x in (0..width).step_by(step) {
                let pa = &row_a[x * channels..(x + 1) * channels];
                let pb = &row_b[x * channels..(x + 1) * channels];

                let differs = if compare_luma {
                    (luma(pa[0], pa[1], pa[2]) as i32 - luma(pb[0], pb[1], pb[2]) as i32).abs()
                        > threshold
                } else {
                    pa.iter()
                        .zip(pb)
                        .any(|(&sa, &sb)| (sa as i32 - sb as i32).abs() > threshold)
                };

                changed += differs as usize;
                checked += 1;
            }

            (changed, checked)
        })
        .reduce(|| (0, 0), |(c1, k1), (c2, k2)| (c1 + c2, k1 + k2));

    if checked == 0 {
        return Ok(0.0);
    }

    Ok(100.0 * changed as f32 / checked as f32)
}

/// Rough number of bytes of a file that are headers rather than image content.
pub fn estimate_header_size(path: &Path, file_size: u64) -> u64 {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return (file_size / 4).min(1024);
    };

    let estimate = match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => match file_size {
            0..=1999 => 600,
            2000..=9999 => 1000,
            _ => 1500,
        },
        "png" if file_size < 5000 => 200,
        "png" => 1000,
        "bmp" => 1078,
        _ => (file_size / 10).min(1024),
    };

    estimate.min(file_size / 2)
}

/// Percentage by which the content sizes of two files differ, relative to the larger one.
pub fn compare_file_sizes(a: &Path, b: &Path) -> io::Result<f32> {
    let content_size = |path: &Path| -> io::Result<u64> {
        let size = fs::metadata(path)?.len();
        Ok(size.saturating_sub(estimate_header_size(path, size)).max(1))
    };

    let (content_a, content_b) = (content_size(a)?, content_size(b)?);
    let larger = content_a.max(content_b);

    Ok(100.0 * content_a.abs_diff(content_b) as f32 / larger as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_mock;

    fn buffer(width: usize, height: usize, channels: usize, pixels: Vec<u8>) -> PixelBuffer {
        PixelBuffer {
            width,
            height,
            channels,
            pixels,
        }
    }

    #[test]
    fn test_luma() -> Result<()> {
        let test_cases = vec![
            ((0, 0, 0), 0),
            ((255, 255, 255), 255),
            ((255, 0, 0), 76),
            ((0, 255, 0), 149),
            ((0, 0, 255), 28),
            ((100, 150, 200), 140),
        ];

        for ((r, g, b), expected) in test_cases {
            assert_eq!(luma(r, g, b), expected);
        }

        Ok(())
    }

    #[test]
    fn test_to_grayscale() -> Result<()> {
        let rgba = buffer(2, 1, 4, vec![255, 255, 255, 0, 255, 0, 0, 255]);
        let gray = to_grayscale(&rgba);

        assert_eq!(gray, buffer(2, 1, 1, vec![255, 76]));

        let already = buffer(1, 1, 1, vec![9]);
        assert_eq!(to_grayscale(&already), already);

        Ok(())
    }

    #[test]
    fn test_blur_interior_only() -> Result<()> {
        let mut pixels = vec![0u8; 16];
        pixels[5] = 90;
        let src = buffer(4, 4, 1, pixels);

        let blurred = blur_3x3(&src);

        #[rustfmt::skip]
        let expected = vec![
            0, 0, 0, 0,
            0, 10, 10, 0,
            0, 10, 10, 0,
            0, 0, 0, 0,
        ];
        assert_eq!(blurred.pixels, expected);

        // borders are copied, even when they would blur
        let mut pixels = vec![0u8; 9];
        pixels[0] = 200;
        let blurred = blur_3x3(&buffer(3, 3, 1, pixels));
        assert_eq!(blurred.pixels[0], 200);
        assert_eq!(blurred.pixels[4], 22);

        Ok(())
    }

    #[test]
    fn test_motion_percentage() -> Result<()> {
        let a = buffer(4, 1, 1, vec![10, 10, 10, 10]);
        let b = buffer(4, 1, 1, vec![10, 36, 35, 200]);

        let params = MotionParams::default();
        assert_eq!(motion_percentage(&a, &b, &params)?, 50.0);
        assert_eq!(motion_percentage(&a, &a, &params)?, 0.0);

        // every second pixel: (10, 10) and (10, 35)
        let sparse = MotionParams { step: 2, ..params };
        assert_eq!(motion_percentage(&a, &b, &sparse)?, 0.0);

        Ok(())
    }

    #[test]
    fn test_motion_compares_luma_or_channels() -> Result<()> {
        // luma barely moves while red and blue swap
        let a = buffer(1, 1, 3, vec![0, 128, 60]);
        let b = buffer(1, 1, 3, vec![60, 128, 0]);

        let params = MotionParams::default();
        assert_eq!(motion_percentage(&a, &b, &params)?, 0.0);

        let per_channel = MotionParams {
            grayscale: false,
            ..params
        };
        assert_eq!(motion_percentage(&a, &b, &per_channel)?, 100.0);

        Ok(())
    }

    #[test]
    fn test_motion_rejects_mismatched_images() -> Result<()> {
        let a = buffer(2, 2, 1, vec![0; 4]);
        let b = buffer(4, 1, 1, vec![0; 4]);
        assert!(motion_percentage(&a, &b, &MotionParams::default()).is_err());

        let c = buffer(2, 2, 3, vec![0; 12]);
        assert!(motion_percentage(&a, &c, &MotionParams::default()).is_err());

        Ok(())
    }

    #[test]
    fn test_estimate_header_size() -> Result<()> {
        let test_cases = vec![
            ("frame.jpg", 1_500, 600),
            ("frame.JPEG", 5_000, 1000),
            ("frame.jpg", 50_000, 1500),
            ("frame.jpg", 800, 400),
            ("frame.png", 4_000, 200),
            ("frame.png", 40_000, 1000),
            ("frame.bmp", 100_000, 1078),
            ("frame.webp", 5_000, 500),
            ("frame.webp", 50_000, 1024),
            ("frame", 2_000, 500),
            ("frame", 20_000, 1024),
        ];

        for (name, size, expected) in test_cases {
            assert_eq!(estimate_header_size(Path::new(name), size), expected, "{name} {size}");
        }

        Ok(())
    }

    #[test]
    fn test_compare_file_sizes() -> Result<()> {
        let a = write_mock("sizes_a.bmp", &[0u8; 3078])?;
        let b = write_mock("sizes_b.bmp", &[0u8; 5078])?;

        // 2000 and 4000 bytes of content
        assert_eq!(compare_file_sizes(&a, &b)?, 50.0);
        assert_eq!(compare_file_sizes(&b, &a)?, 50.0);
        assert_eq!(compare_file_sizes(&a, &a)?, 0.0);

        assert!(compare_file_sizes(&a, Path::new("/nonexistent/frame.bmp")).is_err());

        Ok(())
    }
}
