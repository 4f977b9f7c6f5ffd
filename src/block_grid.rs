use crate::decoder::Limits;
use crate::error::{DecodeError, Result};
use crate::frame_header::{FrameHeader, BLOCK_WIDTH};

/// Intensity of blocks that were never decoded.
pub(crate) const NEUTRAL_GRAY: u8 = 128;

/// Decoded image samples, row-major with the channels of a pixel stored next to each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    /// Samples of the pixel at (x, y).
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let start = (y * self.width + x) * self.channels;
        self.pixels.get(start..start + self.channels)
    }
}

/// One intensity per (MCU row, MCU column, component), `None` where the entropy decoder produced
/// nothing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DcGrid {
    pub(crate) grid_width: usize,
    pub(crate) grid_height: usize,
    pub(crate) num_components: usize,
    cells: Vec<Option<u8>>,
}

impl DcGrid {
    pub(crate) fn new(grid_width: usize, grid_height: usize, num_components: usize) -> Self {
        DcGrid {
            grid_width,
            grid_height,
            num_components,
            cells: vec![None; grid_width * grid_height * num_components],
        }
    }

    fn index(&self, row: usize, column: usize, component: usize) -> Option<usize> {
        if row >= self.grid_height || column >= self.grid_width || component >= self.num_components
        {
            return None;
        }

        Some((row * self.grid_width + column) * self.num_components + component)
    }

    pub(crate) fn get(&self, row: usize, column: usize, component: usize) -> Option<u8> {
        self.index(row, column, component)
            .and_then(|i| self.cells.get(i).copied().flatten())
    }

    pub(crate) fn set(&mut self, row: usize, column: usize, component: usize, value: u8) {
        if let Some(cell) = self
            .index(row, column, component)
            .and_then(|i| self.cells.get_mut(i))
        {
            *cell = Some(value);
        }
    }
}

/// Geometry of the output buffer: one 8x8 block per MCU cell, every component interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockGrid {
    grid_width: usize,
    grid_height: usize,
    channels: usize,
    byte_len: usize,
}

impl BlockGrid {
    /// Fails when the buffer would exceed `limits.max_output_bytes`. The size is computed in
    /// 64-bit arithmetic so no allocation is attempted for oversized frames.
    pub(crate) fn new(
        grid_width: usize,
        grid_height: usize,
        channels: usize,
        limits: &Limits,
    ) -> Result<Self> {
        let block = BLOCK_WIDTH as u64;
        let byte_len = (grid_width as u64 * block)
            .checked_mul(grid_height as u64 * block)
            .and_then(|samples| samples.checked_mul(channels as u64))
            .filter(|&len| len <= limits.max_output_bytes)
            .ok_or_else(|| {
                DecodeError::ResourceLimitExceeded(format!(
                    "{}x{} block grid with {} channels needs more than {} bytes",
                    grid_width, grid_height, channels, limits.max_output_bytes
                ))
            })?;

        Ok(BlockGrid {
            grid_width,
            grid_height,
            channels,
            byte_len: byte_len as usize,
        })
    }

    pub(crate) fn for_frame(frame_header: &FrameHeader, limits: &Limits) -> Result<Self> {
        BlockGrid::new(
            frame_header.mcu_columns(),
            frame_header.mcu_rows(),
            frame_header.num_components(),
            limits,
        )
    }

    pub(crate) fn width(&self) -> usize {
        self.grid_width * BLOCK_WIDTH
    }

    pub(crate) fn height(&self) -> usize {
        self.grid_height * BLOCK_WIDTH
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.byte_len
    }

    fn row_stride(&self) -> usize {
        self.width() * self.channels
    }

    /// Paints every block with its cell's intensity. Cells without a value stay gray.
    pub(crate) fn fill(&self, dc_grid: &DcGrid) -> PixelBuffer {
        let mut pixels = vec![NEUTRAL_GRAY; self.byte_len];

        for row in 0..self.grid_height.min(dc_grid.grid_height) {
            for column in 0..self.grid_width.min(dc_grid.grid_width) {
                let Some(offset) = BlockOffset::new(self, row, column) else {
                    continue;
                };

                for component in 0..self.channels.min(dc_grid.num_components) {
                    if let Some(value) = dc_grid.get(row, column, component) {
                        offset.paint(&mut pixels, component, value);
                    }
                }
            }
        }

        PixelBuffer {
            width: self.width(),
            height: self.height(),
            channels: self.channels,
            pixels,
        }
    }
}

/// Position of a block's top-left sample. Only constructed once the whole block is known to
/// lie inside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockOffset {
    start: usize,
    row_stride: usize,
    channels: usize,
}

impl BlockOffset {
    pub(crate) fn new(grid: &BlockGrid, row: usize, column: usize) -> Option<Self> {
        let block = BLOCK_WIDTH as u64;
        let row_stride = grid.row_stride() as u64;
        let channels = grid.channels as u64;

        let start = (row as u64)
            .checked_mul(block * row_stride)?
            .checked_add((column as u64).checked_mul(block * channels)?)?;
        let end = start
            .checked_add((block - 1) * row_stride)?
            .checked_add(block * channels)?;

        if end > grid.byte_len as u64 {
            return None;
        }

        Some(BlockOffset {
            start: start as usize,
            row_stride: grid.row_stride(),
            channels: grid.channels,
        })
    }

    fn paint(&self, pixels: &mut [u8], component: usize, value: u8) {
        if component >= self.channels {
            return;
        }

        for y in 0..BLOCK_WIDTH {
            let line = self.start + y * self.row_stride;
            let span = &mut pixels[line..line + BLOCK_WIDTH * self.channels];
            for pixel in span.chunks_exact_mut(self.channels) {
                pixel[component] = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};

    #[test]
    fn test_fill_replicates_each_cell() -> Result<()> {
        let mut dc_grid = DcGrid::new(2, 1, 1);
        dc_grid.set(0, 0, 0, 138);
        dc_grid.set(0, 1, 0, 132);

        let grid = BlockGrid::new(2, 1, 1, &Limits::default())?;
        let buffer = grid.fill(&dc_grid);

        assert_eq!((buffer.width, buffer.height, buffer.channels), (16, 8, 1));
        assert_eq!(buffer.byte_len(), 128);

        for row in buffer.pixels.chunks_exact(16) {
            assert_eq!(row[..8], [138; 8]);
            assert_eq!(row[8..], [132; 8]);
        }

        Ok(())
    }

    #[test]
    fn test_missing_cells_are_gray() -> Result<()> {
        let mut dc_grid = DcGrid::new(1, 2, 3);
        dc_grid.set(0, 0, 0, 10);
        dc_grid.set(0, 0, 2, 30);
        dc_grid.set(1, 0, 1, 50);

        let buffer = BlockGrid::new(1, 2, 3, &Limits::default())?.fill(&dc_grid);

        assert_eq!(buffer.pixel(7, 7), Some(&[10, NEUTRAL_GRAY, 30][..]));
        assert_eq!(buffer.pixel(0, 8), Some(&[NEUTRAL_GRAY, 50, NEUTRAL_GRAY][..]));
        assert_eq!(buffer.pixel(8, 0), None);

        Ok(())
    }

    #[test]
    fn test_output_size_limit() -> Result<()> {
        let limits = Limits {
            max_output_bytes: 16 * 16 * 3,
            ..Limits::default()
        };

        assert!(BlockGrid::new(2, 2, 3, &limits).is_ok());
        assert!(matches!(
            BlockGrid::new(2, 2, 4, &limits),
            Err(DecodeError::ResourceLimitExceeded(_))
        ));

        // 1000x1000 cells of four channels is 256 MB
        assert!(matches!(
            BlockGrid::new(1000, 1000, 4, &Limits::default()),
            Err(DecodeError::ResourceLimitExceeded(_))
        ));

        Ok(())
    }

    #[test]
    fn test_block_offsets_stay_in_bounds() -> Result<()> {
        let grid = BlockGrid::new(3, 2, 2, &Limits::default())?;

        let offset = BlockOffset::new(&grid, 1, 2).ok_or(anyhow!("last block is in bounds"))?;
        assert_eq!(offset.start, 8 * grid.row_stride() + 2 * 8 * 2);

        assert!(BlockOffset::new(&grid, 2, 0).is_none());
        assert!(BlockOffset::new(&grid, 0, 3).is_none());
        assert!(BlockOffset::new(&grid, usize::MAX, usize::MAX).is_none());

        Ok(())
    }
}
