/// Block edge length in samples.
pub(crate) const BLOCK_WIDTH: usize = 8;

/// Parsed SOF0 segment.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
    /// Y: Number of lines -- Specifies the maximum number of lines in the source image.
    pub image_height: usize,

    /// X: Number of samples per line -- Specifies the maximum number of samples per line in the
    /// source image.
    pub image_width: usize,

    /// One entry per frame component, in the order the frame declares them. There are between 1
    /// and 4 of them.
    pub components: Vec<Component>,
}

impl FrameHeader {
    /// Columns of the MCU grid, one 8x8 block per component per cell.
    pub fn mcu_columns(&self) -> usize {
        self.image_width.div_ceil(BLOCK_WIDTH)
    }

    pub fn mcu_rows(&self) -> usize {
        self.image_height.div_ceil(BLOCK_WIDTH)
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn component_index(&self, component_id: u8) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.component_id == component_id)
    }
}

/// One of the two-dimensional arrays which comprise an image
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Ci: Assigns a unique label to the ith component in the sequence of frame component
    /// specification parameters. These values shall be used in the scan headers to identify the
    /// components in the scan.
    pub component_id: u8,

    /// Hi: recorded but not used for block layout, every component gets exactly one block per
    /// MCU cell.
    pub horizontal_scaling_factor: u8,

    /// Vi: recorded but not used for block layout, see `horizontal_scaling_factor`.
    pub vertical_scaling_factor: u8,

    /// Tqi: Specifies one of four possible quantization destinations from which the
    /// quantization table to use for dequantization of DCT coefficients of component Ci is
    /// retrieved.
    pub qt_table_id: u8,
}

impl Component {
    pub(crate) fn from(
        component_id: u8,
        horizontal_sf: u8,
        vertical_sf: u8,
        qt_table_id: u8,
    ) -> Self {
        Component {
            component_id,
            horizontal_scaling_factor: horizontal_sf,
            vertical_scaling_factor: vertical_sf,
            qt_table_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_mcu_grid_rounds_up() -> Result<()> {
        let frame_header = FrameHeader {
            image_height: 763,
            image_width: 640,
            components: vec![Component::from(1, 2, 2, 0)],
        };

        assert_eq!(frame_header.mcu_columns(), 80);
        assert_eq!(frame_header.mcu_rows(), 96);
        assert_eq!(frame_header.component_index(1), Some(0));
        assert_eq!(frame_header.component_index(2), None);

        Ok(())
    }
}
