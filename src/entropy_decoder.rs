use crate::bitreader::BitReader;
use crate::block_grid::DcGrid;
use crate::frame_header::FrameHeader;
use crate::huffman_table::{HuffmanTable, MAX_CODE_LENGTH};
use crate::quantization_table::QuantizationTable;
use crate::scan_header::ScanComponentMap;
use log::{trace, warn};

/// Largest magnitude category a DC difference can take with 8-bit samples is 11. Anything above
/// 15 cannot be received into 16 bits.
const MAX_MAGNITUDE_BITS: u8 = 15;

const LEVEL_SHIFT: i64 = 128;

/// Running DC value per frame component, reset for every scan.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DcPredictor {
    values: Vec<i32>,
}

impl DcPredictor {
    pub(crate) fn new(num_components: usize) -> Self {
        DcPredictor {
            values: vec![0; num_components],
        }
    }

    /// Adds `difference` to the component's predictor, saturating at the i16 range.
    pub(crate) fn update(&mut self, component: usize, difference: i32) -> i32 {
        let value = &mut self.values[component];
        *value = value
            .saturating_add(difference)
            .clamp(i16::MIN as i32, i16::MAX as i32);
        *value
    }
}

/// EXTEND from ITU T.81 F.2.2.1: maps `size` raw bits onto a signed difference. Values whose
/// leading bit is clear are negative.
pub(crate) fn extend(value: u16, size: u8) -> i32 {
    if size == 0 {
        return 0;
    }

    let value = value as i32;
    if value < (1 << (size - 1)) {
        value - ((1 << size) - 1)
    } else {
        value
    }
}

/// Level-shifted intensity of a block whose only coefficient is `predictor`.
pub(crate) fn intensity(predictor: i32, dc_step: u16) -> u8 {
    (predictor as i64 * dc_step as i64 + LEVEL_SHIFT).clamp(0, 255) as u8
}

/// Reads the DC difference of every block in an interleaved baseline scan and turns each into a
/// single intensity.
pub(crate) struct EntropyDecoder<'r, 'a> {
    reader: &'r mut BitReader<'a>,
    frame_header: &'r FrameHeader,
    huffman_tables: &'r [Option<HuffmanTable>],
    quantization_tables: &'r [Option<QuantizationTable>],
    scan_map: &'r ScanComponentMap,
}

impl<'r, 'a> EntropyDecoder<'r, 'a> {
    pub(crate) fn new(
        reader: &'r mut BitReader<'a>,
        frame_header: &'r FrameHeader,
        huffman_tables: &'r [Option<HuffmanTable>],
        quantization_tables: &'r [Option<QuantizationTable>],
        scan_map: &'r ScanComponentMap,
    ) -> Self {
        EntropyDecoder {
            reader,
            frame_header,
            huffman_tables,
            quantization_tables,
            scan_map,
        }
    }

    pub(crate) fn decode(mut self) -> DcGrid {
        let num_components = self.frame_header.num_components();
        let mut grid = DcGrid::new(
            self.frame_header.mcu_columns(),
            self.frame_header.mcu_rows(),
            num_components,
        );

        let tables = self.component_tables();
        let skipped = tables.iter().filter(|t| t.is_none()).count();
        if skipped > 0 {
            warn!(
                "{} of {} components have no usable DC or quantization table and stay gray",
                skipped, num_components
            );
        }

        let mut predictor = DcPredictor::new(num_components);
        let mut undecodable = 0usize;
        let mut decoded = 0usize;

        'cells: for row in 0..grid.grid_height {
            for column in 0..grid.grid_width {
                for (component, tables) in tables.iter().enumerate() {
                    let Some((huffman_table, dc_step)) = tables else {
                        continue;
                    };

                    let difference = self.decode_difference(huffman_table);

                    if self.reader.is_exhausted() {
                        warn!(
                            "entropy-coded data ends at cell ({}, {}), remaining cells stay gray",
                            row, column
                        );
                        break 'cells;
                    }

                    let Some(difference) = difference else {
                        undecodable += 1;
                        continue;
                    };

                    let value = intensity(predictor.update(component, difference), *dc_step);
                    trace!(
                        "cell ({}, {}) component {}: diff {} -> {}",
                        row,
                        column,
                        component,
                        difference,
                        value
                    );

                    grid.set(row, column, component, value);
                    decoded += 1;
                }
            }
        }

        if undecodable > 0 {
            warn!("{} DC coefficients could not be decoded", undecodable);
        }
        trace!("{} DC coefficients decoded", decoded);

        grid
    }

    /// Huffman table and DC quantization step per frame component, `None` when the scan does
    /// not carry the component or either table was never defined.
    fn component_tables(&self) -> Vec<Option<(&'r HuffmanTable, u16)>> {
        let (frame_header, huffman_tables, quantization_tables) =
            (self.frame_header, self.huffman_tables, self.quantization_tables);

        frame_header
            .components
            .iter()
            .zip(&self.scan_map.dc_table_ids)
            .map(|(component, dc_table_id)| {
                let huffman_table = huffman_tables.get((*dc_table_id)? as usize)?.as_ref()?;
                let quantization_table = quantization_tables
                    .get(component.qt_table_id as usize)?
                    .as_ref()?;

                Some((huffman_table, quantization_table.dc_step()))
            })
            .collect()
    }

    fn decode_difference(&mut self, huffman_table: &HuffmanTable) -> Option<i32> {
        let size = self.decode_symbol(huffman_table)?;
        if size > MAX_MAGNITUDE_BITS {
            return None;
        }

        let bits = self.reader.receive(size);
        Some(extend(bits, size))
    }

    /// One bit at a time, checking the codes of each length before reading the next bit.
    fn decode_symbol(&mut self, huffman_table: &HuffmanTable) -> Option<u8> {
        let mut code = 0u16;

        for length in 1..=MAX_CODE_LENGTH {
            code = (code << 1) | self.reader.next_bit() as u16;

            if let Some(symbol) = huffman_table.lookup(length, code) {
                return Some(symbol);
            }
        }

        None
    }
}
