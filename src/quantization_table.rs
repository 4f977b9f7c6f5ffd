use crate::sample_precision::SamplePrecision;

pub(crate) const QUANTIZATION_TABLE_ELEMENTS: usize = 64;

/// The set of 64 quantization values used to quantize the DCT coefficients
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuantizationTable {
    /// Specifies the precision of the qk values. Value 0 indicates 8-bit Qk values; value 1
    /// indicates 16-bit Qk values.
    pub(crate) precision: SamplePrecision,

    /// Specifies one of four possible destinations at the decoder into which the quantization
    /// table shall be installed.
    pub(crate) table_destination_id: u8,

    /// Specifies the kth element out of 64 elements, where k is the index in the zig-zag
    /// ordering of the DCT coefficients.
    pub(crate) quantization_table_element: [u16; QUANTIZATION_TABLE_ELEMENTS],
}

impl QuantizationTable {
    pub(crate) fn from(
        table_destination_id: u8,
        precision: SamplePrecision,
        quantization_table_element: [u16; QUANTIZATION_TABLE_ELEMENTS],
    ) -> Self {
        QuantizationTable {
            precision,
            table_destination_id,
            quantization_table_element,
        }
    }

    /// Q0, the only element the DC-only decode consumes.
    pub(crate) fn dc_step(&self) -> u16 {
        self.quantization_table_element[0]
    }
}
