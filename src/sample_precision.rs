/// Precision of the entries of a quantization table (Pq).
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub(crate) enum SamplePrecision {
    EightBit,
    SixteenBit,
}

impl SamplePrecision {
    pub(crate) fn decode(pq: u8) -> Option<Self> {
        match pq {
            0 => Some(SamplePrecision::EightBit),
            1 => Some(SamplePrecision::SixteenBit),
            _ => None,
        }
    }

    /// Bytes per table element.
    pub(crate) fn element_bytes(&self) -> usize {
        match self {
            SamplePrecision::EightBit => 1,
            SamplePrecision::SixteenBit => 2,
        }
    }
}
