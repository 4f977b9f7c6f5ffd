pub(crate) enum MarkerType {
    Segment,
    StandAlone,
}

/// The marker codes the preview decoder distinguishes. Everything else is carried as `Other` and
/// skipped by its declared length.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Marker {
    /// Start of image
    SOI,

    /// End of image
    EOI,

    /// Start of Frame, any of SOF0..SOF15. The low nibble of the code picks the coding process;
    /// 0 is baseline DCT.
    SOF(u8),

    /// Huffman table specification
    DHT,

    /// Define quantization table(s)
    DQT,

    /// Start of scan
    SOS,

    /// Define restart interval
    DRI,

    /// Restart with modulo 8 count "M"
    RST(u8),

    /// Reserved for application segments
    APP(u8),

    /// Comment
    COM,

    /// For temporary private use in arithmetic coding
    TEM,

    Other(u8),
}

impl Marker {
    pub(crate) const GLOBAL: u8 = 0xFF;
    pub(crate) const STUFF: u8 = 0x00;
    pub(crate) const SIZE: usize = 2;

    pub(crate) fn from_low_byte(b: u8) -> Self {
        match b {
            0xD8 => Marker::SOI,
            0xD9 => Marker::EOI,
            0xC4 => Marker::DHT,
            // JPG and DAC live inside the SOF range but are not frame markers.
            0xC8 | 0xCC => Marker::Other(b),
            0xC0..=0xCF => Marker::SOF(b & 0x0F),
            0xDA => Marker::SOS,
            0xDB => Marker::DQT,
            0xDD => Marker::DRI,
            0xD0..=0xD7 => Marker::RST(b & 0x07),
            0xE0..=0xEF => Marker::APP(b & 0x0F),
            0xFE => Marker::COM,
            0x01 => Marker::TEM,
            _ => Marker::Other(b),
        }
    }

    pub(crate) fn low_byte(&self) -> u8 {
        match self {
            Marker::SOI => 0xD8,
            Marker::EOI => 0xD9,
            Marker::SOF(n) => 0xC0 | n,
            Marker::DHT => 0xC4,
            Marker::DQT => 0xDB,
            Marker::SOS => 0xDA,
            Marker::DRI => 0xDD,
            Marker::RST(m) => 0xD0 | m,
            Marker::APP(n) => 0xE0 | n,
            Marker::COM => 0xFE,
            Marker::TEM => 0x01,
            Marker::Other(b) => *b,
        }
    }

    /// Some markers stand alone, that is, which is not the start of a marker segment.
    pub(crate) fn is_segment(&self) -> MarkerType {
        match self {
            Marker::RST(_) | Marker::SOI | Marker::EOI | Marker::TEM => MarkerType::StandAlone,
            _ => MarkerType::Segment,
        }
    }

    pub(crate) fn to_u16(&self) -> u16 {
        u16::from_be_bytes([Marker::GLOBAL, self.low_byte()])
    }
}
