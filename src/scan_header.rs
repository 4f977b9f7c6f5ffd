use crate::frame_header::FrameHeader;

/// Parsed SOS segment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScanHeader {
    pub(crate) scan_component_selectors: Vec<ScanComponentSelector>,

    /// Ss: first DCT coefficient in zig-zag order coded in the scan, zero for sequential DCT.
    pub(crate) start_of_spectral: u8,

    /// Se: last DCT coefficient in zig-zag order coded in the scan, 63 for sequential DCT.
    pub(crate) end_of_spectral: u8,

    /// Ah
    pub(crate) successive_approx_bit_position_high: u8,

    /// Al
    pub(crate) point_transform: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScanComponentSelector {
    /// Selects which of the components specified in the frame parameters shall be the jth
    /// component in the scan.
    pub(crate) component_id: u8,

    /// Specifies the DC entropy coding table destination for component selector j.
    pub(crate) dc_destination_id: u8,

    /// Specifies the AC entropy coding table destination. Parsed, never used.
    pub(crate) ac_destination_id: u8,
}

impl ScanComponentSelector {
    pub(crate) fn from(component_id: u8, dc_destination_id: u8, ac_destination_id: u8) -> Self {
        Self {
            component_id,
            dc_destination_id,
            ac_destination_id,
        }
    }
}

/// DC table selector per frame component, in frame order. `None` for components the scan does
/// not carry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScanComponentMap {
    pub(crate) dc_table_ids: Vec<Option<u8>>,
}

impl ScanComponentMap {
    pub(crate) fn resolve(frame_header: &FrameHeader, scan_header: &ScanHeader) -> Self {
        let dc_table_ids = frame_header
            .components
            .iter()
            .map(|component| {
                scan_header
                    .scan_component_selectors
                    .iter()
                    .find(|s| s.component_id == component.component_id)
                    .map(|s| s.dc_destination_id)
            })
            .collect();

        ScanComponentMap { dc_table_ids }
    }
}
