use crate::block_grid::BlockGrid;
use crate::decoder::Limits;
use crate::error::DecodeError;
use crate::frame_header::FrameHeader;
use crate::marker::Marker;
use crate::parser::Parser;
use log::debug;

/// Outcome of checking whether a byte stream can be DC-decoded.
#[derive(Debug)]
pub(crate) enum Compatibility {
    /// Headers parse through the first scan and the preview fits the output limit.
    Compatible(FrameHeader),

    /// The stream does not open with SOI.
    NotJpeg,

    /// A JPEG the preview decoder rejects.
    Invalid(DecodeError),
}

impl Compatibility {
    pub(crate) fn is_compatible(&self) -> bool {
        matches!(self, Compatibility::Compatible(_))
    }
}

/// Runs the marker parser up to the first scan without touching entropy-coded data, then checks
/// the preview buffer size against `limits`.
pub(crate) fn probe_bytes(data: &[u8], limits: Limits) -> Compatibility {
    if !data.starts_with(&Marker::SOI.to_u16().to_be_bytes()) {
        return Compatibility::NotJpeg;
    }

    let mut parser = Parser::new(data, limits);
    let frame_header = match parser.parse_headers() {
        Ok(frame_header) => frame_header,
        Err(err) => return Compatibility::Invalid(err),
    };

    match BlockGrid::for_frame(&frame_header, &limits) {
        Ok(grid) => {
            debug!(
                "probe: {}x{} preview, {} bytes",
                grid.width(),
                grid.height(),
                grid.byte_len()
            );
            Compatibility::Compatible(frame_header)
        }
        Err(err) => Compatibility::Invalid(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use anyhow::Result;

    #[test]
    fn test_baseline_is_compatible() -> Result<()> {
        let data = grayscale_jpeg(20, 12, 1, "00 00 00 00 00 00");

        match probe_bytes(&data, Limits::default()) {
            Compatibility::Compatible(frame_header) => {
                assert_eq!(frame_header.image_width, 20);
                assert_eq!(frame_header.image_height, 12);
            }
            other => panic!("expected compatible, got {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn test_not_jpeg() -> Result<()> {
        assert!(matches!(probe_bytes(&[], Limits::default()), Compatibility::NotJpeg));
        assert!(matches!(
            probe_bytes(b"\x89PNG\r\n\x1a\n", Limits::default()),
            Compatibility::NotJpeg
        ));

        Ok(())
    }

    #[test]
    fn test_progressive_is_invalid() -> Result<()> {
        let data = [
            soi(),
            dqt(0, 1),
            sof(0xC2, 8, 8, &[(1, 0x11, 0)]),
            luma_dc_dht(0),
            sos(&[(1, 0x00)]),
            eoi(),
        ]
        .concat();

        let compatibility = probe_bytes(&data, Limits::default());
        assert!(matches!(
            compatibility,
            Compatibility::Invalid(DecodeError::UnsupportedFeature(_))
        ));
        assert!(!compatibility.is_compatible());

        Ok(())
    }

    #[test]
    fn test_output_limit_is_checked() -> Result<()> {
        let data = grayscale_jpeg(64, 64, 1, "00");
        let limits = Limits {
            max_output_bytes: 1024,
            ..Limits::default()
        };

        assert!(matches!(
            probe_bytes(&data, limits),
            Compatibility::Invalid(DecodeError::ResourceLimitExceeded(_))
        ));

        Ok(())
    }

    #[test]
    fn test_missing_scan_is_invalid() -> Result<()> {
        let data = [soi(), dqt(0, 1), sof0(8, 8, &[(1, 0x11, 0)]), eoi()].concat();
        assert!(matches!(
            probe_bytes(&data, Limits::default()),
            Compatibility::Invalid(DecodeError::Header(_))
        ));

        Ok(())
    }
}
