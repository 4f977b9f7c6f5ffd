use crate::bitreader::BitReader;
use crate::block_grid::DcGrid;
use crate::coding::CodingProcess;
use crate::decoder::Limits;
use crate::entropy_decoder::EntropyDecoder;
use crate::error::{DecodeError, Result};
use crate::frame_header::{Component, FrameHeader};
use crate::huffman_table::{HuffmanClass, HuffmanTable, MAX_CODE_LENGTH};
use crate::marker::{Marker, MarkerType};
use crate::quantization_table::{QuantizationTable, QUANTIZATION_TABLE_ELEMENTS};
use crate::sample_precision::SamplePrecision;
use crate::scan_header::{ScanComponentMap, ScanComponentSelector, ScanHeader};
use log::{debug, warn};

pub(crate) const MAX_COMPONENTS: usize = 4;
pub(crate) const DC_TABLE_SLOTS: usize = 2;
pub(crate) const QUANTIZATION_TABLE_SLOTS: usize = 4;

const BASELINE_SAMPLE_PRECISION: u8 = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ParserState {
    AwaitStart,
    ReadingHeaders,
    ReadingScan,
    Done,
}

/// Big-endian cursor over one marker segment body.
struct Segment<'a> {
    marker: Marker,
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Segment<'a> {
    fn new(marker: Marker, data: &'a [u8]) -> Self {
        Segment {
            marker,
            data,
            cursor: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    fn truncated(&self) -> String {
        format!(
            "{:?} segment truncated at byte {} of {}",
            self.marker,
            self.cursor,
            self.data.len()
        )
    }

    fn u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.cursor)?;
        self.cursor += 1;
        Some(b)
    }

    fn u16(&mut self) -> Option<u16> {
        let bytes = self.bytes(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let slice = self.data.get(self.cursor..self.cursor + len)?;
        self.cursor += len;
        Some(slice)
    }
}

/// Walks the marker stream of a JPEG file and drives the DC-only decode of its first scan.
///
/// `AwaitStart -> ReadingHeaders -> ReadingScan -> Done`
pub(crate) struct Parser<'a> {
    reader: BitReader<'a>,
    state: ParserState,
    limits: Limits,
    frame_header: Option<FrameHeader>,
    scan_header: Option<ScanHeader>,
    huffman_tables: [Option<HuffmanTable>; DC_TABLE_SLOTS],
    quantization_tables: [Option<QuantizationTable>; QUANTIZATION_TABLE_SLOTS],
}

impl<'a> Parser<'a> {
    pub(crate) fn new(data: &'a [u8], limits: Limits) -> Self {
        Parser {
            reader: BitReader::new(data),
            state: ParserState::AwaitStart,
            limits,
            frame_header: None,
            scan_header: None,
            huffman_tables: Default::default(),
            quantization_tables: Default::default(),
        }
    }

    /// Parses every segment up to and including the first SOS header and leaves the reader at
    /// the start of the entropy-coded data.
    pub(crate) fn parse_headers(&mut self) -> Result<FrameHeader> {
        if self.state != ParserState::AwaitStart {
            return Err(DecodeError::header(format!(
                "headers already parsed, parser is in state {:?}",
                self.state
            )));
        }

        loop {
            let marker = self.next_marker()?;

            match (self.state, marker) {
                (ParserState::AwaitStart, Marker::SOI) => {
                    self.state = ParserState::ReadingHeaders;
                }
                (ParserState::AwaitStart, other) => {
                    return Err(DecodeError::header(format!(
                        "not a JPEG: expected SOI, found marker {:04X}",
                        other.to_u16()
                    )));
                }
                (ParserState::ReadingHeaders, Marker::SOI) => {
                    return Err(DecodeError::header("unexpected second SOI marker"));
                }
                (ParserState::ReadingHeaders, Marker::EOI) => {
                    return Err(DecodeError::header("no image data found"));
                }
                (ParserState::ReadingHeaders, Marker::SOF(nibble)) => {
                    let mut segment = self.read_segment(marker)?;
                    let frame_header = self.parse_start_of_frame(nibble, &mut segment)?;
                    self.frame_header = Some(frame_header);
                }
                (ParserState::ReadingHeaders, Marker::DHT) => {
                    let mut segment = self.read_segment(marker)?;
                    self.parse_huffman_tables(&mut segment)?;
                }
                (ParserState::ReadingHeaders, Marker::DQT) => {
                    let mut segment = self.read_segment(marker)?;
                    self.parse_quantization_tables(&mut segment)?;
                }
                (ParserState::ReadingHeaders, Marker::SOS) => {
                    let mut segment = self.read_segment(marker)?;
                    let scan_header = self.parse_start_of_scan(&mut segment)?;
                    self.scan_header = Some(scan_header);
                    self.state = ParserState::ReadingScan;

                    return self
                        .frame_header
                        .clone()
                        .ok_or_else(|| DecodeError::header("scan without frame header"));
                }
                (ParserState::ReadingHeaders, other) => match other.is_segment() {
                    MarkerType::StandAlone => debug!("ignoring standalone marker {:?}", other),
                    MarkerType::Segment => {
                        let segment = self.read_segment(other)?;
                        debug!("skipping {:?} segment, {} bytes", other, segment.remaining());
                    }
                },
                (state, other) => {
                    return Err(DecodeError::header(format!(
                        "marker {:04X} in state {:?}",
                        other.to_u16(),
                        state
                    )));
                }
            }
        }
    }

    /// Entropy decodes the scan whose header `parse_headers` stopped at. No further markers are
    /// processed afterwards.
    pub(crate) fn decode_scan(&mut self) -> Result<DcGrid> {
        if self.state != ParserState::ReadingScan {
            return Err(DecodeError::header(format!(
                "no scan to decode, parser is in state {:?}",
                self.state
            )));
        }

        let (frame_header, scan_header) = match (&self.frame_header, &self.scan_header) {
            (Some(frame_header), Some(scan_header)) => (frame_header, scan_header),
            _ => return Err(DecodeError::header("scan without frame header")),
        };

        let scan_map = ScanComponentMap::resolve(frame_header, scan_header);
        let grid = EntropyDecoder::new(
            &mut self.reader,
            frame_header,
            &self.huffman_tables,
            &self.quantization_tables,
            &scan_map,
        )
        .decode();

        debug!(
            "scan done at byte {}{}",
            self.reader.position(),
            if self.reader.at_marker() { ", stopped at a marker" } else { "" }
        );

        self.state = ParserState::Done;
        Ok(grid)
    }

    /// Reads the next marker. Fill bytes (0xFF runs) in front of a marker are skipped.
    fn next_marker(&mut self) -> Result<Marker> {
        let eos = || DecodeError::header("unexpected end of stream while reading markers");

        let high = self.reader.next_byte().ok_or_else(eos)?;
        if high != Marker::GLOBAL {
            return Err(DecodeError::header(format!(
                "expected a marker at byte {}, found {:02X}",
                self.reader.position() - 1,
                high
            )));
        }

        let mut low = self.reader.next_byte().ok_or_else(eos)?;
        while low == Marker::GLOBAL && self.state != ParserState::AwaitStart {
            low = self.reader.next_byte().ok_or_else(eos)?;
        }

        if low == Marker::STUFF {
            return Err(DecodeError::header("stuffed zero byte outside of scan data"));
        }

        Ok(Marker::from_low_byte(low))
    }

    fn read_segment(&mut self, marker: Marker) -> Result<Segment<'a>> {
        let length = self.reader.next_u16().ok_or_else(|| {
            DecodeError::header(format!("{:?} segment length missing", marker))
        })? as usize;

        if length < 2 {
            return Err(DecodeError::header(format!(
                "{:?} segment declares length {}, at least 2 required",
                marker, length
            )));
        }

        let data = self.reader.take(length - 2).ok_or_else(|| {
            DecodeError::header(format!(
                "{:?} segment of {} bytes runs past the end of the file",
                marker, length
            ))
        })?;

        Ok(Segment::new(marker, data))
    }

    fn parse_start_of_frame(&self, nibble: u8, segment: &mut Segment) -> Result<FrameHeader> {
        let schema = CodingProcess::schema(nibble)
            .ok_or_else(|| DecodeError::header(format!("SOF{} is not a frame marker", nibble)))?;

        if !schema.is_baseline() {
            return Err(DecodeError::UnsupportedFeature(format!(
                "{:?} frame ({:?} operation, {:?} coding{})",
                schema.process,
                schema.operation,
                schema.entropy_coding,
                if schema.differential { ", differential" } else { "" }
            )));
        }

        if self.frame_header.is_some() {
            return Err(DecodeError::header("multiple frames are not supported"));
        }

        let (precision, image_height, image_width, num_components) =
            match (segment.u8(), segment.u16(), segment.u16(), segment.u8()) {
                (Some(p), Some(y), Some(x), Some(nf)) => (p, y as usize, x as usize, nf as usize),
                _ => return Err(DecodeError::header(segment.truncated())),
            };

        if precision != BASELINE_SAMPLE_PRECISION {
            return Err(DecodeError::UnsupportedFeature(format!(
                "{precision}-bit sample precision"
            )));
        }

        if image_width == 0 || image_height == 0 {
            return Err(DecodeError::header(format!(
                "invalid image dimensions {image_width}x{image_height}"
            )));
        }

        if num_components == 0 || num_components > MAX_COMPONENTS {
            return Err(DecodeError::header(format!(
                "{num_components} components declared, between 1 and {MAX_COMPONENTS} supported"
            )));
        }

        if segment.remaining() != num_components * 3 {
            return Err(DecodeError::header(format!(
                "SOF segment carries {} component bytes, expected {}",
                segment.remaining(),
                num_components * 3
            )));
        }

        let mut components = Vec::with_capacity(num_components);
        for _ in 0..num_components {
            let bytes = segment
                .bytes(3)
                .ok_or_else(|| DecodeError::header(segment.truncated()))?;

            let (component_id, sampling_factor, qt_table_id) = (bytes[0], bytes[1], bytes[2]);
            let (horizontal_factor, vertical_factor) =
                (sampling_factor >> 4, sampling_factor & 0b1111);

            components.push(Component::from(
                component_id,
                horizontal_factor,
                vertical_factor,
                qt_table_id,
            ));
        }

        let frame_header = FrameHeader {
            image_height,
            image_width,
            components,
        };

        let (columns, rows) = (frame_header.mcu_columns(), frame_header.mcu_rows());
        if columns > self.limits.max_mcus_per_axis || rows > self.limits.max_mcus_per_axis {
            return Err(DecodeError::ResourceLimitExceeded(format!(
                "MCU grid {columns}x{rows} exceeds {} per axis",
                self.limits.max_mcus_per_axis
            )));
        }

        debug!(
            "SOF0: {}x{}, {} components, MCU grid {}x{}",
            image_width, image_height, num_components, columns, rows
        );

        Ok(frame_header)
    }

    /// Reads DC table definitions until the segment ends. The first AC definition ends the
    /// segment, its bytes and everything after it are left unread.
    fn parse_huffman_tables(&mut self, segment: &mut Segment) -> Result<()> {
        while segment.remaining() > 0 {
            let information = segment
                .u8()
                .ok_or_else(|| DecodeError::table(segment.truncated()))?;

            let (ht_class, destination_id) = (information >> 4, information & 0b1111);

            let class = HuffmanClass::from(ht_class).ok_or_else(|| {
                DecodeError::table(format!("invalid huffman table class {ht_class}"))
            })?;

            if class == HuffmanClass::AC {
                debug!(
                    "DHT: AC table {} ends the segment, {} bytes left unread",
                    destination_id,
                    segment.remaining()
                );
                break;
            }

            let counts: [u8; MAX_CODE_LENGTH] = segment
                .bytes(MAX_CODE_LENGTH)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| DecodeError::table(segment.truncated()))?;

            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let symbols = segment
                .bytes(total)
                .ok_or_else(|| {
                    DecodeError::table(format!(
                        "huffman table {destination_id} declares {total} symbols, only {} bytes left",
                        segment.remaining()
                    ))
                })?
                .to_vec();

            let table = HuffmanTable::from(class, destination_id, counts, symbols)?;

            match self.huffman_tables.get_mut(destination_id as usize) {
                Some(slot) => {
                    debug!(
                        "DHT: {:?} table {} with {} symbols",
                        table.class, destination_id, total
                    );
                    *slot = Some(table);
                }
                None => warn!(
                    "DHT: discarding DC table {}, only ids below {} are used",
                    table.destination_id, DC_TABLE_SLOTS
                ),
            }
        }

        Ok(())
    }

    fn parse_quantization_tables(&mut self, segment: &mut Segment) -> Result<()> {
        if segment.remaining() == 0 {
            return Err(DecodeError::table("empty DQT segment"));
        }

        while segment.remaining() > 0 {
            let information = segment
                .u8()
                .ok_or_else(|| DecodeError::table(segment.truncated()))?;

            let (pq, table_id) = (information >> 4, information & 0b1111);

            let precision = SamplePrecision::decode(pq).ok_or_else(|| {
                DecodeError::table(format!("invalid quantization table precision {pq}"))
            })?;

            if table_id as usize >= QUANTIZATION_TABLE_SLOTS {
                return Err(DecodeError::table(format!(
                    "quantization table id {table_id} out of range"
                )));
            }

            let bytes = segment
                .bytes(QUANTIZATION_TABLE_ELEMENTS * precision.element_bytes())
                .ok_or_else(|| DecodeError::table(segment.truncated()))?;

            let mut elements = [0u16; QUANTIZATION_TABLE_ELEMENTS];
            match precision {
                SamplePrecision::EightBit => {
                    for (element, &b) in elements.iter_mut().zip(bytes) {
                        *element = b as u16;
                    }
                }
                SamplePrecision::SixteenBit => {
                    for (element, pair) in elements.iter_mut().zip(bytes.chunks_exact(2)) {
                        *element = u16::from_be_bytes([pair[0], pair[1]]);
                    }
                }
            }

            let table = QuantizationTable::from(table_id, precision, elements);
            debug!(
                "DQT: table {} ({:?}), DC step {}",
                table.table_destination_id,
                table.precision,
                table.dc_step()
            );
            self.quantization_tables[table_id as usize] = Some(table);
        }

        Ok(())
    }

    fn parse_start_of_scan(&self, segment: &mut Segment) -> Result<ScanHeader> {
        let frame_header = self
            .frame_header
            .as_ref()
            .ok_or_else(|| DecodeError::header("SOS before SOF"))?;

        let num_components = segment
            .u8()
            .ok_or_else(|| DecodeError::header(segment.truncated()))? as usize;

        if num_components == 0 || num_components > MAX_COMPONENTS {
            return Err(DecodeError::header(format!(
                "scan declares {num_components} components"
            )));
        }

        let mut scan_component_selectors = Vec::with_capacity(num_components);
        for _ in 0..num_components {
            let bytes = segment
                .bytes(2)
                .ok_or_else(|| DecodeError::header(segment.truncated()))?;

            let (component_id, tables) = (bytes[0], bytes[1]);
            if frame_header.component_index(component_id).is_none() {
                return Err(DecodeError::header(format!(
                    "scan references component {component_id} missing from the frame"
                )));
            }

            let selector = ScanComponentSelector::from(component_id, tables >> 4, tables & 0b1111);
            debug!(
                "SOS: component {} uses DC table {} (AC table {} ignored)",
                selector.component_id, selector.dc_destination_id, selector.ac_destination_id
            );
            scan_component_selectors.push(selector);
        }

        let spectral = segment
            .bytes(3)
            .ok_or_else(|| DecodeError::header(segment.truncated()))?;

        let scan_header = ScanHeader {
            scan_component_selectors,
            start_of_spectral: spectral[0],
            end_of_spectral: spectral[1],
            successive_approx_bit_position_high: spectral[2] >> 4,
            point_transform: spectral[2] & 0b1111,
        };

        debug!(
            "SOS: spectral selection {}..={}, Ah={} Al={}, entropy data at byte {}",
            scan_header.start_of_spectral,
            scan_header.end_of_spectral,
            scan_header.successive_approx_bit_position_high,
            scan_header.point_transform,
            self.reader.position()
        );

        Ok(scan_header)
    }
}
