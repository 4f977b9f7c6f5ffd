//! Synthetic JPEG streams for tests.

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// The example luminance DC table of ITU T.81 Annex K.3.
pub(crate) const LUMA_DC_COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
pub(crate) const LUMA_DC_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

pub(crate) fn soi() -> Vec<u8> {
    vec![0xFF, 0xD8]
}

pub(crate) fn eoi() -> Vec<u8> {
    vec![0xFF, 0xD9]
}

pub(crate) fn segment(code: u8, payload: &[u8]) -> Vec<u8> {
    let length = (payload.len() + 2) as u16;
    let mut bytes = vec![0xFF, code];
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

pub(crate) fn app0() -> Vec<u8> {
    segment(
        0xE0,
        &[b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x01, 0x00, 0x48, 0x00, 0x48, 0x00, 0x00],
    )
}

/// 8-bit table whose DC step is `dc_step` and every AC step is 1.
pub(crate) fn dqt(table_id: u8, dc_step: u8) -> Vec<u8> {
    let mut payload = vec![table_id];
    payload.push(dc_step);
    payload.extend(std::iter::repeat(1).take(63));
    segment(0xDB, &payload)
}

/// SOF0 with (id, sampling byte, quantization table id) per component.
pub(crate) fn sof0(width: u16, height: u16, components: &[(u8, u8, u8)]) -> Vec<u8> {
    sof(0xC0, width, height, components)
}

pub(crate) fn sof(code: u8, width: u16, height: u16, components: &[(u8, u8, u8)]) -> Vec<u8> {
    let mut payload = vec![8];
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(&width.to_be_bytes());
    payload.push(components.len() as u8);
    for &(id, sampling, qt) in components {
        payload.extend_from_slice(&[id, sampling, qt]);
    }
    segment(code, &payload)
}

pub(crate) fn dht(class: u8, table_id: u8, counts: &[u8; 16], symbols: &[u8]) -> Vec<u8> {
    let mut payload = vec![(class << 4) | table_id];
    payload.extend_from_slice(counts);
    payload.extend_from_slice(symbols);
    segment(0xC4, &payload)
}

pub(crate) fn luma_dc_dht(table_id: u8) -> Vec<u8> {
    dht(0, table_id, &LUMA_DC_COUNTS, &LUMA_DC_SYMBOLS)
}

/// SOS with (component id, table byte) per component.
pub(crate) fn sos(components: &[(u8, u8)]) -> Vec<u8> {
    let mut payload = vec![components.len() as u8];
    for &(id, tables) in components {
        payload.extend_from_slice(&[id, tables]);
    }
    payload.extend_from_slice(&[0x00, 0x3F, 0x00]);
    segment(0xDA, &payload)
}

/// Packs a string of '0'/'1' characters MSB first, pads the last byte with 1 bits and stuffs a
/// 0x00 after every 0xFF.
pub(crate) fn pack_bits(bits: &str) -> Vec<u8> {
    let bits: Vec<u8> = bits
        .chars()
        .filter(|c| *c == '0' || *c == '1')
        .map(|c| (c == '1') as u8)
        .collect();

    let mut bytes = vec![];
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for i in 0..8 {
            byte = (byte << 1) | chunk.get(i).copied().unwrap_or(1);
        }
        bytes.push(byte);
        if byte == 0xFF {
            bytes.push(0x00);
        }
    }
    bytes
}

/// Single component baseline stream using the luminance DC table and quantization step
/// `dc_step`.
pub(crate) fn grayscale_jpeg(width: u16, height: u16, dc_step: u8, scan_bits: &str) -> Vec<u8> {
    [
        soi(),
        app0(),
        dqt(0, dc_step),
        sof0(width, height, &[(1, 0x11, 0)]),
        luma_dc_dht(0),
        sos(&[(1, 0x00)]),
        pack_bits(scan_bits),
        eoi(),
    ]
    .concat()
}

/// Per-process path in the temp directory, `name` keeps its extension.
pub(crate) fn mock_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "jpeg_dc_preview_{}_{}",
        std::process::id(),
        name
    ))
}

/// Writes `data` to a fresh file in the temp directory.
pub(crate) fn write_mock(name: &str, data: &[u8]) -> Result<PathBuf> {
    let path = mock_path(name);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)?;
    file.write_all(data)?;

    Ok(path)
}
