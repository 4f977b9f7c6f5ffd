use crate::marker::Marker;

/// Forward-only reader over the bytes of a JPEG file.
///
/// Headers are consumed byte-wise with [`BitReader::next_byte`]. Entropy-coded data is consumed
/// with [`BitReader::next_bit`], which removes stuffed `0xFF 0x00` pairs and stops in front of the
/// first marker it meets.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    byte_cur: usize,
    bit_buffer: u8,
    bits_left: u8,
    at_marker: bool,
    exhausted: bool,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_cur: 0,
            bit_buffer: 0,
            bits_left: 0,
            at_marker: false,
            exhausted: false,
        }
    }

    /// Next raw byte, or `None` once the stream is used up.
    pub(crate) fn next_byte(&mut self) -> Option<u8> {
        let b = *self.data.get(self.byte_cur)?;
        self.byte_cur += 1;
        Some(b)
    }

    /// Offset of the next unread byte.
    pub(crate) fn position(&self) -> usize {
        self.byte_cur
    }

    pub(crate) fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.byte_cur).copied()
    }

    pub(crate) fn next_u16(&mut self) -> Option<u16> {
        let hi = self.next_byte()?;
        let lo = self.next_byte()?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    /// Hands out the next `len` bytes as one slice, e.g. a marker segment body.
    pub(crate) fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.byte_cur.checked_add(len)?;
        let slice = self.data.get(self.byte_cur..end)?;
        self.byte_cur = end;
        Some(slice)
    }

    /// One bit of entropy-coded data, most significant bit first. Reads past the end of the
    /// entropy-coded segment yield 0 and mark the reader as exhausted.
    pub(crate) fn next_bit(&mut self) -> u8 {
        if self.bits_left == 0 {
            match self.fill() {
                Some(b) => {
                    self.bit_buffer = b;
                    self.bits_left = 8;
                }
                None => {
                    self.exhausted = true;
                    return 0;
                }
            }
        }

        self.bits_left -= 1;
        (self.bit_buffer >> self.bits_left) & 1
    }

    /// `count` bits as an unsigned value, first bit read ends up most significant.
    pub(crate) fn receive(&mut self, count: u8) -> u16 {
        let mut value = 0u16;
        for _ in 0..count {
            value = (value << 1) | self.next_bit() as u16;
        }
        value
    }

    fn fill(&mut self) -> Option<u8> {
        if self.at_marker {
            return None;
        }

        let b = self.peek_byte()?;
        if b != Marker::GLOBAL {
            self.byte_cur += 1;
            return Some(b);
        }

        match self.data.get(self.byte_cur + 1) {
            Some(&Marker::STUFF) => {
                self.byte_cur += Marker::SIZE;
                Some(Marker::GLOBAL)
            }
            _ => {
                // leave the marker bytes for whoever reads markers next
                self.at_marker = true;
                None
            }
        }
    }

    /// True once a bit was requested that the entropy-coded segment did not contain.
    pub(crate) fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub(crate) fn at_marker(&self) -> bool {
        self.at_marker
    }
}
