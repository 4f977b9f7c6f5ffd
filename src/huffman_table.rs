use crate::error::{DecodeError, Result};

pub(crate) const MAX_CODE_LENGTH: usize = 16;
pub(crate) const MAX_SYMBOLS: usize = 256;

#[derive(Debug, PartialEq, Copy, Clone, Hash, Eq)]
pub(crate) enum HuffmanClass {
    AC = 1,
    DC = 0,
}

impl HuffmanClass {
    pub(crate) fn from(ht_class: u8) -> Option<Self> {
        match ht_class {
            0 => Some(HuffmanClass::DC),
            1 => Some(HuffmanClass::AC),
            _ => None,
        }
    }
}

/// Canonical Huffman code table built from a DHT definition.
///
/// Codes are kept grouped by length so decoding can scan only the codes of the current length.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HuffmanTable {
    /// Table class - 0 = DC table or lossless table, 1 = AC table.
    pub(crate) class: HuffmanClass,

    /// Specifies one of the possible destinations where the huffman table will be used.
    pub(crate) destination_id: u8,

    /// counts[l - 1] codes of length l.
    counts: [u8; MAX_CODE_LENGTH],

    /// Symbol values ordered by (length, position).
    symbols: Vec<u8>,

    /// codes[i] is the code of symbols[i].
    codes: Vec<u16>,

    /// offsets[l - 1] is the index of the first code of length l.
    offsets: [usize; MAX_CODE_LENGTH],
}

impl HuffmanTable {
    pub(crate) fn from(
        class: HuffmanClass,
        destination_id: u8,
        counts: [u8; MAX_CODE_LENGTH],
        symbols: Vec<u8>,
    ) -> Result<Self> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();

        if total > MAX_SYMBOLS {
            return Err(DecodeError::table(format!(
                "huffman table {destination_id} declares {total} symbols, at most {MAX_SYMBOLS} allowed"
            )));
        }

        if total != symbols.len() {
            return Err(DecodeError::table(format!(
                "huffman table {destination_id} declares {total} symbols but carries {}",
                symbols.len()
            )));
        }

        let mut codes = Vec::with_capacity(total);
        let mut offsets = [0usize; MAX_CODE_LENGTH];
        let mut code: u32 = 0;

        for (idx, &count) in counts.iter().enumerate() {
            let length = idx + 1;
            offsets[idx] = codes.len();

            for _ in 0..count {
                codes.push(code as u16);
                code += 1;
            }

            if code > (1 << length) {
                return Err(DecodeError::table(format!(
                    "huffman table {destination_id} has more codes of length {length} than fit"
                )));
            }

            code <<= 1;
        }

        Ok(HuffmanTable {
            class,
            destination_id,
            counts,
            symbols,
            codes,
            offsets,
        })
    }

    /// Linear scan of the codes of `length` bits.
    pub(crate) fn lookup(&self, length: usize, code: u16) -> Option<u8> {
        if !(1..=MAX_CODE_LENGTH).contains(&length) {
            return None;
        }

        let start = self.offsets[length - 1];
        let end = start + self.counts[length - 1] as usize;

        self.codes[start..end]
            .iter()
            .position(|&c| c == code)
            .map(|i| self.symbols[start + i])
    }

    #[cfg(test)]
    pub(crate) fn code_of(&self, symbol: u8) -> Option<(u16, usize)> {
        let i = self.symbols.iter().position(|&s| s == symbol)?;
        let length = self.offsets.iter().rposition(|&o| o <= i)? + 1;
        Some((self.codes[i], length))
    }
}
