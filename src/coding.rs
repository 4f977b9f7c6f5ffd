#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Operation {
    Sequential,
    Progressive,
    Lossless,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum EntropyCoding {
    Huffman,
    Arithmetic,
}

/// The coding process announced by a Start of Frame marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum CodingProcess {
    BaselineDCT,
    ExtendedSequentialDCT,
    ProgressiveDCT,
    Lossless,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ProcessSchema {
    pub(crate) process: CodingProcess,
    pub(crate) operation: Operation,
    pub(crate) entropy_coding: EntropyCoding,
    pub(crate) differential: bool,
}

impl CodingProcess {
    /// Classifies the low nibble of an SOFn marker. `None` for the nibbles that are not frame
    /// markers (DHT, JPG, DAC).
    pub(crate) fn schema(sof_nibble: u8) -> Option<ProcessSchema> {
        let (process, operation) = match sof_nibble & 0b11 {
            0 if sof_nibble == 0 => (CodingProcess::BaselineDCT, Operation::Sequential),
            0 | 1 => (CodingProcess::ExtendedSequentialDCT, Operation::Sequential),
            2 => (CodingProcess::ProgressiveDCT, Operation::Progressive),
            _ => (CodingProcess::Lossless, Operation::Lossless),
        };

        let entropy_coding = match sof_nibble {
            0x4 | 0x8 | 0xC => return None,
            0x0..=0x7 => EntropyCoding::Huffman,
            0x9..=0xF => EntropyCoding::Arithmetic,
            _ => return None,
        };

        Some(ProcessSchema {
            process,
            operation,
            entropy_coding,
            differential: matches!(sof_nibble, 0x5..=0x7 | 0xD..=0xF),
        })
    }
}

impl ProcessSchema {
    /// Only non-differential baseline Huffman frames can be DC-decoded.
    pub(crate) fn is_baseline(&self) -> bool {
        self.process == CodingProcess::BaselineDCT
            && self.entropy_coding == EntropyCoding::Huffman
            && !self.differential
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};

    #[test]
    fn test_baseline_schema() -> Result<()> {
        let schema = CodingProcess::schema(0).ok_or(anyhow!("SOF0 has a schema"))?;
        assert_eq!(schema.process, CodingProcess::BaselineDCT);
        assert_eq!(schema.operation, Operation::Sequential);
        assert!(schema.is_baseline());

        Ok(())
    }

    #[test]
    fn test_non_baseline_schemas() -> Result<()> {
        let test_cases = vec![
            (0x1, CodingProcess::ExtendedSequentialDCT, EntropyCoding::Huffman, false),
            (0x2, CodingProcess::ProgressiveDCT, EntropyCoding::Huffman, false),
            (0x3, CodingProcess::Lossless, EntropyCoding::Huffman, false),
            (0x6, CodingProcess::ProgressiveDCT, EntropyCoding::Huffman, true),
            (0x9, CodingProcess::ExtendedSequentialDCT, EntropyCoding::Arithmetic, false),
            (0xA, CodingProcess::ProgressiveDCT, EntropyCoding::Arithmetic, false),
            (0xF, CodingProcess::Lossless, EntropyCoding::Arithmetic, true),
        ];

        for (nibble, process, entropy_coding, differential) in test_cases {
            let schema = CodingProcess::schema(nibble).ok_or(anyhow!("SOF{nibble} has a schema"))?;
            assert_eq!(schema.process, process);
            assert_eq!(schema.entropy_coding, entropy_coding);
            assert_eq!(schema.differential, differential);
            assert!(!schema.is_baseline());
        }

        assert!(CodingProcess::schema(0x4).is_none());
        assert!(CodingProcess::schema(0x8).is_none());
        assert!(CodingProcess::schema(0xC).is_none());

        Ok(())
    }
}
