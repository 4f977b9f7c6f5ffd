use thiserror::Error;

/// Failures surfaced by the DC-only decode pipeline.
///
/// Per-coefficient entropy decode failures never show up here, those only
/// degrade the affected block.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JPEG header: {0}")]
    Header(String),
    #[error("Invalid table: {0}")]
    Table(String),
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),
    #[error("Unsupported JPEG feature: {0}")]
    UnsupportedFeature(String),
}

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

impl DecodeError {
    pub(crate) fn header(reason: impl Into<String>) -> Self {
        DecodeError::Header(reason.into())
    }

    pub(crate) fn table(reason: impl Into<String>) -> Self {
        DecodeError::Table(reason.into())
    }

    /// Header, table and resource failures abort a decode.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DecodeError::Header(_) | DecodeError::Table(_) | DecodeError::ResourceLimitExceeded(_)
        )
    }
}
