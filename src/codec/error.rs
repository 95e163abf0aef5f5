use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed tag: {0}")]
    Malformed(String),

    #[error("unsupported ID3v2 version 2.{0}")]
    UnsupportedVersion(u8),

    #[error("frame {id} is too large to encode ({len} bytes)")]
    TooLarge { id: String, len: usize },
}

impl CodecError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        CodecError::Malformed(msg.into())
    }
}
