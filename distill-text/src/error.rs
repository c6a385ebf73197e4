use distill_core::DistillError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitterConfigError {
    #[error("chunk size must be greater than zero")]
    ChunkSizeMustBeGreaterThanZero,
}

impl From<SplitterConfigError> for DistillError {
    fn from(err: SplitterConfigError) -> Self {
        DistillError::InvalidRequest(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("The PDF file is larger than {limit} bytes ({size} bytes)")]
    TooLarge { size: usize, limit: usize },
    #[error(
        "The PDF file could not be parsed. It may not contain plain text or information in text format"
    )]
    NotParsed,
    #[error("PDF text extraction failed: {0}")]
    Extraction(String),
    #[error("PDF download failed: {0}")]
    Download(String),
    #[error("PDF support is not enabled in this build")]
    Unsupported,
}
