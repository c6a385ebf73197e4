mod error;
pub mod pdf;
mod splitter;

pub use error::{PdfError, SplitterConfigError};
pub use splitter::{
    ChunkParams, RecursiveCharacterTextSplitter, RecursiveCharacterTextSplitterBuilder,
    DEFAULT_SEPARATORS,
};
