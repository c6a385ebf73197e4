use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::SplitterConfigError;

pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

const DEFAULT_CHUNK_SIZE: usize = 2000;
const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Chunking parameters supplied by callers of the refine operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkParams {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    pub fn splitter(&self) -> Result<RecursiveCharacterTextSplitter, SplitterConfigError> {
        RecursiveCharacterTextSplitter::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.overlap)
            .build()
    }
}

/// Splits text on the coarsest boundary that keeps pieces under the chunk size,
/// then packs pieces into chunks that share a trailing window of `chunk_overlap`
/// characters.
///
/// Sizes are counted in `char`s. Separators stay attached to the piece they end,
/// so with no overlap the chunks concatenate back into the input.
#[derive(Clone, Debug)]
pub struct RecursiveCharacterTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct RecursiveCharacterTextSplitterBuilder {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for RecursiveCharacterTextSplitterBuilder {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RecursiveCharacterTextSplitterBuilder {
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn chunk_overlap(mut self, chunk_overlap: usize) -> Self {
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        self
    }

    pub fn build(self) -> Result<RecursiveCharacterTextSplitter, SplitterConfigError> {
        if self.chunk_size == 0 {
            return Err(SplitterConfigError::ChunkSizeMustBeGreaterThanZero);
        }

        Ok(RecursiveCharacterTextSplitter {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap.min(self.chunk_size - 1),
            separators: self.separators,
        })
    }
}

impl RecursiveCharacterTextSplitter {
    pub fn builder() -> RecursiveCharacterTextSplitterBuilder {
        RecursiveCharacterTextSplitterBuilder::default()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.collect_pieces(text, &self.separators, &mut pieces);
        let chunks = self.merge(pieces);
        tracing::debug!(
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            overlap = self.chunk_overlap,
            "split document"
        );
        chunks
    }

    fn collect_pieces<'a>(&self, text: &'a str, separators: &[String], out: &mut Vec<&'a str>) {
        if char_len(text) <= self.chunk_size {
            out.push(text);
            return;
        }

        match separators.split_first() {
            Some((separator, rest)) => {
                if !text.contains(separator.as_str()) {
                    self.collect_pieces(text, rest, out);
                    return;
                }
                for part in text.split_inclusive(separator.as_str()) {
                    self.collect_pieces(part, rest, out);
                }
            }
            None => out.extend(
                text.char_indices()
                    .map(|(start, ch)| &text[start..start + ch.len_utf8()]),
            ),
        }
    }

    fn merge(&self, pieces: Vec<&str>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                chunks.push(window.iter().map(|(piece, _)| *piece).collect::<String>());
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            chunks.push(window.iter().map(|(piece, _)| *piece).collect::<String>());
        }
        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
