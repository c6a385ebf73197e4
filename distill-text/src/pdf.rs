//! Turning uploaded PDF bytes into prompt-ready text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::PdfError;

/// Uploads above this size are rejected before extraction.
pub const MAX_PDF_BYTES: usize = 5 * 1024 * 1024;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{3,}").expect("whitespace pattern is valid"));

pub fn ensure_within_limit(bytes: &[u8]) -> Result<(), PdfError> {
    check_size(bytes.len())
}

fn check_size(size: usize) -> Result<(), PdfError> {
    if size > MAX_PDF_BYTES {
        tracing::warn!(size, limit = MAX_PDF_BYTES, "PDF over size limit");
        return Err(PdfError::TooLarge {
            size,
            limit: MAX_PDF_BYTES,
        });
    }
    Ok(())
}

/// Downloads a PDF, refusing anything over [`MAX_PDF_BYTES`].
///
/// An advertised `Content-Length` over the limit fails before the body is read.
pub async fn load_from_url(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, PdfError> {
    let response = http
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| {
            tracing::warn!(error = %err, "PDF download failed");
            PdfError::Download(err.to_string())
        })?;

    if let Some(length) = response.content_length() {
        check_size(usize::try_from(length).unwrap_or(usize::MAX))?;
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|err| PdfError::Download(err.to_string()))?;
    ensure_within_limit(&bytes)?;
    tracing::debug!(size = bytes.len(), "PDF downloaded");
    Ok(bytes.to_vec())
}

#[cfg(feature = "pdf")]
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfError> {
    ensure_within_limit(bytes)?;
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| PdfError::Extraction(err.to_string()))?;
    if raw.trim().is_empty() {
        tracing::warn!("PDF produced no text");
        return Err(PdfError::NotParsed);
    }
    tracing::debug!(chars = raw.len(), "PDF parsed");
    Ok(postprocess_text(&raw))
}

#[cfg(not(feature = "pdf"))]
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfError> {
    ensure_within_limit(bytes)?;
    Err(PdfError::Unsupported)
}

/// Normalizes extracted layout text: trims every line, keeps at most one empty
/// line in a row and squeezes long whitespace runs inside a line to three spaces.
pub fn postprocess_text(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_empty = false;
    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() && previous_empty {
            continue;
        }
        previous_empty = line.is_empty();
        lines.push(squeeze_whitespace(line));
    }
    lines.join("\n")
}

fn squeeze_whitespace(line: &str) -> String {
    WHITESPACE_RUN.replace_all(line, "   ").into_owned()
}
