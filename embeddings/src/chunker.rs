//! Text chunking ahead of embedding.
//!
//! Two independent strategies:
//! 1. [`chunk_text`] groups separator-delimited paragraphs up to a character
//!    budget, overlapping neighbours by one paragraph.
//! 2. [`chunk_by_tokens`] walks fixed windows of approximate tokens and prefers
//!    to cut at sentence boundaries.
//!
//! All sizes are counted in characters, not bytes.

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Rough approximation used to turn a token budget into characters.
pub const CHARS_PER_TOKEN: usize = 4;

/// Cut points tried by [`chunk_by_tokens`], in priority order.
const SENTENCE_BOUNDARIES: [&str; 4] = [". ", "! ", "? ", "\n"];

/// Options for separator-based chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkOptions {
    /// Target chunk size in characters.
    pub chunk_size: usize,

    /// Overlap threshold in characters. `0` disables overlap.
    pub overlap: usize,

    /// Paragraph separator.
    pub separator: String,
}

impl ChunkOptions {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            ..Self::default()
        }
    }

    /// Set the paragraph separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(EmbeddingError::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.separator.is_empty() {
            return Err(EmbeddingError::InvalidConfiguration(
                "separator must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
            separator: "\n".to_string(),
        }
    }
}

/// Options for token-approximate chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenChunkOptions {
    /// Window size in approximate tokens.
    pub max_tokens: usize,

    /// Overlap between consecutive windows in approximate tokens.
    pub overlap_tokens: usize,
}

impl TokenChunkOptions {
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            max_tokens,
            overlap_tokens,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.char_spans().map(|_| ())
    }

    /// Window and overlap lengths in characters.
    fn char_spans(&self) -> Result<(usize, usize)> {
        if self.max_tokens == 0 {
            return Err(EmbeddingError::InvalidConfiguration(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        let window = self.max_tokens.checked_mul(CHARS_PER_TOKEN).ok_or_else(|| {
            EmbeddingError::InvalidConfiguration(format!(
                "max_tokens {} is too large",
                self.max_tokens
            ))
        })?;
        let overlap = self.overlap_tokens.checked_mul(CHARS_PER_TOKEN).ok_or_else(|| {
            EmbeddingError::InvalidConfiguration(format!(
                "overlap_tokens {} is too large",
                self.overlap_tokens
            ))
        })?;
        Ok((window, overlap))
    }
}

impl Default for TokenChunkOptions {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap_tokens: 50,
        }
    }
}

/// Estimate the token count of a text (~4 chars per token).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Split text into paragraph-aligned chunks of roughly `chunk_size` characters.
///
/// Paragraphs accumulate until adding the next one would push the running
/// size (separators excluded) past `chunk_size`; the accumulated paragraphs
/// are then emitted, rejoined by the separator. The next chunk is seeded
/// with the last emitted paragraph when the emitted chunk is longer than
/// `overlap`. Note the comparison is against the whole emitted chunk, not
/// the seed.
pub fn chunk_text(text: &str, options: &ChunkOptions) -> Result<Vec<String>> {
    options.validate()?;
    let separator = options.separator.as_str();

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0;

    for para in text.split(separator) {
        let para_size = para.chars().count();

        if current_size + para_size > options.chunk_size && !current.is_empty() {
            let emitted = current.join(separator);
            let emitted_len = emitted.chars().count();
            push_non_empty(&mut chunks, emitted);

            let last = current.pop();
            current.clear();
            current_size = 0;

            if options.overlap > 0 && emitted_len > options.overlap {
                if let Some(last) = last {
                    current_size = last.chars().count();
                    current.push(last);
                }
            }
        }

        current.push(para);
        current_size += para_size;
    }

    if !current.is_empty() {
        push_non_empty(&mut chunks, current.join(separator));
    }

    Ok(chunks)
}

/// Split text into windows of about `max_tokens` tokens.
///
/// Before cutting a window that ends inside the text, the last sentence
/// boundary inside the window is preferred as the cut point. The next window
/// starts `overlap_tokens` tokens before the cut, or at the cut when that
/// would not move forward. Chunks are trimmed and empty ones dropped.
pub fn chunk_by_tokens(text: &str, options: &TokenChunkOptions) -> Result<Vec<String>> {
    let (window, overlap) = options.char_spans()?;

    // Byte offset of every char, plus the end of the text.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = offsets.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = start.saturating_add(window);

        if end < len {
            let window_text = &text[offsets[start]..offsets[end]];
            for boundary in SENTENCE_BOUNDARIES {
                if let Some(pos) = window_text.rfind(boundary) {
                    if pos > 0 {
                        end = start + window_text[..pos].chars().count() + boundary.chars().count();
                        break;
                    }
                }
            }
        }

        let end = end.min(len);
        push_non_empty(&mut chunks, text[offsets[start]..offsets[end]].trim().to_string());

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    Ok(chunks)
}

fn push_non_empty(chunks: &mut Vec<String>, chunk: String) {
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
}
