//! Splits documents into overlapping character windows.
//!
//! Window ends prefer structural boundaries. In order: paragraph breaks,
//! sentence ends, whitespace, then a hard cut. Each window after the first
//! starts `overlap` characters before the previous one ended, so dropping
//! that prefix from every later chunk and concatenating gives back the
//! document.

use crate::config::ChunkingConfig;
use crate::domain::{Chunk, ChunkPosition, Document};
use crate::error::{RepoRagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        let defaults = ChunkingConfig::default();
        Self {
            chunk_size: defaults.chunk_size,
            overlap: defaults.overlap,
        }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RepoRagError::config("chunk size must be greater than zero"));
        }
        if overlap >= chunk_size {
            return Err(RepoRagError::config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.overlap)
    }

    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunks every document, preserving document order.
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.split_document(doc))
            .collect()
    }

    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        self.windows(&doc.content)
            .into_iter()
            .enumerate()
            .map(|(index, window)| {
                Chunk::new(
                    doc.id.clone(),
                    window.text.to_string(),
                    ChunkPosition {
                        index,
                        start_char: window.start,
                        end_char: window.end,
                    },
                    doc.metadata.clone(),
                )
            })
            .collect()
    }

    fn windows<'a>(&self, text: &'a str) -> Vec<Window<'a>> {
        let chars: Vec<char> = text.chars().collect();
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = chars.len();

        let mut windows = Vec::new();
        let mut start = 0;

        while start < total {
            let end = if total - start <= self.chunk_size {
                total
            } else {
                self.choose_end(&chars, start)
            };

            windows.push(Window {
                text: &text[offsets[start]..offsets[end]],
                start,
                end,
            });

            if end == total {
                break;
            }
            start = end - self.overlap;
        }

        windows
    }

    /// Picks the end of the window starting at `start`; the rest of the text is
    /// longer than one window.
    fn choose_end(&self, chars: &[char], start: usize) -> usize {
        let hard_end = start + self.chunk_size;
        // Ends below this would make tiny chunks or fail to move past the overlap.
        let min_end = start + (self.overlap + 1).max(self.chunk_size / 2);

        Boundary::PREFERENCE
            .iter()
            .find_map(|boundary| {
                (min_end..=hard_end)
                    .rev()
                    .find(|&end| boundary.ends_at(chars, end))
            })
            .unwrap_or(hard_end)
    }
}

struct Window<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Sentence,
    Whitespace,
}

impl Boundary {
    const PREFERENCE: [Self; 3] = [Self::Paragraph, Self::Sentence, Self::Whitespace];

    /// Whether a chunk ending right before `chars[end]` ends on this boundary.
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        let last = end.checked_sub(1).and_then(|i| chars.get(i)).copied();
        let before = end.checked_sub(2).and_then(|i| chars.get(i)).copied();

        match self {
            Self::Paragraph => last == Some('\n') && before == Some('\n'),
            Self::Sentence => {
                last == Some('\n')
                    || (last.is_some_and(char::is_whitespace)
                        && matches!(before, Some('.' | '!' | '?')))
            }
            Self::Whitespace => last.is_some_and(char::is_whitespace),
        }
    }
}
