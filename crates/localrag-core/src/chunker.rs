//! Recursive, overlap-aware text chunker.
//!
//! Text is cut on the highest-priority separator that makes pieces fit, then
//! pieces are merged back into windows of at most `chunk_size` characters.
//! Separators stay attached to the piece they end, so pieces always tile the
//! source text and chunk offsets point back into it.

use std::ops::Range;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Paragraph,
    Line,
    Space,
    Character,
}

impl Separator {
    pub const DEFAULT: [Separator; 4] = [Separator::Paragraph, Separator::Line, Separator::Space, Separator::Character];

    fn pattern(self) -> Option<&'static str> {
        match self {
            Separator::Paragraph => Some("\n\n"),
            Separator::Line => Some("\n"),
            Separator::Space => Some(" "),
            Separator::Character => None,
        }
    }

    /// Byte ranges tiling `range`; each separator occurrence ends its piece.
    fn split(self, text: &str, range: Range<usize>) -> Vec<Range<usize>> {
        let base = range.start;
        let slice = &text[range.clone()];
        let Some(pattern) = self.pattern() else {
            return slice.char_indices().map(|(i, c)| base + i..base + i + c.len_utf8()).collect();
        };
        let mut pieces = Vec::new();
        let mut start = 0usize;
        for (pos, sep) in slice.match_indices(pattern) {
            let end = pos + sep.len();
            pieces.push(base + start..base + end);
            start = end;
        }
        if start < slice.len() {
            pieces.push(base + start..range.end);
        }
        pieces
    }
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Maximum characters shared by consecutive chunks of one document.
    pub chunk_overlap: usize,
    /// Split order. Without `Character`, an unbroken token longer than
    /// `chunk_size` is emitted whole.
    pub separators: Vec<Separator>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, separators: Separator::DEFAULT.to_vec() }
    }
}

impl ChunkerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self { chunk_size: settings.chunk_size, chunk_overlap: settings.chunk_overlap, ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy)]
struct Unit {
    start: usize,
    end: usize,
    chars: usize,
    blank: bool,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be at least 1".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.separators.is_empty() {
            return Err(Error::InvalidConfig("at least one separator is required".into()));
        }
        Ok(Self { config })
    }

    pub fn chunk(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|d| self.chunk_document(d)).collect()
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let text = document.text.as_str();
        let mut units = Vec::new();
        self.split_units(text, 0..text.len(), 0, &mut units);

        let mut chunks: Vec<Chunk> = Vec::new();
        for window in self.merge(&units) {
            let (first, last) = (units[window.start], units[window.end - 1]);
            let raw = &text[first.start..last.end];
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let offset = first.start + (raw.len() - raw.trim_start().len());
            // a window that only re-adds trailing whitespace lies inside the previous chunk
            if chunks.last().is_some_and(|prev| offset + trimmed.len() <= prev.offset + prev.text.len()) {
                continue;
            }
            let chunk_index = chunks.len();
            chunks.push(Chunk {
                id: format!("{}#{}", document.source, chunk_index),
                text: trimmed.to_string(),
                source: document.source.clone(),
                offset,
                chunk_index,
            });
        }
        chunks
    }

    fn split_units(&self, text: &str, range: Range<usize>, level: usize, out: &mut Vec<Unit>) {
        if range.is_empty() {
            return;
        }
        let slice = &text[range.clone()];
        let chars = slice.chars().count();
        let separator = match self.config.separators.get(level) {
            Some(separator) if chars > self.config.chunk_size => separator,
            _ => {
                out.push(Unit { start: range.start, end: range.end, chars, blank: slice.trim().is_empty() });
                return;
            }
        };
        let pieces = separator.split(text, range.clone());
        if pieces.len() <= 1 {
            self.split_units(text, range, level + 1, out);
            return;
        }
        for piece in pieces {
            self.split_units(text, piece, level + 1, out);
        }
    }

    /// Greedy windows over unit indices. After each emitted window the
    /// trailing units summing to at most `chunk_overlap` chars are carried over,
    /// never including the window's first non-blank unit.
    fn merge(&self, units: &[Unit]) -> Vec<Range<usize>> {
        let ChunkerConfig { chunk_size, chunk_overlap, .. } = self.config;
        let mut windows = Vec::new();
        let mut start = 0usize;
        let mut total = 0usize;
        for (i, unit) in units.iter().enumerate() {
            if total + unit.chars > chunk_size && i > start {
                windows.push(start..i);
                let first_content = (start..i).find(|&j| !units[j].blank).unwrap_or(start);
                while start < i
                    && (start <= first_content || total > chunk_overlap || total + unit.chars > chunk_size)
                {
                    total -= units[start].chars;
                    start += 1;
                }
            }
            total += unit.chars;
        }
        if start < units.len() {
            windows.push(start..units.len());
        }
        windows
    }
}
