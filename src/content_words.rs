use crate::parser::{ParserState, ParsingListener};
use crate::tokenizer::{Token, TokenKind};
use serde::{Deserialize, Serialize};

/// A run of natural-language text, in bytes relative to the parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentSegment {
    pub start: usize,
    pub length: usize,
}

impl ContentSegment {
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Collects the prose of a document, for spell checking and word counting.
///
/// Segments are kept as long as possible: every loose token in a content
/// state counts, whitespace and punctuation included, so that word boundary
/// detection later has the full context.
#[derive(Debug, Default)]
pub struct ContentWordsListener {
    segments: Vec<ContentSegment>,
    previous_end: Option<usize>,
}

impl ContentWordsListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[ContentSegment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<ContentSegment> {
        self.segments
    }
}

impl ParsingListener for ContentWordsListener {
    fn handle_loose_token(&mut self, token: &Token<'_>, state: &ParserState) {
        if !state.kind.is_content_holder()
            || matches!(token.kind, TokenKind::Begin | TokenKind::TextEnd)
        {
            return;
        }

        match self.segments.last_mut() {
            Some(last) if self.previous_end == Some(token.start) => last.length += token.len(),
            _ => self.segments.push(ContentSegment {
                start: token.start,
                length: token.len(),
            }),
        }
        self.previous_end = Some(token.end());
    }
}
