use crate::matchers::MATH_NON_OPERATORS;
use crate::parser::{ParserState, ParsingListener, StateKind};
use crate::tokenizer::{Token, TokenKind};
use serde::{Deserialize, Serialize};

/// Categories of highlighted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    Heading,
    Emphasis,
    StrongEmphasis,
    Url,
    Raw,
    Label,
    Reference,
    ListEntry,
    Term,
    MathDelimiter,
    MathOperator,
    VariableName,
    FunctionName,
    Keyword,
    Escape,
    Comment,
    NumberLiteral,
    StringLiteral,
}

/// A highlighted range, in bytes relative to the parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HighlightingMarker {
    pub kind: MarkerKind,
    pub start: usize,
    pub length: usize,
}

impl HighlightingMarker {
    pub fn new(kind: MarkerKind, start: usize, length: usize) -> Self {
        Self {
            kind,
            start,
            length,
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Turns parser events into highlighting markers. Markers of different
/// kinds may overlap; it is up to the consumer to layer them.
#[derive(Debug, Default)]
pub struct HighlightingListener {
    markers: Vec<HighlightingMarker>,
}

impl HighlightingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[HighlightingMarker] {
        &self.markers
    }

    pub fn into_markers(self) -> Vec<HighlightingMarker> {
        self.markers
    }

    fn add_marker(&mut self, kind: MarkerKind, start: usize, end: usize) {
        if end > start {
            self.markers.push(HighlightingMarker::new(kind, start, end - start));
        }
    }
}

fn marker_kind_for_state(kind: StateKind) -> Option<MarkerKind> {
    let marker = match kind {
        StateKind::CommentLine | StateKind::CommentBlock => MarkerKind::Comment,
        StateKind::StringLiteral | StateKind::CodeStringExpression => MarkerKind::StringLiteral,
        StateKind::MathDelimiter => MarkerKind::MathDelimiter,
        StateKind::ContentHeading => MarkerKind::Heading,
        StateKind::ContentEmphasis => MarkerKind::Emphasis,
        StateKind::ContentStrongEmphasis => MarkerKind::StrongEmphasis,
        StateKind::ContentUrl => MarkerKind::Url,
        StateKind::ContentRaw | StateKind::ContentRawBlock => MarkerKind::Raw,
        StateKind::ContentLabel => MarkerKind::Label,
        StateKind::ContentReference => MarkerKind::Reference,
        StateKind::ContentListEntry => MarkerKind::ListEntry,
        StateKind::ContentTerm => MarkerKind::Term,
        StateKind::CodeVariableName | StateKind::MathSymbolName => MarkerKind::VariableName,
        StateKind::CodeFunctionName | StateKind::MathFunctionName => MarkerKind::FunctionName,
        StateKind::CodeKeyword => MarkerKind::Keyword,
        StateKind::CodeNumericLiteral => MarkerKind::NumberLiteral,
        _ => return None,
    };
    Some(marker)
}

impl ParsingListener for HighlightingListener {
    fn initialize_state(&mut self, state: &ParserState, end: usize) {
        // The keyword that opened a code line
        if state.kind == StateKind::CodeLine {
            self.add_marker(MarkerKind::Keyword, state.start, end);
        }
    }

    fn finalize_state(&mut self, state: &ParserState, end: usize, _implicit: bool) {
        let Some(kind) = marker_kind_for_state(state.kind) else {
            return;
        };

        if kind == MarkerKind::MathDelimiter {
            // Only the `$` itself, without any discarded prefix
            self.add_marker(kind, end.saturating_sub(1), end);
        } else {
            self.add_marker(kind, state.start, end);
        }
    }

    fn handle_loose_token(&mut self, token: &Token<'_>, state: &ParserState) {
        match token.kind {
            TokenKind::Escape
                if state.kind.is_content_holder()
                    || state.kind == StateKind::Math
                    || state.kind == StateKind::StringLiteral =>
            {
                self.add_marker(MarkerKind::Escape, token.start, token.end());
            }
            TokenKind::Symbol
                if state.kind == StateKind::Math && !MATH_NON_OPERATORS.contains(token.text) =>
            {
                self.add_marker(MarkerKind::MathOperator, token.start, token.end());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn highlight(text: &str) -> Vec<HighlightingMarker> {
        let mut listener = HighlightingListener::new();
        let mut parser = Parser::new(text, &[]);
        parser.add_listener(&mut listener, true);
        parser.parse();
        listener.into_markers()
    }

    fn of_kind(markers: &[HighlightingMarker], kind: MarkerKind) -> Vec<(usize, usize)> {
        markers
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| (m.start, m.length))
            .collect()
    }

    #[test]
    fn test_line_comment() {
        let markers = highlight("a // comment line\nb");
        assert_eq!(markers, vec![HighlightingMarker::new(MarkerKind::Comment, 2, 16)]);
    }

    #[test]
    fn test_block_comment_spanning_lines() {
        let markers = highlight("a /* comment\ncomment\ncomment*/ b");
        assert_eq!(markers, vec![HighlightingMarker::new(MarkerKind::Comment, 2, 28)]);
    }

    #[test]
    fn test_string_literal_only_in_math() {
        let markers = highlight("\"not a literal\" $ \"yesliteral\" + 1$");
        assert_eq!(of_kind(&markers, MarkerKind::StringLiteral), vec![(18, 12)]);
        assert_eq!(of_kind(&markers, MarkerKind::MathDelimiter), vec![(16, 1), (34, 1)]);
        assert_eq!(of_kind(&markers, MarkerKind::MathOperator), vec![(31, 1)]);
    }

    #[test]
    fn test_comment_markers_inside_math_string() {
        let markers = highlight("$ \"A /* $ \" */ $");
        assert_eq!(of_kind(&markers, MarkerKind::StringLiteral), vec![(2, 9)]);
        assert!(of_kind(&markers, MarkerKind::Comment).is_empty());
    }

    #[test]
    fn test_headings() {
        let markers = highlight("=== this is a heading\nthis is not.\n \t= but this is");
        assert_eq!(of_kind(&markers, MarkerKind::Heading), vec![(0, 22), (37, 13)]);

        let markers = highlight("a == not header\n=not header too");
        assert!(markers.is_empty());
    }

    #[test]
    fn test_emphasis_and_strong() {
        let markers = highlight("_a_ b _c_ *d*");
        assert_eq!(of_kind(&markers, MarkerKind::Emphasis), vec![(0, 3), (6, 3)]);
        assert_eq!(of_kind(&markers, MarkerKind::StrongEmphasis), vec![(10, 3)]);
    }

    #[test]
    fn test_code_markers() {
        let markers = highlight("#let x = calc.max(1, 2pt)");
        assert_eq!(of_kind(&markers, MarkerKind::Keyword), vec![(0, 4)]);
        assert_eq!(of_kind(&markers, MarkerKind::NumberLiteral), vec![(18, 1), (21, 3)]);
    }

    #[test]
    fn test_code_function_and_variable() {
        let markers = highlight("#foo(x) and #bar");
        assert_eq!(of_kind(&markers, MarkerKind::FunctionName), vec![(0, 4)]);
        assert_eq!(of_kind(&markers, MarkerKind::VariableName), vec![(12, 4)]);
    }

    #[test]
    fn test_labels_references_urls_and_raw() {
        let markers = highlight("See @fig-1 <intro> at https://x.org/a `code`");
        assert_eq!(of_kind(&markers, MarkerKind::Reference), vec![(4, 6)]);
        assert_eq!(of_kind(&markers, MarkerKind::Label), vec![(11, 7)]);
        assert_eq!(of_kind(&markers, MarkerKind::Url), vec![(22, 15)]);
        assert_eq!(of_kind(&markers, MarkerKind::Raw), vec![(38, 6)]);
    }

    #[test]
    fn test_escapes() {
        let markers = highlight("\\* and $\\$$");
        assert_eq!(of_kind(&markers, MarkerKind::Escape), vec![(0, 2), (8, 2)]);
    }

    #[test]
    fn test_list_entry_and_term() {
        let markers = highlight("+ first\n  / Term: text");
        assert_eq!(of_kind(&markers, MarkerKind::ListEntry), vec![(0, 2), (10, 2)]);
        assert_eq!(of_kind(&markers, MarkerKind::Term), vec![(12, 4)]);
    }

    #[test]
    fn test_math_names() {
        let markers = highlight("$a + alpha + sqrt(x)$");
        assert_eq!(of_kind(&markers, MarkerKind::VariableName), vec![(5, 5)]);
        assert_eq!(of_kind(&markers, MarkerKind::FunctionName), vec![(13, 4)]);
        assert_eq!(of_kind(&markers, MarkerKind::MathOperator), vec![(3, 1), (11, 1)]);
    }
}
