//! Structural queries over the state spans of a parsed document: bracket
//! matching, indentation hints and context-aware completions.
//!
//! All positions are global byte offsets into the document text, where every
//! line separator counts as one byte.

use crate::parser::StateKind;
use crate::state_spans::{SpanId, StateSpan, StateSpanList};
use crate::utils::is_hebrew;

/// Upper bound on the number of lines a query walks looking for the other
/// end of a span.
pub const MAX_LINES_TO_SCAN: usize = 1000;

/// Line oriented access to a document and its cached state spans.
pub trait LineStore {
    fn line_count(&self) -> usize;

    /// Global offset of the first character of `line`.
    fn line_start(&self, line: usize) -> usize;

    fn line_text(&self, line: usize) -> &str;

    /// State spans recorded when `line` was last parsed.
    fn line_spans(&self, line: usize) -> Option<&StateSpanList>;

    fn line_length(&self, line: usize) -> usize {
        self.line_text(line).len()
    }

    /// The line containing `pos`. The position just past the last character
    /// of a line belongs to that line.
    fn line_of(&self, pos: usize) -> Option<usize> {
        let count = self.line_count();
        if count == 0 {
            return None;
        }

        let (mut low, mut high) = (0, count);
        while high - low > 1 {
            let mid = (low + high) / 2;
            if self.line_start(mid) <= pos {
                low = mid;
            } else {
                high = mid;
            }
        }

        (pos <= self.line_start(low) + self.line_length(low)).then_some(low)
    }
}

/// Rough classification of the syntax at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Unknown,
    Content,
    Code,
    Math,
    Other,
}

/// An editing cursor. The selection runs between `anchor` and `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub position: usize,
    pub anchor: usize,
}

impl Cursor {
    pub fn at(position: usize) -> Self {
        Self {
            position,
            anchor: position,
        }
    }

    pub fn with_selection(anchor: usize, position: usize) -> Self {
        Self { position, anchor }
    }

    pub fn has_selection(&self) -> bool {
        self.position != self.anchor
    }
}

/// An RGBA color, for building color literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `#rrggbb`, or `#rrggbbaa` for colors that are not fully opaque.
    pub fn hex_name(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

fn is_delimited(kind: StateKind) -> bool {
    matches!(
        kind,
        StateKind::ContentBlock
            | StateKind::Math
            | StateKind::MathArguments
            | StateKind::CodeBlock
            | StateKind::CodeArguments
    )
}

fn is_indenting(kind: StateKind) -> bool {
    matches!(
        kind,
        StateKind::ContentBlock
            | StateKind::CodeBlock
            | StateKind::CodeArguments
            | StateKind::MathArguments
    )
}

/// States whose text is a-priori left to right, whatever the language of the
/// surrounding prose.
fn is_left_leaning(kind: StateKind) -> bool {
    matches!(
        kind,
        StateKind::CodeBlock
            | StateKind::CodeLine
            | StateKind::Math
            | StateKind::ContentRaw
            | StateKind::ContentRawBlock
    )
}

pub struct CodeModel<'s, S: LineStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: LineStore + ?Sized> CodeModel<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn classify_environment(&self, pos: usize) -> Environment {
        let Some(line) = self.store.line_of(pos) else {
            return Environment::Unknown;
        };

        let Some(span) = self.span_at_position(line, pos) else {
            return Environment::Content;
        };

        if span.kind.is_content_holder() {
            Environment::Content
        } else if span.kind.is_code_holder() {
            Environment::Code
        } else if span.kind.is_math_holder() {
            Environment::Math
        } else {
            Environment::Other
        }
    }

    /// If there is a delimiting bracket at `pos`, finds the position of the
    /// bracket matching it.
    pub fn find_matching_bracket(&self, pos: usize) -> Option<usize> {
        let line = self.store.line_of(pos)?;
        let spans = self.store.line_spans(line)?;
        debug_assert!(spans.is_sorted());

        for span in spans {
            if span.start > pos {
                break;
            }
            if !is_delimited(span.kind) {
                continue;
            }

            if span.end == Some(pos) {
                return Some(span.start);
            }
            if span.start == pos {
                return match span.end {
                    Some(end) => Some(end),
                    None => self.find_span_end(span.id, line + 1),
                };
            }
        }
        None
    }

    /// Whether a newline inserted at `pos` should indent the next line one
    /// level deeper.
    pub fn should_increase_indent(&self, pos: usize) -> bool {
        let Some(line) = self.store.line_of(pos) else {
            return false;
        };
        let Some(span) = self.span_at_position(line, pos) else {
            return false;
        };

        is_indenting(span.kind) && self.find_span_start_line(&span, line) == line
    }

    /// The earlier line whose indentation the text at `pos` should match,
    /// because it opened the span that `pos` closes. Otherwise the line of
    /// `pos` itself.
    pub fn find_matching_indent_block(&self, pos: usize) -> Option<usize> {
        let line = self.store.line_of(pos)?;
        let Some(spans) = self.store.line_spans(line) else {
            return Some(line);
        };

        for span in spans {
            if span.start > pos {
                break;
            }
            if is_indenting(span.kind) && span.end == Some(pos) {
                return Some(self.find_span_start_line(span, line));
            }
        }
        Some(line)
    }

    /// Like [`find_matching_indent_block`](Self::find_matching_indent_block),
    /// for the first span that ends anywhere on `line`.
    pub fn find_matching_indent_block_for_line(&self, line: usize) -> Option<usize> {
        if line >= self.store.line_count() {
            return None;
        }
        let Some(spans) = self.store.line_spans(line) else {
            return Some(line);
        };

        let start_line = spans
            .iter()
            .find(|span| is_indenting(span.kind) && span.end.is_some())
            .map_or(line, |span| self.find_span_start_line(span, line));
        Some(start_line)
    }

    /// Whether a left leaning span (code, math or raw) starts on `line`.
    pub fn starts_left_leaning_span(&self, line: usize) -> bool {
        if line >= self.store.line_count() {
            return false;
        }
        let line_start = self.store.line_start(line);
        self.store.line_spans(line).is_some_and(|spans| {
            spans
                .iter()
                .any(|span| span.start >= line_start && is_left_leaning(span.kind))
        })
    }

    /// Whether `line` begins in a context where it may be a list item.
    pub fn can_start_with_list_item(&self, line: usize) -> bool {
        if line >= self.store.line_count() {
            return false;
        }
        let span = self.span_at_position(line, self.store.line_start(line));
        span.map_or(true, |span| {
            matches!(span.kind, StateKind::Content | StateKind::ContentBlock)
        })
    }

    /// The closing character to insert automatically after `open` is typed at
    /// the cursor, if any.
    pub fn get_matching_close_bracket(&self, cursor: Cursor, open: char) -> Option<char> {
        let line = self.store.line_of(cursor.position)?;
        let (prev_state, state) = self.states_for_bracket_insertion(line, cursor.position);

        let line_start = self.store.line_start(line);
        let prev_char = self
            .store
            .line_text(line)
            .get(..cursor.position - line_start)
            .and_then(|before| before.chars().next_back());

        let in_code = state.is_code_holder();
        let in_math = state.is_math_holder();
        let in_content = state.is_content_holder();
        // A variable name may be the start of a call
        let in_function_call = matches!(
            state,
            StateKind::CodeVariableName | StateKind::CodeFunctionName
        );
        let in_raw = matches!(state, StateKind::ContentRaw | StateKind::ContentRawBlock);
        let after_hash = prev_char == Some('#');
        let after_backslash = prev_char == Some('\\');

        let close = match open {
            '(' if in_code || in_function_call || in_math || (in_content && after_hash) => ')',
            '{' if in_code || ((in_content || in_math) && after_hash) => '}',
            '[' if in_code
                || in_function_call
                || ((in_content || in_math) && after_hash)
                || matches!(
                    prev_state,
                    Some(StateKind::CodeArguments | StateKind::ContentBlock)
                ) =>
            {
                ']'
            }
            '$' if in_code || (in_content && !after_backslash) => '$',
            '"' if in_code
                || in_math
                || ((in_content || in_raw)
                    && !after_backslash
                    && (!prev_char.is_some_and(is_hebrew) || cursor.has_selection())) =>
            {
                '"'
            }
            '<' if in_content => '>',
            '*' if in_content && state != StateKind::ContentStrongEmphasis => '*',
            '_' if in_content && state != StateKind::ContentEmphasis => '_',
            _ => return None,
        };
        Some(close)
    }

    /// The expression inserting symbol `name` (e.g. `sym.RR`) at `pos`.
    pub fn get_symbol_expression(&self, pos: usize, name: &str) -> Option<String> {
        let env = self.classify_environment(pos);
        if env == Environment::Unknown || name.is_empty() {
            return None;
        }

        let expression = match env {
            Environment::Other | Environment::Code => name.to_string(),
            Environment::Math if name.starts_with("sym.") => name["sym.".len()..].to_string(),
            _ => format!("#{name}"),
        };
        Some(expression)
    }

    pub fn get_color_expression(&self, pos: usize, color: Rgba) -> Option<String> {
        let env = self.classify_environment(pos);
        if env == Environment::Unknown {
            return None;
        }

        let expression = format!("rgb(\"{}\")", color.hex_name());
        if env == Environment::Code {
            Some(expression)
        } else {
            Some(format!("#{expression}"))
        }
    }

    /// A reference to `label` at `pos`: `@label` in prose, a string elsewhere.
    pub fn get_label_ref_expression(&self, pos: usize, label: &str) -> Option<String> {
        let env = self.classify_environment(pos);
        if env == Environment::Unknown || label.is_empty() {
            return None;
        }

        if env == Environment::Content {
            Some(format!("@{label}"))
        } else {
            Some(format!("\"{label}\""))
        }
    }

    /// The innermost span of `line` still in effect at `pos`.
    pub fn span_at_position(&self, line: usize, pos: usize) -> Option<StateSpan> {
        let spans = self.store.line_spans(line)?;
        spans
            .iter()
            .rev()
            .find(|span| span.start < pos && span.end.map_or(true, |end| end >= pos))
            .copied()
    }

    /// The state just before the cursor, and the state the cursor is in.
    fn states_for_bracket_insertion(
        &self,
        line: usize,
        pos: usize,
    ) -> (Option<StateKind>, StateKind) {
        let mut prev_state = None;
        let mut state = None;

        // States already closed by the parser, such as names or block scoped
        // states ended by the line end, still count as current
        if pos > self.store.line_start(line) {
            if let Some(span) = self.span_at_position(line, pos - 1) {
                prev_state = Some(span.kind);
                if span.implicitly_closed {
                    state = Some(span.kind);
                }
            }
        }

        let state = state.unwrap_or_else(|| {
            self.span_at_position(line, pos)
                .map_or(StateKind::Content, |span| span.kind)
        });
        (prev_state, state)
    }

    fn find_span_start_line(&self, span: &StateSpan, line: usize) -> usize {
        if span.start >= self.store.line_start(line) {
            return line;
        }
        self.store.line_of(span.start).unwrap_or(line)
    }

    fn find_span_end(&self, id: SpanId, from_line: usize) -> Option<usize> {
        let last_line = self.store.line_count();
        for (scanned, line) in (from_line..last_line).enumerate() {
            if scanned > MAX_LINES_TO_SCAN {
                return None;
            }
            let Some(spans) = self.store.line_spans(line) else {
                continue;
            };
            if let Some(end) = spans.find_by_id(id).and_then(|span| span.end) {
                return Some(end);
            }
        }
        None
    }
}
