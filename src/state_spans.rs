use crate::parser::{ParserState, ParsingListener, StateKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Identity of a state span, stable across the lines the span covers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SpanId(pub u64);

impl SpanId {
    /// Returns the current value and advances the counter.
    pub fn take(&mut self) -> SpanId {
        let id = *self;
        self.0 += 1;
        id
    }
}

/// The extent of one parser state, in global (document) byte offsets.
///
/// `end` is the offset of the last character of the state, inclusive, or
/// `None` while the state continues past the end of the line it was
/// recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateSpan {
    pub id: SpanId,
    pub kind: StateKind,
    pub start: usize,
    pub end: Option<usize>,
    pub implicitly_closed: bool,
}

impl StateSpan {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Start ascending, then the longer span first, then creation order.
fn span_order(lhs: &StateSpan, rhs: &StateSpan) -> Ordering {
    lhs.start
        .cmp(&rhs.start)
        .then_with(|| match (lhs.end, rhs.end) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => r.cmp(&l),
        })
        .then_with(|| lhs.id.cmp(&rhs.id))
}

/// The spans of every state active on one line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSpanList {
    spans: Vec<StateSpan>,
}

impl StateSpanList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spans(spans: Vec<StateSpan>) -> Self {
        let mut list = Self { spans };
        list.sort();
        list
    }

    pub fn as_slice(&self) -> &[StateSpan] {
        &self.spans
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StateSpan> {
        self.spans.iter()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn sort(&mut self) {
        self.spans.sort_by(span_order);
    }

    pub fn is_sorted(&self) -> bool {
        self.spans
            .windows(2)
            .all(|pair| span_order(&pair[0], &pair[1]) != Ordering::Greater)
    }

    /// Spans still open at the end of the line, outermost first. These seed
    /// the parse of the following line.
    pub fn open_spans(&self) -> StateSpanList {
        Self {
            spans: self.spans.iter().filter(|s| s.is_open()).copied().collect(),
        }
    }

    pub fn open_state_kinds(&self) -> Vec<StateKind> {
        self.spans
            .iter()
            .filter(|s| s.is_open())
            .map(|s| s.kind)
            .collect()
    }

    pub fn find_by_id(&self, id: SpanId) -> Option<&StateSpan> {
        self.spans.iter().find(|s| s.id == id)
    }

    /// Moves every position at or after `from` by `delta` bytes.
    pub fn shift(&mut self, from: usize, delta: isize) {
        let moved = |pos: usize| {
            if pos >= from {
                pos.saturating_add_signed(delta)
            } else {
                pos
            }
        };
        for span in &mut self.spans {
            span.start = moved(span.start);
            span.end = span.end.map(moved);
        }
    }
}

impl<'a> IntoIterator for &'a StateSpanList {
    type Item = &'a StateSpan;
    type IntoIter = std::slice::Iter<'a, StateSpan>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}

/// Records the extent of every pushed state, and of code names, as
/// [`StateSpan`]s in global offsets.
///
/// Register it with `finalize_on_end` off, so that states still open at the
/// end of the line keep an open end.
pub struct StateSpansListener<'c> {
    spans: Vec<StateSpan>,
    /// Indices into `spans` of the spans still open, innermost last.
    open: Vec<usize>,
    base_offset: usize,
    next_id: &'c mut SpanId,
}

impl<'c> StateSpansListener<'c> {
    /// `initial` holds the spans continuing from the previous line, in the
    /// order their states were pushed.
    pub fn new(initial: StateSpanList, base_offset: usize, next_id: &'c mut SpanId) -> Self {
        let open = (0..initial.spans.len())
            .filter(|&i| initial.spans[i].is_open())
            .collect();
        Self {
            spans: initial.spans,
            open,
            base_offset,
            next_id,
        }
    }

    pub fn into_spans(self) -> StateSpanList {
        StateSpanList::from_spans(self.spans)
    }

    fn global_end(&self, state: &ParserState, end: usize) -> usize {
        (self.base_offset + end)
            .saturating_sub(1)
            .max(self.base_offset + state.start)
    }
}

impl ParsingListener for StateSpansListener<'_> {
    fn initialize_state(&mut self, state: &ParserState, _end: usize) {
        let id = self.next_id.take();
        self.open.push(self.spans.len());
        self.spans.push(StateSpan {
            id,
            kind: state.kind,
            start: self.base_offset + state.start,
            end: None,
            implicitly_closed: false,
        });
    }

    fn finalize_state(&mut self, state: &ParserState, end: usize, implicit: bool) {
        let end = self.global_end(state, end);
        // Only the innermost open span can be the one ending
        let Some(&index) = self.open.last() else {
            return;
        };
        let span = &mut self.spans[index];
        if span.kind == state.kind {
            span.end = Some(end);
            span.implicitly_closed = implicit;
            self.open.pop();
        }
    }

    fn handle_instant_state(&mut self, state: &ParserState, end: usize) {
        if !matches!(
            state.kind,
            StateKind::CodeVariableName | StateKind::CodeFunctionName
        ) {
            return;
        }

        let id = self.next_id.take();
        let end = self.global_end(state, end);
        self.spans.push(StateSpan {
            id,
            kind: state.kind,
            start: self.base_offset + state.start,
            end: Some(end),
            implicitly_closed: true,
        });
    }
}
