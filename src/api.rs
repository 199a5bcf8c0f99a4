use crate::content_words::{ContentSegment, ContentWordsListener};
use crate::highlighting::{HighlightingListener, HighlightingMarker, MarkerKind};
use crate::isolates::{IsolateRange, IsolatesListener};
use crate::parser::{Parser, StateKind};
use crate::state_spans::{SpanId, StateSpanList, StateSpansListener};
use serde::Serialize;

/// Everything learned from parsing one line.
///
/// Markers, segments and isolate ranges are relative to the line; state spans
/// use global offsets so they can be followed across lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineAnalysis {
    pub markers: Vec<HighlightingMarker>,
    pub segments: Vec<ContentSegment>,
    pub isolates: Vec<IsolateRange>,
    pub spans: StateSpanList,
}

impl LineAnalysis {
    /// The analysis of a `#!` interpreter line, which is not markup.
    pub fn shebang(text: &str) -> Self {
        let mut analysis = Self::default();
        if !text.is_empty() {
            analysis
                .markers
                .push(HighlightingMarker::new(MarkerKind::Comment, 0, text.len()));
        }
        analysis
    }

    /// Kinds of the states continuing onto the next line, outermost first.
    #[must_use]
    pub fn open_state_kinds(&self) -> Vec<StateKind> {
        self.spans.open_state_kinds()
    }

    /// Serializes the analysis into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the analysis into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

/// Parses one line of a document with every listener attached.
///
/// `previous` holds the state spans of the preceding line (empty for the
/// first line); its open spans seed the parse. `base_offset` is the global
/// position of the line's first character, and `next_id` hands out ids for
/// the spans opened on this line.
pub fn analyze_line(
    text: &str,
    previous: &StateSpanList,
    base_offset: usize,
    next_id: &mut SpanId,
) -> LineAnalysis {
    let initial = previous.open_spans();
    let initial_states = initial.open_state_kinds();

    let mut spans = StateSpansListener::new(initial, base_offset, next_id);
    let mut highlighting = HighlightingListener::new();
    let mut content = ContentWordsListener::new();
    let mut isolates = IsolatesListener::new();

    let mut parser = Parser::new(text, &initial_states);
    parser.add_listener(&mut spans, false);
    parser.add_listener(&mut highlighting, true);
    parser.add_listener(&mut content, true);
    parser.add_listener(&mut isolates, true);
    parser.parse();

    LineAnalysis {
        markers: highlighting.into_markers(),
        segments: content.into_segments(),
        isolates: isolates.isolate_ranges(),
        spans: spans.into_spans(),
    }
}

/// Analyzes a whole text, line by line, with span ids starting at zero.
pub fn analyze(text: &str) -> Vec<LineAnalysis> {
    let mut next_id = SpanId::default();
    let mut previous = StateSpanList::new();
    let mut base_offset = 0;
    let mut result = Vec::new();

    for line in text.split('\n') {
        let analysis = analyze_line(line, &previous, base_offset, &mut next_id);
        base_offset += line.len() + 1;
        previous = analysis.spans.clone();
        result.push(analysis);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_line_collects_all_outputs() {
        let mut ids = SpanId::default();
        let analysis = analyze_line("Hi $x$ #f(y)", &StateSpanList::new(), 0, &mut ids);

        assert!(analysis
            .markers
            .iter()
            .any(|m| m.kind == MarkerKind::FunctionName));
        assert_eq!(analysis.segments.first().map(|s| s.start), Some(0));
        assert!(!analysis.isolates.is_empty());
        assert!(!analysis.spans.is_empty());
        assert!(analysis.open_state_kinds().is_empty());
    }

    #[test]
    fn test_open_states_seed_next_line() {
        let lines = analyze("#let x = `raw\nstill raw` out");
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].open_state_kinds(),
            vec![StateKind::CodeLine, StateKind::ContentRaw]
        );
        assert!(lines[1].open_state_kinds().is_empty());
        assert!(lines[1]
            .markers
            .iter()
            .any(|m| m.kind == MarkerKind::Raw && m.start == 0 && m.length == 10));
    }

    #[test]
    fn test_same_input_same_output() {
        let mut a = SpanId(7);
        let mut b = SpanId(7);
        let previous = StateSpanList::new();
        assert_eq!(
            analyze_line("#{ f(x) }", &previous, 3, &mut a),
            analyze_line("#{ f(x) }", &previous, 3, &mut b)
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_shebang_analysis() {
        let analysis = LineAnalysis::shebang("#!/usr/bin/env typst");
        assert_eq!(
            analysis.markers,
            vec![HighlightingMarker::new(MarkerKind::Comment, 0, 20)]
        );
        assert!(analysis.spans.is_empty());
    }

    #[test]
    fn test_to_json() {
        let mut ids = SpanId::default();
        let analysis = analyze_line("_a_", &StateSpanList::new(), 0, &mut ids);
        let json: serde_json::Value =
            serde_json::from_str(&analysis.to_json().unwrap()).unwrap();

        assert_eq!(json["markers"][0]["kind"], "Emphasis");
        assert_eq!(json["markers"][0]["start"], 0);
        assert_eq!(json["markers"][0]["length"], 3);
        assert_eq!(json["spans"][0]["kind"], "ContentEmphasis");
    }

    #[test]
    fn test_to_yaml() {
        let mut ids = SpanId::default();
        let analysis = analyze_line("plain", &StateSpanList::new(), 0, &mut ids);
        let yaml = analysis.to_yaml().unwrap();

        assert!(yaml.contains("markers: []"));
        assert!(yaml.contains("start: 0"));
        assert!(yaml.contains("length: 5"));
    }
}
