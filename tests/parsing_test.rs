use typline::highlighting::MarkerKind;
use typline::parser::StateKind;
use typline::state_spans::{SpanId, StateSpanList};
use typline::{analyze, analyze_line, LineAnalysis};

fn markers_of(analysis: &LineAnalysis, kind: MarkerKind) -> Vec<(usize, usize)> {
    analysis
        .markers
        .iter()
        .filter(|m| m.kind == kind)
        .map(|m| (m.start, m.length))
        .collect()
}

fn single_line(text: &str) -> LineAnalysis {
    let mut ids = SpanId::default();
    analyze_line(text, &StateSpanList::new(), 0, &mut ids)
}

#[test]
fn test_identical_input_gives_identical_output() {
    let text = "#let f(x) = [*bold* $x^2$ `raw`] // done";
    let previous = StateSpanList::new();
    let mut first_ids = SpanId(40);
    let mut second_ids = SpanId(40);

    let first = analyze_line(text, &previous, 17, &mut first_ids);
    let second = analyze_line(text, &previous, 17, &mut second_ids);
    assert_eq!(first, second);
    assert_eq!(first_ids, second_ids);
}

#[test]
fn test_malformed_input_terminates() {
    for text in [
        "#", "$", "`", "```", "#{", "#(", "#[", "/*", "*/", "\\", "#let", "#f(", "<", "@",
        "$ \" $", "#{ ( [ $", "__**``", "#x.", "#1e", "0x", "-", "=", "/ ", "- + /",
        "#!", "https://", "\u{0591}#", "#{\"\\", "$ #f( $",
    ] {
        let analysis = single_line(text);
        for marker in &analysis.markers {
            assert!(marker.end() <= text.len(), "marker past end in {text:?}");
        }
        for segment in &analysis.segments {
            assert!(segment.end() <= text.len(), "segment past end in {text:?}");
        }
    }
}

#[test]
fn test_span_lists_are_sorted() {
    for analysis in analyze("#f(a, [b *c* $d$], {\n  e(f)\n}) text #g[h] $ i(j) $") {
        assert!(analysis.spans.is_sorted());
    }
}

#[test]
fn test_bracket_spans_match() {
    let analysis = single_line("#foo(bar, [baz])");
    let arguments = analysis
        .spans
        .iter()
        .find(|s| s.kind == StateKind::CodeArguments)
        .copied();
    assert_eq!(arguments.map(|s| (s.start, s.end)), Some((4, Some(15))));
}

#[test]
fn test_comment_takes_priority() {
    let analysis = single_line("// not #a/keyword");
    assert_eq!(analysis.markers.len(), 1);
    assert_eq!(markers_of(&analysis, MarkerKind::Comment), vec![(0, 17)]);
    assert!(analysis
        .spans
        .iter()
        .all(|s| !s.kind.is_code() && s.kind != StateKind::Math));
}

#[test]
fn test_emphasis_toggles() {
    let analysis = single_line("_a_ b _c_");
    assert_eq!(
        markers_of(&analysis, MarkerKind::Emphasis),
        vec![(0, 3), (6, 3)]
    );
}

#[test]
fn test_raw_continues_across_lines() {
    let lines = analyze("#let x = `\nstill raw #f(x)\nend` after");
    assert_eq!(lines.len(), 3);
    assert!(lines[0].open_state_kinds().contains(&StateKind::ContentRaw));
    assert!(lines[1].open_state_kinds().contains(&StateKind::ContentRaw));
    assert!(markers_of(&lines[1], MarkerKind::FunctionName).is_empty());
    assert_eq!(markers_of(&lines[1], MarkerKind::Raw), vec![(0, 15)]);
    assert!(lines[2].open_state_kinds().is_empty());
}

#[test]
fn test_only_the_math_string_is_a_literal() {
    let analysis = single_line(r#""not a literal" $ "yes" + 1$"#);
    assert_eq!(markers_of(&analysis, MarkerKind::StringLiteral), vec![(18, 5)]);
}

#[test]
fn test_block_comment_spans_lines() {
    let lines = analyze("text /* start\nmiddle\nend */ more");
    assert_eq!(markers_of(&lines[0], MarkerKind::Comment), vec![(5, 8)]);
    assert_eq!(markers_of(&lines[1], MarkerKind::Comment), vec![(0, 6)]);
    assert_eq!(markers_of(&lines[2], MarkerKind::Comment), vec![(0, 6)]);
    assert_eq!(lines[2].segments.last().map(|s| (s.start, s.length)), Some((6, 5)));
}

#[test]
fn test_code_block_keeps_lines_in_code() {
    let lines = analyze("#{\n  let y = 1\n}");
    assert_eq!(lines[0].open_state_kinds(), vec![StateKind::CodeBlock]);
    assert_eq!(markers_of(&lines[1], MarkerKind::Keyword), vec![(2, 3)]);
    assert!(lines[1].segments.is_empty());
    assert!(lines[2].open_state_kinds().is_empty());
}

#[test]
fn test_spans_use_document_offsets() {
    let lines = analyze("first\n#{x}");
    let block = lines[1].spans.iter().next().copied();
    assert_eq!(block.map(|s| (s.kind, s.start, s.end)), Some((StateKind::CodeBlock, 7, Some(9))));
}

#[test]
fn test_heading_ends_with_line() {
    let lines = analyze("= Title _x_\nnext line");
    assert_eq!(markers_of(&lines[0], MarkerKind::Heading), vec![(0, 11)]);
    assert_eq!(markers_of(&lines[0], MarkerKind::Emphasis), vec![(8, 3)]);
    assert!(lines[0].open_state_kinds().is_empty());
    assert!(lines[1].markers.is_empty());
}
