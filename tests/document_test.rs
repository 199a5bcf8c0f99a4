use typline::codemodel::LineStore;
use typline::highlighting::MarkerKind;
use typline::parser::StateKind;
use typline::settings::IndentMode;
use typline::Document;

const SAMPLE: &str = r#"// katvan: indent-mode typst
= Report <top>

Intro with _emphasis_ and $x^2$, see @top.

#let data = (
  (1, "one"),
  (2, "two"),
)

#for (n, name) in data [
  - Entry #n is *#name*
]

```
raw block
```
/* trailing
comment */ done"#;

/// Everything about a document's analysis except span ids, which depend on
/// the order lines were parsed in.
fn snapshot(doc: &Document) -> Vec<String> {
    doc.analyses()
        .map(|a| {
            let spans: Vec<_> = a
                .spans
                .iter()
                .map(|s| (s.kind, s.start, s.end, s.implicitly_closed))
                .collect();
            format!("{:?} {:?} {:?} {:?}", a.markers, a.segments, a.isolates, spans)
        })
        .collect()
}

fn assert_same_as_fresh(doc: &Document) {
    assert_eq!(snapshot(doc), snapshot(&Document::new(&doc.text())));
}

#[test]
fn test_text_round_trips() {
    let doc = Document::new(SAMPLE);
    assert_eq!(doc.text(), SAMPLE);
    assert_eq!(doc.len(), SAMPLE.len());
    assert_eq!(doc.line_count(), SAMPLE.split('\n').count());
}

#[test]
fn test_every_line_edit_matches_a_fresh_parse() {
    let edits = [
        "#{",
        "}",
        "$",
        "`",
        "/*",
        "*/",
        "plain text",
        "",
        "#f(",
        ")",
        "```",
    ];

    let line_count = Document::new(SAMPLE).line_count();
    for line in 0..line_count {
        for edit in edits {
            let mut doc = Document::new(SAMPLE);
            doc.set_line(line, edit);
            assert_same_as_fresh(&doc);
        }
    }
}

#[test]
fn test_sequences_of_edits() {
    let mut doc = Document::new(SAMPLE);

    doc.insert_line(3, "#let x = [");
    assert_same_as_fresh(&doc);
    doc.insert_line(5, "]");
    assert_same_as_fresh(&doc);
    doc.remove_line(0);
    assert_same_as_fresh(&doc);
    doc.set_line(6, "#let data = (\n  (0, \"zero\"),");
    assert_same_as_fresh(&doc);
    doc.replace_lines(10..14, "");
    assert_same_as_fresh(&doc);
    doc.remove_line(doc.line_count() - 1);
    assert_same_as_fresh(&doc);
    doc.set_text("new $\ncontent$");
    assert_same_as_fresh(&doc);
}

#[test]
fn test_unrelated_edit_keeps_later_lines() {
    let mut doc = Document::new("a\n#{\nx\n}\nend");
    let before: Vec<_> = doc
        .analysis(2)
        .map(|a| a.spans.iter().map(|s| s.id).collect())
        .unwrap_or_default();

    doc.set_line(0, "abc");
    let after: Vec<_> = doc
        .analysis(2)
        .map(|a| a.spans.iter().map(|s| s.id).collect())
        .unwrap_or_default();

    // The block was not reparsed, only moved
    assert_eq!(before, after);
    assert_same_as_fresh(&doc);
}

#[test]
fn test_code_model_follows_edits() {
    let mut doc = Document::new("#f(\n  x\n)");
    assert_eq!(doc.code_model().find_matching_bracket(2), Some(8));

    doc.insert_line(1, "  y,");
    assert_eq!(doc.code_model().find_matching_bracket(2), Some(13));
    assert_eq!(doc.code_model().find_matching_bracket(13), Some(2));

    doc.set_line(0, "#f[");
    assert_eq!(doc.code_model().find_matching_bracket(2), None);
}

#[test]
fn test_shebang_only_on_first_line() {
    let mut doc = Document::new("#!/usr/bin/env run\n#!not shebang");
    let first = doc.analysis(0).map(|a| a.markers.clone()).unwrap_or_default();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind, MarkerKind::Comment);
    assert_eq!(first[0].length, 18);

    doc.remove_line(0);
    assert!(doc
        .analysis(0)
        .is_some_and(|a| a.markers.len() == 1 && a.markers[0].length == 13));
    assert_same_as_fresh(&doc);
}

#[test]
fn test_open_states_at_line_end() {
    let doc = Document::new(SAMPLE);
    let open = |line: usize| doc.analysis(line).map(|a| a.open_state_kinds());

    assert_eq!(open(5), Some(vec![StateKind::CodeLine, StateKind::CodeArguments]));
    assert_eq!(open(8), Some(vec![]));
    assert_eq!(open(15), Some(vec![StateKind::ContentRawBlock]));
    assert_eq!(open(17), Some(vec![StateKind::CommentBlock]));
    assert_eq!(open(18), Some(vec![]));
}

#[test]
fn test_mode_lines() {
    let mut doc = Document::new(SAMPLE);
    assert_eq!(doc.mode_lines().indent_mode, Some(IndentMode::Smart));

    doc.set_line(0, "// no settings");
    assert_eq!(doc.mode_lines().indent_mode, None);
}
