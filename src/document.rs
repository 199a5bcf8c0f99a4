//! A whole document kept parsed line by line.
//!
//! Edits reparse only the lines they touch, and then keep going only while
//! the states carried into the next line change. Lines after that point keep
//! their cached analysis, with their global span offsets moved.

use crate::api::{analyze_line, LineAnalysis};
use crate::codemodel::{CodeModel, LineStore};
use crate::parser::StateKind;
use crate::settings::{find_mode_line, EditorSettings, ModeSource, MAX_LINE_FOR_MODE_LINES};
use crate::state_spans::{SpanId, StateSpanList};
use log::debug;
use std::ops::Range;

/// The open states a line was parsed with.
type Seed = Vec<(SpanId, StateKind)>;

fn seed_of(spans: &StateSpanList) -> Seed {
    spans
        .iter()
        .filter(|s| s.is_open())
        .map(|s| (s.id, s.kind))
        .collect()
}

fn is_shebang(index: usize, text: &str) -> bool {
    index == 0 && text.starts_with("#!")
}

#[derive(Debug, Clone)]
struct DocumentLine {
    text: String,
    start: usize,
    seed: Seed,
    shebang: bool,
    analysis: LineAnalysis,
}

#[derive(Debug, Clone)]
pub struct Document {
    lines: Vec<DocumentLine>,
    next_id: SpanId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("")
    }
}

impl Document {
    pub fn new(text: &str) -> Self {
        let mut document = Self {
            lines: Vec::new(),
            next_id: SpanId::default(),
        };
        document.splice(0, 0, text.split('\n').map(str::to_string).collect());
        document
    }

    /// The full text, with lines joined by `\n`.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Length of the text in bytes.
    pub fn len(&self) -> usize {
        self.lines
            .last()
            .map_or(0, |last| last.start + last.text.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|l| l.text.as_str())
    }

    pub fn analysis(&self, index: usize) -> Option<&LineAnalysis> {
        self.lines.get(index).map(|l| &l.analysis)
    }

    pub fn analyses(&self) -> impl Iterator<Item = &LineAnalysis> {
        self.lines.iter().map(|l| &l.analysis)
    }

    pub fn code_model(&self) -> CodeModel<'_, Self> {
        CodeModel::new(self)
    }

    /// Replaces the whole text.
    pub fn set_text(&mut self, text: &str) {
        let count = self.lines.len();
        self.replace_lines(0..count, text);
    }

    /// Replaces one line. A `text` holding line breaks becomes several lines.
    pub fn set_line(&mut self, index: usize, text: &str) {
        self.replace_lines(index..index + 1, text);
    }

    /// Inserts a line before `index`, or at the end when `index` is the line
    /// count.
    pub fn insert_line(&mut self, index: usize, text: &str) {
        self.replace_lines(index..index, text);
    }

    /// Removes a line. Removing the only line leaves a single empty line.
    pub fn remove_line(&mut self, index: usize) {
        self.splice(index, 1, Vec::new());
    }

    /// Replaces a range of lines with the lines of `text`. Out of range
    /// indices are clamped to the document.
    pub fn replace_lines(&mut self, lines: Range<usize>, text: &str) {
        let remove = lines.end.saturating_sub(lines.start);
        self.splice(
            lines.start,
            remove,
            text.split('\n').map(str::to_string).collect(),
        );
    }

    /// Settings from `kate:` or `katvan:` mode lines near the top of the
    /// document, later lines overriding earlier ones.
    pub fn mode_lines(&self) -> EditorSettings {
        let mut settings = EditorSettings::default();
        for line in self.lines.iter().take(MAX_LINE_FOR_MODE_LINES) {
            if let Some(mode) = find_mode_line(&line.text) {
                settings.merge(&EditorSettings::from_mode_line(mode, ModeSource::Document));
            }
        }
        settings
    }

    fn splice(&mut self, first: usize, remove: usize, insert: Vec<String>) {
        let first = first.min(self.lines.len());
        let remove = remove.min(self.lines.len() - first);

        let threshold = self
            .lines
            .get(first)
            .map_or_else(|| self.len() + 1, |line| line.start);
        let old_len: usize = self.lines[first..first + remove]
            .iter()
            .map(|l| l.text.len() + 1)
            .sum();
        let new_len: usize = insert.iter().map(|text| text.len() + 1).sum();

        let inserted = insert.len();
        let placeholders = insert.into_iter().map(|text| DocumentLine {
            text,
            start: 0,
            seed: Seed::new(),
            shebang: false,
            analysis: LineAnalysis::default(),
        });
        self.lines.splice(first..first + remove, placeholders);

        let emptied = self.lines.is_empty();
        if emptied {
            self.lines.push(DocumentLine {
                text: String::new(),
                start: 0,
                seed: Seed::new(),
                shebang: false,
                analysis: LineAnalysis::default(),
            });
        }
        let must_parse = if emptied { 1 } else { first + inserted };

        let mut index = first;
        while index < self.lines.len() {
            if index >= must_parse && self.is_up_to_date(index) {
                break;
            }
            self.reparse(index);
            index += 1;
        }

        let delta = new_len as isize - old_len as isize;
        let remaining = self.lines.len() - index;
        debug!(
            "Reparsed lines {first}..{index}, moving {remaining} later lines by {delta} bytes"
        );

        if delta != 0 {
            for line in &mut self.lines[index..] {
                line.start = line.start.saturating_add_signed(delta);
                line.analysis.spans.shift(threshold, delta);
            }
        }
    }

    /// Whether the cached analysis of an unedited line still holds.
    fn is_up_to_date(&self, index: usize) -> bool {
        let line = &self.lines[index];
        let seed = match index.checked_sub(1) {
            Some(previous) => seed_of(&self.lines[previous].analysis.spans),
            None => Seed::new(),
        };
        line.seed == seed && line.shebang == is_shebang(index, &line.text)
    }

    fn reparse(&mut self, index: usize) {
        let (start, previous) = match index.checked_sub(1) {
            Some(p) => {
                let previous = &self.lines[p];
                (
                    previous.start + previous.text.len() + 1,
                    previous.analysis.spans.clone(),
                )
            }
            None => (0, StateSpanList::new()),
        };

        let line = &mut self.lines[index];
        line.start = start;
        line.seed = seed_of(&previous);
        line.shebang = is_shebang(index, &line.text);
        line.analysis = if line.shebang {
            LineAnalysis::shebang(&line.text)
        } else {
            analyze_line(&line.text, &previous, start, &mut self.next_id)
        };
    }
}

impl LineStore for Document {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_start(&self, line: usize) -> usize {
        self.lines.get(line).map_or_else(|| self.len(), |l| l.start)
    }

    fn line_text(&self, line: usize) -> &str {
        self.lines.get(line).map_or("", |l| l.text.as_str())
    }

    fn line_spans(&self, line: usize) -> Option<&StateSpanList> {
        self.lines.get(line).map(|l| &l.analysis.spans)
    }
}
