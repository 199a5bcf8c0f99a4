use crate::parser::{ParserState, ParsingListener, StateKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsolateDirection {
    /// Direction taken from the first strong character in the range.
    Auto,
    LeftToRight,
}

/// A range of text whose directionality should be isolated from the
/// surrounding text when reordering for display. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IsolateRange {
    pub direction: IsolateDirection,
    pub start: usize,
    pub end: usize,
    #[serde(skip)]
    pub discard: bool,
}

impl IsolateRange {
    pub fn new(direction: IsolateDirection, start: usize, end: usize) -> Self {
        Self {
            direction,
            start,
            end,
            discard: false,
        }
    }
}

/// Finds short runs of weakly directional text, i.e. math, inline code,
/// references and content blocks inline with them, that should be isolated.
///
/// Code constructs that follow each other are merged into a single range.
/// Ranges for whole code blocks and lines, or for code left open at the end
/// of the text, are dropped.
#[derive(Debug)]
pub struct IsolatesListener {
    ranges: Vec<IsolateRange>,
    /// Indices into `ranges` of the code ranges opened at each nesting level.
    code_ranges_for_level: Vec<Vec<usize>>,
}

impl Default for IsolatesListener {
    fn default() -> Self {
        Self {
            ranges: Vec::new(),
            code_ranges_for_level: vec![Vec::new()],
        }
    }
}

impl IsolatesListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolate_ranges(&self) -> Vec<IsolateRange> {
        self.ranges.iter().filter(|r| !r.discard).copied().collect()
    }

    fn current_level(&mut self) -> &mut Vec<usize> {
        if self.code_ranges_for_level.is_empty() {
            self.code_ranges_for_level.push(Vec::new());
        }
        let last = self.code_ranges_for_level.len() - 1;
        &mut self.code_ranges_for_level[last]
    }

    fn push_level(&mut self) {
        self.code_ranges_for_level.push(Vec::new());
    }

    fn pop_level(&mut self) {
        // The outermost level is never closed
        if self.code_ranges_for_level.len() > 1 {
            self.code_ranges_for_level.pop();
        }
    }

    fn add_range(&mut self, direction: IsolateDirection, start: usize, end: usize) {
        if start <= end {
            self.ranges.push(IsolateRange::new(direction, start, end));
        }
    }

    /// Extends or merges the last code range of the current level with a new
    /// code construct, or starts a new range. Returns the index of the range
    /// covering the construct, if any.
    fn create_or_update_code_range(
        &mut self,
        kind: StateKind,
        start: usize,
        end: usize,
    ) -> Option<usize> {
        if let Some(&index) = self.current_level().last() {
            let existing = &mut self.ranges[index];

            if start == existing.end + 1 {
                existing.end = end;
                return Some(index);
            }
            if existing.start <= end && existing.end >= start {
                let original_start = existing.start;
                existing.start = existing.start.min(start);
                existing.end = existing.end.max(end);
                if existing.start < original_start {
                    self.discard_redundant_code_ranges();
                }
                return Some(index);
            }
        }

        // Content blocks get their own range when finalized
        if kind == StateKind::ContentBlock {
            return None;
        }

        let index = self.ranges.len();
        self.ranges
            .push(IsolateRange::new(IsolateDirection::LeftToRight, start, end));
        self.current_level().push(index);
        Some(index)
    }

    /// After the last code range of the level grew backwards, folds earlier
    /// ranges it now touches or covers into it.
    fn discard_redundant_code_ranges(&mut self) {
        let Some(level) = self.code_ranges_for_level.last_mut() else {
            return;
        };
        let Some(&reference_index) = level.last() else {
            return;
        };

        while level.len() > 1 {
            let i = level.len() - 2;
            let candidate = self.ranges[level[i]];
            let reference = &mut self.ranges[reference_index];

            if reference.start == candidate.end + 1 {
                reference.start = candidate.start;
            } else if reference.start <= candidate.end && reference.end >= candidate.end {
                reference.start = reference.start.min(candidate.start);
            } else {
                return;
            }
            self.ranges[level[i]].discard = true;
            level.remove(i);
        }
    }
}

impl ParsingListener for IsolatesListener {
    fn initialize_state(&mut self, state: &ParserState, end: usize) {
        if state.rolled_over {
            return;
        }

        match state.kind {
            StateKind::ContentBlock | StateKind::Math => self.push_level(),
            StateKind::CodeExpressionChain => {
                // Cover the "." that started the chain
                if let Some(&index) = self.current_level().last() {
                    self.ranges[index].end = end.saturating_sub(1);
                }
            }
            _ => {}
        }
    }

    fn finalize_state(&mut self, state: &ParserState, end: usize, implicit: bool) {
        if state.rolled_over {
            return;
        }

        let last = end.saturating_sub(1).max(state.start);

        if matches!(state.kind, StateKind::ContentBlock | StateKind::Math) {
            self.pop_level();
        }

        if !implicit {
            match state.kind {
                StateKind::ContentReference => {
                    self.add_range(IsolateDirection::Auto, state.start, last);
                }
                StateKind::ContentBlock => {
                    // Without the brackets
                    if let Some(inner_end) = last.checked_sub(1) {
                        self.add_range(IsolateDirection::Auto, state.start + 1, inner_end);
                    }
                }
                StateKind::Math => {
                    self.add_range(IsolateDirection::LeftToRight, state.start, last);
                }
                _ => {}
            }
        }

        if state.kind.is_code() || state.kind == StateKind::ContentBlock {
            let Some(index) = self.create_or_update_code_range(state.kind, state.start, last)
            else {
                return;
            };

            if implicit || matches!(state.kind, StateKind::CodeBlock | StateKind::CodeLine) {
                self.ranges[index].discard = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn isolates(text: &str) -> Vec<(IsolateDirection, usize, usize)> {
        let mut listener = IsolatesListener::new();
        let mut parser = Parser::new(text, &[]);
        parser.add_listener(&mut listener, true);
        parser.parse();
        listener
            .isolate_ranges()
            .into_iter()
            .map(|r| (r.direction, r.start, r.end))
            .collect()
    }

    #[test]
    fn test_plain_text_has_no_isolates() {
        assert!(isolates("שלום world").is_empty());
    }

    #[test]
    fn test_math_is_left_to_right() {
        assert_eq!(
            isolates("a $x + 1$ b"),
            vec![(IsolateDirection::LeftToRight, 2, 8)]
        );
    }

    #[test]
    fn test_reference_is_auto() {
        assert_eq!(isolates("see @intro now"), vec![(IsolateDirection::Auto, 4, 9)]);
    }

    #[test]
    fn test_function_call_merges_into_one_range() {
        // "#f" then "(x)" are adjacent
        assert_eq!(
            isolates("a #f(x) b"),
            vec![(IsolateDirection::LeftToRight, 2, 6)]
        );
    }

    #[test]
    fn test_content_block_argument() {
        assert_eq!(
            isolates("#f[ab] c"),
            vec![
                (IsolateDirection::LeftToRight, 0, 5),
                (IsolateDirection::Auto, 3, 4),
            ]
        );
    }

    #[test]
    fn test_empty_content_block_has_no_interior() {
        assert_eq!(
            isolates("#f[] c"),
            vec![(IsolateDirection::LeftToRight, 0, 3)]
        );
    }

    #[test]
    fn test_expression_chain_is_one_range() {
        assert_eq!(
            isolates("#x.len() b"),
            vec![(IsolateDirection::LeftToRight, 0, 7)]
        );
    }

    #[test]
    fn test_code_lines_and_blocks_are_discarded() {
        assert!(isolates("#let x = 1").is_empty());
        assert!(isolates("#{ 1 }").is_empty());
    }

    #[test]
    fn test_unterminated_code_is_discarded() {
        assert!(isolates("#f(x, ").is_empty());
    }

    #[test]
    fn test_rolled_over_states_are_ignored() {
        let mut listener = IsolatesListener::new();
        let mut parser = Parser::new("x) b", &[StateKind::CodeArguments]);
        parser.add_listener(&mut listener, true);
        parser.parse();
        assert!(listener.isolate_ranges().is_empty());
    }
}
