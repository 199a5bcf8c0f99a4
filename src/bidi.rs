//! Unicode bidirectional control characters, and injection of isolates into
//! line text for display.

use crate::isolates::{IsolateDirection, IsolateRange};
use crate::utils::{is_strong_ltr, is_strong_rtl};
use serde::Serialize;

pub const ALM_MARK: char = '\u{061C}';
pub const LRM_MARK: char = '\u{200E}';
pub const RLM_MARK: char = '\u{200F}';
pub const LRI_MARK: char = '\u{2066}';
pub const RLI_MARK: char = '\u{2067}';
pub const FSI_MARK: char = '\u{2068}';
pub const PDI_MARK: char = '\u{2069}';

/// Only this many characters are looked at when guessing a direction.
const MAX_DIRECTION_PROBE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextDirection {
    LeftToRight,
    RightToLeft,
    Auto,
}

pub fn is_bidi_control_char(c: char) -> bool {
    matches!(
        c,
        ALM_MARK | LRM_MARK | RLM_MARK | LRI_MARK | RLI_MARK | FSI_MARK | PDI_MARK
    )
}

/// Zero-width marks that only affect the direction of the text around them.
pub fn is_single_bidi_mark(c: char) -> bool {
    matches!(c, ALM_MARK | LRM_MARK | RLM_MARK)
}

/// The direction of the first strong character outside any isolate, or
/// [`TextDirection::Auto`] if none is found near the start of the text.
pub fn natural_text_direction(text: &str) -> TextDirection {
    let mut isolate_level = 0usize;

    for c in text.chars().take(MAX_DIRECTION_PROBE) {
        match c {
            LRI_MARK | RLI_MARK | FSI_MARK => isolate_level += 1,
            PDI_MARK => isolate_level = isolate_level.saturating_sub(1),
            _ if isolate_level > 0 => {}
            _ if is_strong_rtl(c) => return TextDirection::RightToLeft,
            _ if is_strong_ltr(c) => return TextDirection::LeftToRight,
            _ => {}
        }
    }
    TextDirection::Auto
}

/// Line text with isolate control characters injected, for shaping and
/// display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedText {
    pub text: String,
    /// Source offsets where marks were injected, with the number of bytes
    /// injected there. Sorted by offset.
    injections: Vec<(usize, usize)>,
}

impl IsolatedText {
    /// Where the source character at `pos` ended up in the display text.
    pub fn to_display(&self, pos: usize) -> usize {
        let shift: usize = self
            .injections
            .iter()
            .take_while(|(at, _)| *at <= pos)
            .map(|(_, bytes)| bytes)
            .sum();
        pos + shift
    }

    /// The source offset of display position `pos`. Positions on an injected
    /// mark map to the source character following it.
    pub fn to_source(&self, pos: usize) -> usize {
        let mut shift = 0;
        for &(at, bytes) in &self.injections {
            if pos < at + shift {
                break;
            }
            if pos < at + shift + bytes {
                return at;
            }
            shift += bytes;
        }
        pos - shift
    }
}

fn ceil_char_boundary(text: &str, mut pos: usize) -> usize {
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos.min(text.len())
}

/// Surrounds every isolate range with an opening mark (FSI for automatic
/// direction, LRI for left-to-right) and a closing PDI.
pub fn inject_isolates(text: &str, isolates: &[IsolateRange]) -> IsolatedText {
    // (position, closes before opens, longer first, mark)
    let mut marks: Vec<(usize, bool, usize, char)> = Vec::with_capacity(isolates.len() * 2);
    for isolate in isolates {
        let start = ceil_char_boundary(text, isolate.start);
        let end = ceil_char_boundary(text, isolate.end + 1);
        if start >= end {
            continue;
        }

        let opening = match isolate.direction {
            IsolateDirection::Auto => FSI_MARK,
            IsolateDirection::LeftToRight => LRI_MARK,
        };
        marks.push((start, false, usize::MAX - end, opening));
        marks.push((end, true, 0, PDI_MARK));
    }
    // Closing marks sort before opening ones at the same position
    marks.sort_by(|a, b| (a.0, !a.1, a.2).cmp(&(b.0, !b.1, b.2)));

    let mut result = String::with_capacity(text.len() + marks.len() * 3);
    let mut injections: Vec<(usize, usize)> = Vec::new();
    let mut copied = 0;

    for (pos, _, _, mark) in marks {
        result.push_str(&text[copied..pos]);
        copied = pos;
        result.push(mark);

        match injections.last_mut() {
            Some((at, bytes)) if *at == pos => *bytes += mark.len_utf8(),
            _ => injections.push((pos, mark.len_utf8())),
        }
    }
    result.push_str(&text[copied..]);

    IsolatedText {
        text: result,
        injections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_chars() {
        for c in [ALM_MARK, LRM_MARK, RLM_MARK, LRI_MARK, RLI_MARK, FSI_MARK, PDI_MARK] {
            assert!(is_bidi_control_char(c));
        }
        assert!(!is_bidi_control_char('a'));
        assert!(is_single_bidi_mark(LRM_MARK));
        assert!(!is_single_bidi_mark(PDI_MARK));
    }

    #[test]
    fn test_natural_text_direction() {
        assert_eq!(natural_text_direction("Hello"), TextDirection::LeftToRight);
        assert_eq!(natural_text_direction("שלום world"), TextDirection::RightToLeft);
        assert_eq!(natural_text_direction("123 שלום"), TextDirection::RightToLeft);
        assert_eq!(natural_text_direction("= 1 + 2"), TextDirection::Auto);
        assert_eq!(
            natural_text_direction("\u{2066}abc\u{2069} שלום"),
            TextDirection::RightToLeft
        );
    }

    #[test]
    fn test_direction_probe_is_bounded() {
        let text = format!("{}a", " ".repeat(MAX_DIRECTION_PROBE));
        assert_eq!(natural_text_direction(&text), TextDirection::Auto);
    }

    #[test]
    fn test_inject_isolates() {
        let isolates = [
            IsolateRange::new(IsolateDirection::LeftToRight, 0, 5),
            IsolateRange::new(IsolateDirection::Auto, 3, 4),
        ];
        let isolated = inject_isolates("#f[ab] c", &isolates);
        assert_eq!(isolated.text, "\u{2066}#f[\u{2068}ab\u{2069}]\u{2069} c");

        assert_eq!(isolated.to_display(0), 3);
        assert_eq!(isolated.to_display(3), 9);
        assert_eq!(isolated.to_display(5), 14);
        assert_eq!(isolated.to_display(6), 18);

        assert_eq!(isolated.to_source(0), 0);
        assert_eq!(isolated.to_source(3), 0);
        assert_eq!(isolated.to_source(9), 3);
        assert_eq!(isolated.to_source(18), 6);
        for pos in 0..=8 {
            assert_eq!(isolated.to_source(isolated.to_display(pos)), pos);
        }
    }

    #[test]
    fn test_inject_isolates_multibyte_end() {
        // The isolate ends on the last byte of a two byte character
        let isolated = inject_isolates(
            "a éé b",
            &[IsolateRange::new(IsolateDirection::Auto, 2, 5)],
        );
        assert_eq!(isolated.text, "a \u{2068}éé\u{2069} b");
    }

    #[test]
    fn test_no_isolates() {
        let isolated = inject_isolates("plain", &[]);
        assert_eq!(isolated.text, "plain");
        assert_eq!(isolated.to_display(3), 3);
        assert_eq!(isolated.to_source(3), 3);
    }
}
