/// Returns true for ASCII digits `0`-`9` only.
pub fn is_ascii_digit(c: char) -> bool {
    c.is_ascii_digit()
}

pub fn is_ascii_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

/// Number base prefixes: `b` (binary), `o` (octal) and `x` (hex).
pub fn is_base_indicator(c: char) -> bool {
    matches!(c, 'b' | 'o' | 'x')
}

/// Letters and numbers of any script.
pub fn is_letter_or_number(c: char) -> bool {
    c.is_alphanumeric()
}

/// Characters that may continue a word once it started: letters, numbers,
/// combining marks, `_` and `-`.
pub fn is_word_continuation(c: char) -> bool {
    c == '_' || c == '-' || c.is_alphanumeric() || unicode_ident::is_xid_continue(c)
}

/// Horizontal whitespace: Unicode space separators and tab. Line breaks are
/// not included.
pub fn is_horizontal_space(c: char) -> bool {
    matches!(
        c,
        '\t' | ' '
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// `\r`, `\n` and the Unicode line and paragraph separators.
pub fn is_line_end(c: char) -> bool {
    matches!(c, '\r' | '\n' | '\u{2028}' | '\u{2029}')
}

/// Characters of the Hebrew script block and its presentation forms.
pub fn is_hebrew(c: char) -> bool {
    matches!(c, '\u{0590}'..='\u{05FF}' | '\u{FB1D}'..='\u{FB4F}')
}

/// Characters with a strong right-to-left direction.
pub fn is_strong_rtl(c: char) -> bool {
    matches!(
        c,
        '\u{0590}'..='\u{08FF}'
            | '\u{FB1D}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFF}'
            | '\u{10800}'..='\u{10FFF}'
            | '\u{1E800}'..='\u{1EFFF}'
    ) && c.is_alphabetic()
}

/// Characters with a strong left-to-right direction.
pub fn is_strong_ltr(c: char) -> bool {
    c.is_alphabetic() && !is_strong_rtl(c)
}

/// Converts a byte offset within `text` into a 1-based line and column pair,
/// counting columns in characters.
pub fn get_line_and_column(text: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (i, c) in text.char_indices() {
        if i >= position {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}
