use crate::utils::{
    is_ascii_digit, is_ascii_hex_digit, is_base_indicator, is_horizontal_space,
    is_letter_or_number, is_line_end, is_word_continuation,
};
use serde::Serialize;

/// The kinds of tokens produced by the [`Tokenizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    /// Zero-length sentinel emitted before the first character.
    Begin,
    /// Zero-length sentinel emitted once the input is exhausted.
    TextEnd,
    /// Letters, numbers and marks, with embedded `_` and `-`.
    Word,
    /// A numeric literal, possibly with a base prefix, fraction and exponent.
    CodeNumber,
    /// A backslash escape, e.g. `\*` or `\u{1F600}`.
    Escape,
    /// A run of horizontal whitespace.
    Whitespace,
    /// A single line break. `\r\n` is one token.
    LineEnd,
    /// Any other single character.
    Symbol,
}

/// A token with its kind, position and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub start: usize,
    pub text: &'a str,
    /// Set by the `Discard` matcher; such tokens do not count towards the
    /// range of a match.
    pub discard: bool,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, start: usize, text: &'a str) -> Token<'a> {
        Token {
            kind,
            start,
            text,
            discard: false,
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte offset just past the token.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn is_symbol(&self, symbol: char) -> bool {
        self.kind == TokenKind::Symbol && self.text.chars().next() == Some(symbol)
    }
}

/// A scanner that turns text into tokens one at a time, without ever
/// backtracking across token boundaries.
pub struct Tokenizer<'a> {
    input: &'a str,
    position: usize,
    started: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            started: false,
        }
    }

    /// True once all input was consumed; further calls to
    /// [`next_token`](Self::next_token) return `TextEnd`.
    pub fn at_end(&self) -> bool {
        self.started && self.position >= self.input.len()
    }

    pub fn next_token(&mut self) -> Token<'a> {
        if !self.started {
            self.started = true;
            return self.build_token(TokenKind::Begin, 0);
        }

        let Some(c) = self.peek() else {
            return self.build_token(TokenKind::TextEnd, self.input.len());
        };

        if is_ascii_digit(c) || is_base_indicator(c) || c == '-' || c == '+' {
            self.read_code_number()
        } else if is_letter_or_number(c) {
            self.read_word()
        } else if c == '\\' {
            self.read_possible_escape()
        } else if is_horizontal_space(c) {
            self.read_whitespace()
        } else if is_line_end(c) {
            self.read_line_end()
        } else {
            self.read_symbol()
        }
    }

    /// Collects the remaining tokens, up to and including `TextEnd`.
    pub fn tokenize(&mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::TextEnd;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn build_token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token::new(kind, start, &self.input[start..self.position.max(start)])
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_matches(&self, predicate: impl Fn(char) -> bool) -> bool {
        self.peek().is_some_and(predicate)
    }

    fn read_word(&mut self) -> Token<'a> {
        let start = self.position;
        while self.peek_matches(is_word_continuation) {
            self.advance();
        }

        // Trailing underscores belong to emphasis markup, not to the word
        while self.position > start && self.input[start..self.position].ends_with('_') {
            self.position -= 1;
        }

        self.build_token(TokenKind::Word, start)
    }

    fn read_code_number(&mut self) -> Token<'a> {
        let start = self.position;

        let mut read_leading_sign = false;
        if self.peek_matches(|c| c == '-' || c == '+') {
            self.advance();
            if !self.peek_matches(|c| is_ascii_digit(c) || is_base_indicator(c)) {
                return self.build_token(TokenKind::Symbol, start);
            }
            read_leading_sign = true;
        }

        let mut is_hex = false;
        if let Some(base) = self.peek().filter(|c| is_base_indicator(*c)) {
            is_hex = base == 'x';
            self.advance();
            if !self.peek_matches(|c| is_relevant_digit(c, is_hex)) {
                if read_leading_sign {
                    self.position = start + 1;
                    return self.build_token(TokenKind::Symbol, start);
                }
                return self.build_token(TokenKind::Word, start);
            }
        }

        let mut read_integer_part = false;
        while self.peek_matches(|c| is_relevant_digit(c, is_hex)) {
            read_integer_part = true;
            self.advance();
        }

        if read_integer_part && self.peek() == Some('.') {
            let before_point = self.position;
            self.advance();
            if !self.peek_matches(|c| is_relevant_digit(c, is_hex)) {
                self.position = before_point;
                return self.build_token(TokenKind::CodeNumber, start);
            }
        }

        while self.peek_matches(|c| is_relevant_digit(c, is_hex)) {
            self.advance();
        }

        if !read_integer_part || !self.peek_matches(|c| c == 'e' || c == 'E') {
            return self.build_token(TokenKind::CodeNumber, start);
        }

        let exponent_start = self.position;
        self.advance();
        if self.peek_matches(|c| c == '-' || c == '+') {
            self.advance();
        }

        let mut read_exponent_digits = false;
        while self.peek_matches(is_ascii_digit) {
            read_exponent_digits = true;
            self.advance();
        }

        // An exponent needs at least one digit
        if !read_exponent_digits {
            self.position = exponent_start;
        }
        self.build_token(TokenKind::CodeNumber, start)
    }

    fn read_symbol(&mut self) -> Token<'a> {
        let start = self.position;
        self.advance();
        self.build_token(TokenKind::Symbol, start)
    }

    fn read_possible_escape(&mut self) -> Token<'a> {
        let start = self.position;
        self.advance();

        // A backslash before whitespace or the end is just a backslash
        if !self.peek_matches(|c| !is_horizontal_space(c) && !is_line_end(c)) {
            return self.build_token(TokenKind::Symbol, start);
        }

        let mark = self.position;
        if self.peek() == Some('u') && !self.try_unicode_escape() {
            self.position = mark;
        }

        self.advance();
        self.build_token(TokenKind::Escape, start)
    }

    /// Tries to read `u{XXXX` leaving the position on the closing brace.
    fn try_unicode_escape(&mut self) -> bool {
        self.advance();
        if self.peek() != Some('{') {
            return false;
        }
        self.advance();
        if !self.peek_matches(is_ascii_hex_digit) {
            return false;
        }
        while self.peek_matches(is_ascii_hex_digit) {
            self.advance();
        }
        self.peek() == Some('}')
    }

    fn read_whitespace(&mut self) -> Token<'a> {
        let start = self.position;
        while self.peek_matches(is_horizontal_space) {
            self.advance();
        }
        self.build_token(TokenKind::Whitespace, start)
    }

    fn read_line_end(&mut self) -> Token<'a> {
        let start = self.position;
        if self.advance() == Some('\r') && self.peek() == Some('\n') {
            self.advance();
        }
        self.build_token(TokenKind::LineEnd, start)
    }
}

fn is_relevant_digit(c: char, is_hex: bool) -> bool {
    if is_hex {
        is_ascii_hex_digit(c)
    } else {
        is_ascii_digit(c)
    }
}
