//! Backtracking parser combinators over a [`TokenStream`].
//!
//! A matcher either consumes tokens and returns `true`, or returns `false`
//! with the stream cursor back where it started, so a failed match can always
//! be retried with another alternative.

use crate::stream::TokenStream;
use crate::tokenizer::TokenKind;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Words that introduce or continue code expressions.
pub static CODE_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "and", "as", "auto", "break", "context", "else", "false", "for", "if", "import", "in",
        "include", "let", "none", "not", "or", "return", "set", "show", "true", "while",
    ]
    .into_iter()
    .collect()
});

/// Schemes recognized as the start of a bare URL in content.
pub static URL_PROTOCOLS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["http", "https"].into_iter().collect());

/// Symbols in math that are not highlighted as operators.
pub const MATH_NON_OPERATORS: &str = "()[]{},;";

pub trait Matcher {
    fn try_match(&self, stream: &mut TokenStream<'_>) -> bool;
}

/// Matches a tuple of matchers in sequence.
#[derive(Debug, Clone, Copy)]
pub struct All<T>(pub T);

/// Matches the first alternative in a tuple of matchers that succeeds.
#[derive(Debug, Clone, Copy)]
pub struct Any<T>(pub T);

macro_rules! impl_tuple_matchers {
    ($($name:ident),+) => {
        impl<$($name: Matcher),+> Matcher for All<($($name,)+)> {
            #[allow(non_snake_case)]
            fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
                let start = stream.position();
                let ($($name,)+) = &self.0;
                $(
                    if !$name.try_match(stream) {
                        stream.rewind_to(start);
                        return false;
                    }
                )+
                true
            }
        }

        impl<$($name: Matcher),+> Matcher for Any<($($name,)+)> {
            #[allow(non_snake_case)]
            fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
                let ($($name,)+) = &self.0;
                $(
                    let position = stream.position();
                    if $name.try_match(stream) {
                        return true;
                    }
                    stream.rewind_to(position);
                )+
                false
            }
        }
    };
}

impl_tuple_matchers!(A);
impl_tuple_matchers!(A, B);
impl_tuple_matchers!(A, B, C);
impl_tuple_matchers!(A, B, C, D);
impl_tuple_matchers!(A, B, C, D, E);

/// Always succeeds, consuming the inner match if there is one.
#[derive(Debug, Clone, Copy)]
pub struct Optionally<M>(pub M);

impl<M: Matcher> Matcher for Optionally<M> {
    fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
        let position = stream.position();
        if !self.0.try_match(stream) {
            stream.rewind_to(position);
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OneOrMore<M>(pub M);

impl<M: Matcher> Matcher for OneOrMore<M> {
    fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
        let start = stream.position();
        if !self.0.try_match(stream) {
            stream.rewind_to(start);
            return false;
        }
        loop {
            let position = stream.position();
            if !self.0.try_match(stream) {
                stream.rewind_to(position);
                return true;
            }
        }
    }
}

pub fn zero_or_more<M: Matcher>(matcher: M) -> Optionally<OneOrMore<M>> {
    Optionally(OneOrMore(matcher))
}

/// Succeeds if the inner matcher does, but never consumes anything.
#[derive(Debug, Clone, Copy)]
pub struct Peek<M>(pub M);

impl<M: Matcher> Matcher for Peek<M> {
    fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
        let position = stream.position();
        let matched = self.0.try_match(stream);
        stream.rewind_to(position);
        matched
    }
}

/// Matches normally, then flags every consumed token so it is left out of
/// the range reported for the match.
#[derive(Debug, Clone, Copy)]
pub struct Discard<M>(pub M);

impl<M: Matcher> Matcher for Discard<M> {
    fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
        let matched = self.0.try_match(stream);
        if matched {
            for token in stream.consumed_tokens_mut() {
                token.discard = true;
            }
        }
        matched
    }
}

/// A literal outcome, for folding parser context into a grammar fragment.
#[derive(Debug, Clone, Copy)]
pub struct Condition(pub bool);

impl Matcher for Condition {
    fn try_match(&self, _stream: &mut TokenStream<'_>) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TokenType(pub TokenKind);

impl Matcher for TokenType {
    fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
        let start = stream.position();
        if stream.fetch_token().kind == self.0 {
            return true;
        }
        stream.rewind_to(start);
        false
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Symbol(pub char);

impl Matcher for Symbol {
    fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
        let start = stream.position();
        if stream.fetch_token().is_symbol(self.0) {
            return true;
        }
        stream.rewind_to(start);
        false
    }
}

/// A run of single-character symbol tokens, e.g. `//` or "```".
#[derive(Debug, Clone, Copy)]
pub struct SymbolSequence(pub &'static str);

impl Matcher for SymbolSequence {
    fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
        let start = stream.position();
        if self.0.chars().all(|c| stream.fetch_token().is_symbol(c)) {
            return true;
        }
        stream.rewind_to(start);
        false
    }
}

/// A full word whose text is one of a set of keywords.
#[derive(Debug, Clone, Copy)]
pub struct Keyword(pub &'static HashSet<&'static str>);

impl Keyword {
    pub fn new(keywords: &'static HashSet<&'static str>) -> Self {
        Keyword(keywords)
    }
}

impl Matcher for Keyword {
    fn try_match(&self, stream: &mut TokenStream<'_>) -> bool {
        let start = stream.position();
        if !full_word().try_match(stream) {
            return false;
        }
        let word: String = stream.consumed_tokens()[start..]
            .iter()
            .map(|t| t.text)
            .collect();
        if self.0.contains(word.as_str()) {
            return true;
        }
        stream.rewind_to(start);
        false
    }
}

// The tokenizer splits words at number base prefixes ("break" becomes "b" and
// "reak"), so a logical word is one or more word tokens.
pub fn full_word() -> OneOrMore<TokenType> {
    OneOrMore(TokenType(TokenKind::Word))
}

pub fn code_identifier() -> impl Matcher {
    All((full_word(), zero_or_more(Symbol('_'))))
}

/// A numeric literal with an optional unit, e.g. `12pt` or `50%`.
pub fn full_code_number() -> impl Matcher {
    All((
        TokenType(TokenKind::CodeNumber),
        Optionally(Any((TokenType(TokenKind::Word), Symbol('%')))),
    ))
}

/// Start of a content line.
pub fn line_start_anchor(at_content_start: bool) -> impl Matcher {
    Any((
        TokenType(TokenKind::Begin),
        TokenType(TokenKind::LineEnd),
        Condition(at_content_start),
    ))
}

pub fn label_name() -> impl Matcher {
    OneOrMore(Any((
        TokenType(TokenKind::Word),
        TokenType(TokenKind::CodeNumber),
        Symbol('_'),
        Symbol('-'),
        Symbol('.'),
    )))
}

/// A `.` followed by a field or method name.
pub fn expression_chain_continuation() -> impl Matcher {
    All((Symbol('.'), Peek(TokenType(TokenKind::Word))))
}
