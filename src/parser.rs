use crate::matchers::{
    code_identifier, expression_chain_continuation, full_code_number, full_word, label_name,
    line_start_anchor, zero_or_more, All, Any, Discard, Keyword, Matcher, OneOrMore, Peek, Symbol,
    SymbolSequence, TokenType, CODE_KEYWORDS, URL_PROTOCOLS,
};
use crate::stream::TokenStream;
use crate::tokenizer::{Token, TokenKind};
use log::trace;
use serde::{Deserialize, Serialize};

/// Every syntactic context the parser distinguishes.
///
/// Some kinds are pushed on the state stack and popped later; others
/// ("instant" kinds such as names, keywords and literals) are only ever
/// reported as single events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    Content,
    ContentBlock,
    ContentHeading,
    ContentEmphasis,
    ContentStrongEmphasis,
    ContentUrl,
    ContentRaw,
    ContentRawBlock,
    ContentLabel,
    ContentReference,
    ContentListEntry,
    ContentTerm,
    Math,
    MathDelimiter,
    MathSymbolName,
    MathFunctionName,
    MathExpressionChain,
    MathArguments,
    CodeVariableName,
    CodeFunctionName,
    CodeNumericLiteral,
    CodeKeyword,
    CodeLine,
    CodeBlock,
    CodeArguments,
    CodeExpressionChain,
    CodeStringExpression,
    CommentLine,
    CommentBlock,
    StringLiteral,
}

impl StateKind {
    /// States that may have nested content states in them.
    pub fn is_content_holder(self) -> bool {
        matches!(
            self,
            StateKind::Content
                | StateKind::ContentBlock
                | StateKind::ContentHeading
                | StateKind::ContentEmphasis
                | StateKind::ContentStrongEmphasis
        )
    }

    pub fn is_math_holder(self) -> bool {
        matches!(self, StateKind::Math | StateKind::MathArguments)
    }

    pub fn is_code_holder(self) -> bool {
        matches!(
            self,
            StateKind::CodeBlock | StateKind::CodeLine | StateKind::CodeArguments
        )
    }

    pub fn is_code(self) -> bool {
        self.is_code_holder()
            || matches!(
                self,
                StateKind::CodeVariableName
                    | StateKind::CodeFunctionName
                    | StateKind::CodeNumericLiteral
                    | StateKind::CodeKeyword
                    | StateKind::CodeExpressionChain
                    | StateKind::CodeStringExpression
            )
    }

    /// States implicitly ended by the end of a line.
    pub fn is_block_scoped(self) -> bool {
        matches!(
            self,
            StateKind::CommentLine
                | StateKind::ContentHeading
                | StateKind::ContentUrl
                | StateKind::CodeLine
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserState {
    pub kind: StateKind,
    pub start: usize,
    /// The state continues from the parse of a previous line.
    pub rolled_over: bool,
}

impl ParserState {
    pub fn new(kind: StateKind, start: usize) -> Self {
        Self {
            kind,
            start,
            rolled_over: false,
        }
    }

    fn rolled_over(kind: StateKind) -> Self {
        Self {
            kind,
            start: 0,
            rolled_over: true,
        }
    }
}

/// Receives parser events. All `end` offsets are exclusive.
pub trait ParsingListener {
    fn initialize_state(&mut self, _state: &ParserState, _end: usize) {}

    fn finalize_state(&mut self, _state: &ParserState, _end: usize, _implicit: bool) {}

    fn handle_instant_state(&mut self, state: &ParserState, end: usize) {
        self.finalize_state(state, end, false);
    }

    fn handle_loose_token(&mut self, _token: &Token<'_>, _state: &ParserState) {}
}

struct RegisteredListener<'l> {
    listener: &'l mut dyn ParsingListener,
    finalize_on_end: bool,
}

/// A state-stack parser for one piece of text, typically a single line.
///
/// The parser never fails: anything no rule recognizes is reported to the
/// listeners as a loose token, and states left open at the end are finalized
/// as implicitly closed.
pub struct Parser<'a, 'l> {
    stream: TokenStream<'a>,
    listeners: Vec<RegisteredListener<'l>>,
    stack: Vec<ParserState>,
    at_content_start: bool,
    start_marker: usize,
    end_marker: usize,
}

impl<'a, 'l> Parser<'a, 'l> {
    /// Creates a parser whose stack is seeded with `initial_states`, the
    /// states still open at the end of the previous line, outermost first.
    pub fn new(text: &'a str, initial_states: &[StateKind]) -> Self {
        let mut stack = Vec::with_capacity(initial_states.len() + 1);
        stack.push(ParserState::rolled_over(StateKind::Content));
        stack.extend(initial_states.iter().map(|kind| ParserState::rolled_over(*kind)));

        Self {
            stream: TokenStream::new(text),
            listeners: Vec::new(),
            stack,
            at_content_start: false,
            start_marker: 0,
            end_marker: 0,
        }
    }

    /// Registers a listener. Listeners with `finalize_on_end` also see the
    /// states still open when the text ends, other than block-scoped ones
    /// which every listener sees.
    pub fn add_listener(&mut self, listener: &'l mut dyn ParsingListener, finalize_on_end: bool) {
        self.listeners.push(RegisteredListener {
            listener,
            finalize_on_end,
        });
    }

    pub fn parse(mut self) {
        while !self.stream.at_end() {
            let state = self.current_state();

            if state.kind.is_block_scoped() && self.accept(TokenType(TokenKind::LineEnd)) {
                self.pop_state(false);
                if self.current_state().kind.is_content_holder() {
                    self.at_content_start = true;
                }
                continue;
            }

            let handled = if state.kind.is_content_holder() {
                self.handle_content(state.kind)
            } else if state.kind.is_math_holder() {
                self.handle_math(state.kind)
            } else if state.kind.is_code_holder() {
                self.handle_code(state.kind)
            } else {
                match state.kind {
                    StateKind::ContentUrl => self.handle_url(),
                    StateKind::ContentRawBlock => self.pop_on(SymbolSequence("```")),
                    StateKind::ContentRaw => self.pop_on(Symbol('`')),
                    StateKind::CommentBlock => self.pop_on(SymbolSequence("*/")),
                    StateKind::MathExpressionChain => self.handle_math_expression_chain(),
                    StateKind::CodeExpressionChain => self.handle_code_expression_chain(),
                    StateKind::StringLiteral | StateKind::CodeStringExpression => {
                        self.handle_string_end(state.kind)
                    }
                    _ => false,
                }
            };

            if !handled {
                self.consume_loose_token(&state);
            }
        }

        self.finish();
    }

    fn handle_content(&mut self, kind: StateKind) -> bool {
        let at_content_start = std::mem::take(&mut self.at_content_start);

        if self.handle_comment_start() || self.handle_code_start() {
            return true;
        }

        if kind != StateKind::Content
            && kind != StateKind::ContentBlock
            && self.accept(All((
                Any((TokenType(TokenKind::Begin), TokenType(TokenKind::LineEnd))),
                zero_or_more(TokenType(TokenKind::Whitespace)),
                Any((TokenType(TokenKind::TextEnd), TokenType(TokenKind::LineEnd))),
            )))
        {
            // A paragraph break ends any unterminated markup
            self.pop_state(false);
            return true;
        }

        if kind == StateKind::ContentBlock && self.accept(Symbol(']')) {
            self.pop_state(false);
            if self.accept(Symbol('[')) {
                self.push_state(StateKind::ContentBlock);
            } else if !self.current_state().kind.is_code_holder()
                && self.accept(expression_chain_continuation())
            {
                // Chain on the return value of the call this block was an argument of
                self.push_state(StateKind::CodeExpressionChain);
            }
            return true;
        }

        if self.accept(Symbol('$')) {
            self.instant_state(StateKind::MathDelimiter);
            self.push_state(StateKind::Math);
        } else if self.accept(Symbol('_')) {
            self.toggle_state(kind, StateKind::ContentEmphasis);
        } else if self.accept(Symbol('*')) {
            self.toggle_state(kind, StateKind::ContentStrongEmphasis);
        } else if self.accept(All((Keyword::new(&URL_PROTOCOLS), SymbolSequence("://")))) {
            self.push_state(StateKind::ContentUrl);
        } else if self.accept(SymbolSequence("```")) {
            self.push_state(StateKind::ContentRawBlock);
        } else if self.accept(Symbol('`')) {
            self.push_state(StateKind::ContentRaw);
        } else if self.accept(All((Symbol('<'), label_name(), Symbol('>')))) {
            self.instant_state(StateKind::ContentLabel);
        } else if self.accept(All((Symbol('@'), label_name()))) {
            self.instant_state(StateKind::ContentReference);
        } else if self.accept(All((
            Discard(All((
                line_start_anchor(at_content_start),
                zero_or_more(TokenType(TokenKind::Whitespace)),
            ))),
            OneOrMore(Symbol('=')),
            TokenType(TokenKind::Whitespace),
        ))) {
            self.push_state(StateKind::ContentHeading);
        } else if self.accept(All((
            Discard(All((
                line_start_anchor(at_content_start),
                zero_or_more(TokenType(TokenKind::Whitespace)),
            ))),
            Any((Symbol('-'), Symbol('+'))),
            OneOrMore(TokenType(TokenKind::Whitespace)),
        ))) {
            self.instant_state(StateKind::ContentListEntry);
            self.at_content_start = true;
        } else if self.accept(All((
            Discard(All((
                line_start_anchor(at_content_start),
                zero_or_more(TokenType(TokenKind::Whitespace)),
            ))),
            Symbol('/'),
            OneOrMore(TokenType(TokenKind::Whitespace)),
        ))) {
            self.instant_state(StateKind::ContentListEntry);
            if self.accept(All((TokenType(TokenKind::Word), Peek(Symbol(':'))))) {
                self.instant_state(StateKind::ContentTerm);
            }
        } else {
            return false;
        }
        true
    }

    fn handle_url(&mut self) -> bool {
        if self.accept(Peek(Any((
            TokenType(TokenKind::Whitespace),
            Symbol(']'),
            Symbol(')'),
            Symbol('}'),
        )))) {
            self.pop_state(false);
            return true;
        }
        false
    }

    fn handle_math(&mut self, kind: StateKind) -> bool {
        if self.handle_comment_start() || self.handle_code_start() {
            return true;
        }

        if kind == StateKind::MathArguments && self.accept(Symbol(')')) {
            self.pop_state(false);
        } else if self.accept(Symbol('$')) {
            self.instant_state(StateKind::MathDelimiter);
            while self.current_state().kind == StateKind::MathArguments {
                self.pop_state(false);
            }
            if self.current_state().kind == StateKind::Math {
                self.pop_state(false);
            }
        } else if self.accept(Symbol('"')) {
            self.push_state(StateKind::StringLiteral);
        } else if self.accept(Symbol('(')) {
            self.push_state(StateKind::MathArguments);
        } else if self.accept(All((full_word(), Peek(Symbol('('))))) {
            // Single letters are plain variables in math
            if self.marked_char_count() > 1 {
                self.instant_state(StateKind::MathFunctionName);
            }
        } else if self.accept(full_word()) {
            if self.marked_char_count() > 1 {
                self.instant_state(StateKind::MathSymbolName);
                if self.accept(expression_chain_continuation()) {
                    self.push_state(StateKind::MathExpressionChain);
                }
            }
        } else {
            return false;
        }
        true
    }

    fn handle_math_expression_chain(&mut self) -> bool {
        if self.accept(All((full_word(), Peek(Symbol('('))))) {
            self.instant_state(StateKind::MathFunctionName);
            self.pop_state(false);
        } else if self.accept(full_word()) {
            self.instant_state(StateKind::MathSymbolName);
            if !self.accept(expression_chain_continuation()) {
                self.pop_state(false);
            }
        } else {
            // Anything else breaks the chain
            self.pop_state(false);
        }
        true
    }

    fn handle_code(&mut self, kind: StateKind) -> bool {
        if self.handle_comment_start() {
            return true;
        }

        if kind == StateKind::CodeBlock && self.accept(Symbol('}')) {
            self.pop_state(false);
        } else if kind != StateKind::CodeBlock && self.accept(Symbol(';')) {
            self.pop_state(false);
        } else if kind == StateKind::CodeArguments && self.accept(Symbol(')')) {
            self.pop_state(false);
            if self.accept(Symbol('[')) {
                // A trailing content block argument
                self.push_state(StateKind::ContentBlock);
            } else if !self.current_state().kind.is_code_holder()
                && self.accept(expression_chain_continuation())
            {
                self.push_state(StateKind::CodeExpressionChain);
            }
        } else if self.accept(Symbol('{')) {
            self.push_state(StateKind::CodeBlock);
        } else if self.accept(Symbol('(')) {
            self.push_state(StateKind::CodeArguments);
        } else if self.accept(Symbol('[')) {
            self.push_state(StateKind::ContentBlock);
        } else if self.accept(Symbol('"')) {
            self.push_state(StateKind::StringLiteral);
        } else if self.accept(SymbolSequence("```")) {
            self.push_state(StateKind::ContentRawBlock);
        } else if self.accept(Symbol('`')) {
            self.push_state(StateKind::ContentRaw);
        } else if self.accept(Keyword::new(&CODE_KEYWORDS)) {
            self.instant_state(StateKind::CodeKeyword);
        } else if self.accept(All((code_identifier(), Peek(Any((Symbol('('), Symbol('['))))))) {
            self.instant_state(StateKind::CodeFunctionName);
        } else if self.accept(full_code_number()) {
            self.instant_state(StateKind::CodeNumericLiteral);
        } else if self.accept(Symbol('$')) {
            self.instant_state(StateKind::MathDelimiter);
            self.push_state(StateKind::Math);
        } else if self.accept(All((Symbol('<'), label_name(), Symbol('>')))) {
            self.instant_state(StateKind::ContentLabel);
        } else {
            return false;
        }
        true
    }

    fn handle_code_expression_chain(&mut self) -> bool {
        if self.accept(All((code_identifier(), Peek(Any((Symbol('('), Symbol('['))))))) {
            self.instant_state(StateKind::CodeFunctionName);
            self.pop_state(false);
            if self.accept(Symbol('(')) {
                self.push_state(StateKind::CodeArguments);
            } else if self.accept(Symbol('[')) {
                self.push_state(StateKind::ContentBlock);
            }
        } else if self.accept(code_identifier()) {
            self.instant_state(StateKind::CodeVariableName);
            if !self.accept(expression_chain_continuation()) {
                self.pop_state(false);
            }
        } else {
            // Anything else breaks the chain
            self.pop_state(false);
        }
        true
    }

    fn handle_string_end(&mut self, kind: StateKind) -> bool {
        if !self.accept(Symbol('"')) {
            return false;
        }
        self.pop_state(false);
        if kind == StateKind::CodeStringExpression && self.accept(expression_chain_continuation()) {
            // A method or field of a string literal
            self.push_state(StateKind::CodeExpressionChain);
        }
        true
    }

    fn handle_comment_start(&mut self) -> bool {
        if self.stream.peek_token_text() != "/" {
            return false;
        }

        if self.accept(SymbolSequence("//")) {
            self.push_state(StateKind::CommentLine);
            return true;
        }
        if self.accept(SymbolSequence("/*")) {
            self.push_state(StateKind::CommentBlock);
            return true;
        }
        false
    }

    fn handle_code_start(&mut self) -> bool {
        if self.stream.peek_token_text() != "#" {
            return false;
        }

        if self.accept(All((Symbol('#'), Keyword::new(&CODE_KEYWORDS)))) {
            self.push_state(StateKind::CodeLine);
        } else if self.accept(All((
            Symbol('#'),
            code_identifier(),
            Peek(Any((Symbol('('), Symbol('[')))),
        ))) {
            // A function call, with either an argument list or a content block
            self.instant_state(StateKind::CodeFunctionName);
            if self.accept(Symbol('(')) {
                self.push_state(StateKind::CodeArguments);
            } else if self.accept(Symbol('[')) {
                self.push_state(StateKind::ContentBlock);
            }
        } else if self.accept(All((Symbol('#'), full_code_number()))) {
            self.instant_state(StateKind::CodeNumericLiteral);
            if self.accept(expression_chain_continuation()) {
                self.push_state(StateKind::CodeExpressionChain);
            }
        } else if self.accept(SymbolSequence("#\"")) {
            self.push_state(StateKind::CodeStringExpression);
        } else if self.accept(All((Symbol('#'), code_identifier()))) {
            self.instant_state(StateKind::CodeVariableName);
            if self.accept(expression_chain_continuation()) {
                self.push_state(StateKind::CodeExpressionChain);
            }
        } else if self.accept(All((Discard(Symbol('#')), Symbol('{')))) {
            self.push_state(StateKind::CodeBlock);
        } else if self.accept(All((Discard(Symbol('#')), Symbol('[')))) {
            self.push_state(StateKind::ContentBlock);
        } else if self.accept(All((Discard(Symbol('#')), Symbol('(')))) {
            self.push_state(StateKind::CodeArguments);
        } else {
            return false;
        }
        true
    }

    /// Tries `matcher`, and on success commits to the consumed tokens and
    /// moves the start and end markers to cover them.
    fn accept(&mut self, matcher: impl Matcher) -> bool {
        let position = self.stream.position();
        if !matcher.try_match(&mut self.stream) {
            self.stream.rewind_to(position);
            return false;
        }
        self.update_markers();
        self.stream.release_consumed_tokens();
        true
    }

    fn update_markers(&mut self) {
        let tokens = self.stream.consumed_tokens();
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return;
        };

        // Leading discarded tokens are not part of the match
        let start_token = tokens.iter().find(|t| !t.discard).unwrap_or(first);
        self.start_marker = start_token.start;
        self.end_marker = last.end().max(self.start_marker);
    }

    fn marked_char_count(&self) -> usize {
        self.stream
            .text()
            .get(self.start_marker..self.end_marker)
            .map_or(0, |s| s.chars().count())
    }

    fn consume_loose_token(&mut self, state: &ParserState) {
        let token = self.stream.fetch_token();
        if !token.discard {
            self.start_marker = token.start;
            self.end_marker = token.end();
        }
        for registered in &mut self.listeners {
            registered.listener.handle_loose_token(&token, state);
        }
        self.stream.release_consumed_tokens();
    }

    fn current_state(&self) -> ParserState {
        self.stack
            .last()
            .copied()
            .unwrap_or_else(|| ParserState::rolled_over(StateKind::Content))
    }

    fn toggle_state(&mut self, current: StateKind, kind: StateKind) {
        if current == kind {
            self.pop_state(false);
        } else {
            self.push_state(kind);
        }
    }

    fn pop_on(&mut self, matcher: impl Matcher) -> bool {
        if self.accept(matcher) {
            self.pop_state(false);
            return true;
        }
        false
    }

    fn instant_state(&mut self, kind: StateKind) {
        let state = ParserState::new(kind, self.start_marker);
        let end = self.end_marker;
        trace!("instant {:?} at {}..{}", kind, state.start, end);
        for registered in &mut self.listeners {
            registered.listener.handle_instant_state(&state, end);
        }
    }

    fn push_state(&mut self, kind: StateKind) {
        if kind == StateKind::ContentBlock {
            self.at_content_start = true;
        }

        let state = ParserState::new(kind, self.start_marker);
        let end = self.end_marker;
        trace!("push {:?} at {}", kind, state.start);
        self.stack.push(state);
        for registered in &mut self.listeners {
            registered.listener.initialize_state(&state, end);
        }
    }

    fn pop_state(&mut self, implicit: bool) {
        // The root content state always stays
        if self.stack.len() <= 1 {
            return;
        }
        let Some(state) = self.stack.pop() else {
            return;
        };
        let end = self.end_marker;
        trace!("pop {:?} at {}", state.kind, end);
        for registered in &mut self.listeners {
            registered.listener.finalize_state(&state, end, implicit);
        }
    }

    /// Finalizes everything left on the stack. The innermost run of
    /// block-scoped states ends with the text for every listener; the rest
    /// stay open and are only reported to listeners that asked for it.
    fn finish(mut self) {
        let end = self.stream.text().len();
        self.end_marker = end;

        let mut in_block_scoped_run = true;
        while let Some(state) = self.stack.pop() {
            in_block_scoped_run = in_block_scoped_run && state.kind.is_block_scoped();
            for registered in &mut self.listeners {
                if in_block_scoped_run || registered.finalize_on_end {
                    registered.listener.finalize_state(&state, end, true);
                }
            }
        }
    }
}
