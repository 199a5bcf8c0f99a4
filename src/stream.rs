use crate::tokenizer::{Token, Tokenizer};

/// A backtracking cursor over the output of a [`Tokenizer`].
///
/// Consumed tokens stay in the buffer until
/// [`release_consumed_tokens`](Self::release_consumed_tokens) is called, so
/// rewinding never re-tokenizes. The position demarcates consumed tokens from
/// available ones.
pub struct TokenStream<'a> {
    tokenizer: Tokenizer<'a>,
    text: &'a str,
    buffer: Vec<Token<'a>>,
    position: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            tokenizer: Tokenizer::new(text),
            text,
            buffer: Vec::new(),
            position: 0,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// True when the tokenizer is exhausted and every buffered token was
    /// consumed.
    pub fn at_end(&self) -> bool {
        self.tokenizer.at_end() && self.position == self.buffer.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Consumes and returns the next token. Past the end of the input this
    /// keeps producing `TextEnd` tokens.
    pub fn fetch_token(&mut self) -> Token<'a> {
        self.fill();
        let token = self.buffer[self.position];
        self.position += 1;
        token
    }

    /// Text of the next token, without consuming it.
    pub fn peek_token_text(&mut self) -> &'a str {
        self.fill();
        self.buffer[self.position].text
    }

    /// Moves the cursor back to an earlier position.
    pub fn rewind_to(&mut self, position: usize) {
        debug_assert!(position <= self.position);
        self.position = position.min(self.position);
    }

    /// Tokens consumed since the last release.
    pub fn consumed_tokens(&self) -> &[Token<'a>] {
        &self.buffer[..self.position]
    }

    pub fn consumed_tokens_mut(&mut self) -> &mut [Token<'a>] {
        &mut self.buffer[..self.position]
    }

    /// Drops all consumed tokens, committing to the current position.
    pub fn release_consumed_tokens(&mut self) {
        self.buffer.drain(..self.position);
        self.position = 0;
    }

    fn fill(&mut self) {
        if self.position == self.buffer.len() {
            self.buffer.push(self.tokenizer.next_token());
        }
    }
}
