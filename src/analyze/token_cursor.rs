//! Token cursor over one batch, with the navigation helpers the classifier needs.

use sqlparser::dialect::MsSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, TokenWithSpan, Tokenizer, Word};

/// Source text of a word, with its delimiters restored.
pub fn format_word(word: &Word) -> String {
    match word.quote_style {
        Some('[') => format!("[{}]", word.value.replace(']', "]]")),
        Some('"') => format!("\"{}\"", word.value.replace('"', "\"\"")),
        _ => word.value.clone(),
    }
}

/// Cursor over the tokens of one batch.
pub struct TokenCursor {
    tokens: Vec<TokenWithSpan>,
    pos: usize,
}

impl TokenCursor {
    /// Tokenize `sql` with the MsSql dialect. Returns the tokenizer error text on failure.
    pub fn new(sql: &str) -> Result<Self, String> {
        let dialect = MsSqlDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize_with_location()
            .map_err(|e| e.to_string())?;
        Ok(Self { tokens, pos: 0 })
    }

    // ========================================================================
    // Position and state
    // ========================================================================

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    #[inline]
    pub fn current_token(&self) -> Option<&TokenWithSpan> {
        self.tokens.get(self.pos)
    }

    /// Current token if it is a word.
    pub fn current_word(&self) -> Option<&Word> {
        match self.current_token().map(|t| &t.token) {
            Some(Token::Word(w)) => Some(w),
            _ => None,
        }
    }

    /// 1-based line of the current token within the batch.
    pub fn line(&self) -> u32 {
        self.current_token()
            .or_else(|| self.tokens.last())
            .map(|t| t.span.start.line as u32)
            .unwrap_or(1)
            .max(1)
    }

    #[inline]
    pub fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// Skip whitespace and comment tokens.
    pub fn skip_whitespace(&mut self) {
        while let Some(token) = self.current_token() {
            match &token.token {
                Token::Whitespace(_) => self.advance(),
                _ => break,
            }
        }
    }

    /// Advance past the current token and any whitespace after it.
    pub fn next_significant(&mut self) {
        self.advance();
        self.skip_whitespace();
    }

    /// Token `n` significant tokens ahead of the current one (0 = current).
    pub fn peek_significant(&self, n: usize) -> Option<&Token> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .map(|t| &t.token)
            .filter(|t| !matches!(t, Token::Whitespace(_)))
            .nth(n)
    }

    // ========================================================================
    // Token type checks
    // ========================================================================

    #[inline]
    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.current_word(), Some(w) if w.keyword == keyword && w.quote_style.is_none())
    }

    /// Check if the current token is an undelimited word matching case-insensitively.
    #[inline]
    pub fn check_word_ci(&self, word: &str) -> bool {
        matches!(self.current_word(), Some(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(word))
    }

    /// Check the current token type, ignoring its value.
    #[inline]
    pub fn check_token(&self, expected: &Token) -> bool {
        self.current_token().is_some_and(|token| {
            std::mem::discriminant(&token.token) == std::mem::discriminant(expected)
        })
    }

    /// Consume a word (case-insensitive) and following whitespace if present.
    pub fn expect_word_ci(&mut self, word: &str) -> bool {
        if self.check_word_ci(word) {
            self.next_significant();
            true
        } else {
            false
        }
    }

    // ========================================================================
    // Names and types
    // ========================================================================

    /// Parse a possibly multi-part, possibly delimited name such as
    /// `[db]..[my.table]`, returning its source text.
    pub fn parse_multipart_name(&mut self) -> Option<String> {
        let first = format_word(self.current_word()?);
        let mut name = first;
        self.advance();
        loop {
            let save = self.pos;
            self.skip_whitespace();
            if !self.check_token(&Token::Period) {
                self.pos = save;
                break;
            }
            name.push('.');
            self.advance();
            self.skip_whitespace();
            // `db..obj` leaves the schema empty
            if self.check_token(&Token::Period) {
                continue;
            }
            match self.current_word() {
                Some(word) => {
                    name.push_str(&format_word(word));
                    self.advance();
                }
                None => break,
            }
        }
        self.skip_whitespace();
        Some(name)
    }

    /// Parse a datatype with optional length/precision, e.g. `NUMERIC(7, 2)`.
    pub fn parse_datatype(&mut self) -> Option<String> {
        let mut text = self.parse_multipart_name()?;
        // Two-word types
        for (first, second) in [
            ("DOUBLE", "PRECISION"),
            ("CHAR", "VARYING"),
            ("NCHAR", "VARYING"),
            ("CHARACTER", "VARYING"),
            ("NATIONAL", "CHAR"),
            ("NATIONAL", "CHARACTER"),
        ] {
            if text.eq_ignore_ascii_case(first) && self.check_word_ci(second) {
                text.push(' ');
                text.push_str(second);
                self.next_significant();
            }
        }
        if text.to_uppercase().starts_with("NATIONAL CHAR") && self.check_word_ci("VARYING") {
            text.push_str(" VARYING");
            self.next_significant();
        }
        if self.check_token(&Token::LParen) {
            text.push_str(&self.consume_parenthesized()?);
            self.skip_whitespace();
        }
        Some(text)
    }

    // ========================================================================
    // Utility methods
    // ========================================================================

    /// Skip a parenthesized expression, handling nesting. Returns false if unbalanced.
    pub fn skip_parenthesized(&mut self) -> bool {
        self.consume_parenthesized().is_some()
    }

    /// Consume a parenthesized expression and return it without whitespace.
    pub fn consume_parenthesized(&mut self) -> Option<String> {
        if !self.check_token(&Token::LParen) {
            return None;
        }
        let mut depth = 0usize;
        let mut text = String::new();
        while let Some(token) = self.current_token() {
            match &token.token {
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            match &token.token {
                Token::Whitespace(_) => {}
                Token::Word(w) => text.push_str(&format_word(w)),
                other => text.push_str(&other.to_string()),
            }
            self.advance();
            if depth == 0 {
                return Some(text);
            }
        }
        None
    }

    /// Check that parentheses balance over the whole batch.
    pub fn parentheses_balanced(&self) -> bool {
        let mut depth = 0i64;
        for token in &self.tokens {
            match token.token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }
        depth == 0
    }
}
