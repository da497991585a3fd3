//! Lexer for the skill DSL.
//!
//! The lexer never fails. It only separates the six structural
//! delimiters from whitespace-separated atoms; anything odd (a stray
//! quote, an unknown character) stays inside an atom and is left for
//! the parser to judge.

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Atom,
}

impl TokenKind {
    fn for_delimiter(ch: char) -> Option<TokenKind> {
        match ch {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token; string literals keep their quotes.
    pub text: String,
}

/// Lex a source string into tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        index: 0,
        pending: String::new(),
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

/// Token texts only, in source order.
pub fn tokenize(source: &str) -> Vec<String> {
    lex(source).into_iter().map(|token| token.text).collect()
}

struct Lexer {
    chars: Vec<char>,
    index: usize,
    /// Atom text accumulated since the last separator.
    pending: String,
    tokens: Vec<Token>,
}

impl Lexer {
    fn run(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '"' {
                if let Some(end) = self.closing_quote() {
                    // A literal glues onto whatever atom text surrounds it.
                    let literal: String = self.chars[self.index..=end].iter().collect();
                    self.pending.push_str(&literal);
                    self.index = end + 1;
                    continue;
                }
            }

            if ch == ';' && self.peek_next() == Some(';') {
                self.skip_comment();
                continue;
            }

            self.index += 1;
            if let Some(kind) = TokenKind::for_delimiter(ch) {
                self.flush();
                self.tokens.push(Token {
                    kind,
                    text: ch.to_string(),
                });
            } else if ch.is_whitespace() {
                self.flush();
            } else {
                self.pending.push(ch);
            }
        }
        self.flush();
    }

    /// Skips a `;;` comment up to the end of its line.
    ///
    /// A quoted literal that opens inside the comment is skipped whole,
    /// so the comment runs to the first newline after that literal closes.
    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            match ch {
                '\n' => return,
                '"' => match self.closing_quote() {
                    Some(end) => self.index = end + 1,
                    None => self.index += 1,
                },
                _ => self.index += 1,
            }
        }
    }

    /// Index of the quote closing the literal that opens at `self.index`.
    fn closing_quote(&self) -> Option<usize> {
        self.chars[self.index + 1..]
            .iter()
            .position(|&c| c == '"')
            .map(|offset| self.index + 1 + offset)
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.tokens.push(Token {
                kind: TokenKind::Atom,
                text: std::mem::take(&mut self.pending),
            });
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }
}
