use tracing::{debug, warn};

use crate::ast::{Value, ValueMap};
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind, lex};

/// Parser limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Deepest collection nesting accepted before failing with
    /// [`ParseError::NestingTooDeep`].
    pub max_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig { max_depth: 512 }
    }
}

/// A successfully parsed top-level expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedForm {
    pub ast: Value,
    /// Second element of a `(define-skill <id> ...)` form.
    pub skill_id: Option<Value>,
}

pub fn parse(source: &str) -> Result<ParsedForm, ParseError> {
    parse_with(source, &ParseConfig::default())
}

/// Parses the first expression of `source`; later tokens are ignored.
pub fn parse_with(source: &str, config: &ParseConfig) -> Result<ParsedForm, ParseError> {
    let tokens = lex(source);
    debug!(tokens = tokens.len(), "parsing expression");
    if tokens.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut parser = Parser::new(&tokens, config);
    let ast = parser.parse_expr()?;
    if parser.position < tokens.len() {
        warn!(
            ignored = tokens.len() - parser.position,
            "ignoring tokens after the first complete expression"
        );
    }

    let skill_id = match &ast {
        Value::List(items) if items.len() >= 2 && ast.is_form("define-skill") => {
            Some(items[1].clone())
        }
        _ => None,
    };
    Ok(ParsedForm { ast, skill_id })
}

/// Parses every top-level expression of a multi-form document.
pub fn parse_document(source: &str) -> Result<Vec<Value>, ParseError> {
    parse_document_with(source, &ParseConfig::default())
}

pub fn parse_document_with(source: &str, config: &ParseConfig) -> Result<Vec<Value>, ParseError> {
    let tokens = lex(source);
    if tokens.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    let mut parser = Parser::new(&tokens, config);
    let mut forms = Vec::new();
    while parser.position < tokens.len() {
        forms.push(parser.parse_expr()?);
    }
    debug!(forms = forms.len(), "parsed document");
    Ok(forms)
}

struct Parser<'t> {
    tokens: &'t [Token],
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], config: &ParseConfig) -> Self {
        Parser {
            tokens,
            position: 0,
            depth: 0,
            max_depth: config.max_depth,
        }
    }

    fn parse_expr(&mut self) -> Result<Value, ParseError> {
        // Callers only ask for an expression while tokens remain.
        let Some(token) = self.tokens.get(self.position) else {
            return Err(ParseError::EmptyInput);
        };
        self.position += 1;
        match token.kind {
            TokenKind::LParen => Ok(Value::List(self.parse_items('(', ')')?)),
            TokenKind::LBracket => Ok(Value::Vector(self.parse_items('[', ']')?)),
            TokenKind::LBrace => Ok(Value::Map(self.parse_map()?)),
            TokenKind::RParen => Err(ParseError::UnexpectedClosingDelimiter(')')),
            TokenKind::RBrace => Err(ParseError::UnexpectedClosingDelimiter('}')),
            TokenKind::RBracket => Err(ParseError::UnexpectedClosingDelimiter(']')),
            TokenKind::Atom => Ok(parse_atom(&token.text)),
        }
    }

    /// Parses expressions up to the `close` delimiter, consuming it.
    fn parse_items(&mut self, open: char, close: char) -> Result<Vec<Value>, ParseError> {
        self.enter()?;
        let close_kind = match close {
            ')' => TokenKind::RParen,
            ']' => TokenKind::RBracket,
            _ => TokenKind::RBrace,
        };
        let mut items = Vec::new();
        loop {
            match self.tokens.get(self.position) {
                None => return Err(ParseError::UnterminatedForm { open, close }),
                Some(token) if token.kind == close_kind => {
                    self.position += 1;
                    break;
                }
                Some(_) => items.push(self.parse_expr()?),
            }
        }
        self.depth -= 1;
        Ok(items)
    }

    fn parse_map(&mut self) -> Result<ValueMap, ParseError> {
        let items = self.parse_items('{', '}')?;
        let mut map = ValueMap::new();
        let mut items = items.into_iter();
        while let Some(key) = items.next() {
            let value = items.next().unwrap_or(Value::Nil);
            map.insert(key.key_text(), value);
        }
        Ok(map)
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }
}

fn parse_atom(text: &str) -> Value {
    if let Some(name) = text.strip_prefix(':') {
        return Value::Keyword(name.to_string());
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Value::Str(text[1..text.len() - 1].to_string());
    }
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "nil" => return Value::Nil,
        _ => {}
    }
    if let Ok(int) = text.parse::<i64>() {
        return Value::int(int);
    }
    if let Ok(float) = text.parse::<f64>() {
        return Value::float(float);
    }
    Value::Symbol(text.to_string())
}
