//! Text formats for domains and world states.
//!
//! Domain syntax:
//! - `# ...` - comment to end of line
//! - `constants Group { name = literal; ... }` - named constants, referenced as `Group.name`
//! - `axiom name(params) { conditions }` - one clause of an axiom
//! - `method name(params) { branch... }` - prefix with `top` for the entry point
//! - `label: conditions => task(args), task(args);` - a branch; conditions may be empty
//! - `a, b` - conjunction; also `and(...)`, `or(...)`, `not(...)`
//! - `fact(args)` or bare `fact` - a fact query, or an axiom call when an
//!   axiom with that name and arity exists
//! - `?x` in-out, `+x` input, `!x` output, `_` / `_name` wildcard variables
//! - literals: `3`, `-2.5`, `"text"`, `true`, `false`, `symbol`, `[a, 1, "x"]`
//!
//! World-state syntax: one fact per declaration, `name` or `name(literal, ...)`,
//! optionally terminated by `;`.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::{Condition, Domain, DomainBuilder, DomainError, TaskCall, Term, Var, VarRole};
use crate::symbol::SymbolStore;
use crate::value::Value;
use crate::world::WorldState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    Lexical,
    Syntax,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Lexical => write!(f, "lexical"),
            ParseErrorKind::Syntax => write!(f, "syntax"),
        }
    }
}

/// Parse error with source position (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {kind} error: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    fn lexical(line: usize, column: usize, message: String) -> Self {
        Self {
            kind: ParseErrorKind::Lexical,
            line,
            column,
            message,
        }
    }

    fn syntax(line: usize, column: usize, message: String) -> Self {
        Self {
            kind: ParseErrorKind::Syntax,
            line,
            column,
            message,
        }
    }
}

/// Failure to load a domain file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid domain: {0}")]
    Domain(#[from] DomainError),
}

/// Parse domain text into a validated `Domain` interning into `symbols`.
pub fn parse_domain(text: &str, symbols: Arc<SymbolStore>) -> Result<Domain, LoadError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut builder = DomainBuilder::new(symbols);
    Parser::new(tokens).parse_domain(&mut builder)?;
    Ok(builder.build()?)
}

/// Parse world-state text. Use the domain's symbol store so fact ids and
/// symbols line up with the domain's.
pub fn parse_world_state(text: &str, symbols: &SymbolStore) -> Result<WorldState, ParseError> {
    let tokens = Lexer::new(text).tokenize()?;
    Parser::new(tokens).parse_world(symbols)
}

// ========================================================================
// LEXER
// ========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    /// `+name`
    InVar(String),
    /// `!name`
    OutVar(String),
    /// `?name`
    InOutVar(String),
    Number(f64),
    Str(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Colon,
    Dot,
    Eq,
    Arrow,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "`{}`", name),
            Token::InVar(name) => write!(f, "`+{}`", name),
            Token::OutVar(name) => write!(f, "`!{}`", name),
            Token::InOutVar(name) => write!(f, "`?{}`", name),
            Token::Number(n) => write!(f, "`{}`", n),
            Token::Str(s) => write!(f, "{:?}", s),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::LBrace => write!(f, "`{{`"),
            Token::RBrace => write!(f, "`}}`"),
            Token::LBracket => write!(f, "`[`"),
            Token::RBracket => write!(f, "`]`"),
            Token::Comma => write!(f, "`,`"),
            Token::Semi => write!(f, "`;`"),
            Token::Colon => write!(f, "`:`"),
            Token::Dot => write!(f, "`.`"),
            Token::Eq => write!(f, "`=`"),
            Token::Arrow => write!(f, "`=>`"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
    column: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let (line, column) = (self.line, self.col);
            let Some(c) = self.peek() else {
                tokens.push(Spanned {
                    token: Token::Eof,
                    line,
                    column,
                });
                return Ok(tokens);
            };
            let token = match c {
                '(' | ')' | '{' | '}' | '[' | ']' | ',' | ';' | ':' | '.' => {
                    self.advance();
                    match c {
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        '{' => Token::LBrace,
                        '}' => Token::RBrace,
                        '[' => Token::LBracket,
                        ']' => Token::RBracket,
                        ',' => Token::Comma,
                        ';' => Token::Semi,
                        ':' => Token::Colon,
                        _ => Token::Dot,
                    }
                }
                '=' => {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        Token::Arrow
                    } else {
                        Token::Eq
                    }
                }
                '"' => self.lex_string(line, column)?,
                '+' | '!' | '?' => {
                    self.advance();
                    if !self.peek().is_some_and(is_ident_start) {
                        return Err(ParseError::lexical(
                            line,
                            column,
                            format!("expected a variable name after `{}`", c),
                        ));
                    }
                    let name = self.lex_identifier();
                    match c {
                        '+' => Token::InVar(name),
                        '!' => Token::OutVar(name),
                        _ => Token::InOutVar(name),
                    }
                }
                '-' => {
                    if !self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                        return Err(ParseError::lexical(
                            line,
                            column,
                            "expected a digit after `-`".to_string(),
                        ));
                    }
                    self.lex_number(line, column)?
                }
                c if c.is_ascii_digit() => self.lex_number(line, column)?,
                c if is_ident_start(c) => Token::Ident(self.lex_identifier()),
                other => {
                    return Err(ParseError::lexical(
                        line,
                        column,
                        format!("unexpected character `{}`", other),
                    ))
                }
            };
            tokens.push(Spanned {
                token,
                line,
                column,
            });
        }
    }

    fn lex_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                result.push(c);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn lex_number(&mut self, line: usize, column: usize) -> Result<Token, ParseError> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.advance();
        }
        self.take_digits(&mut text);
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
            text.push('.');
            self.advance();
            self.take_digits(&mut text);
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|e| ParseError::lexical(line, column, format!("bad number `{}`: {}", text, e)))
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(d) = self.peek().filter(char::is_ascii_digit) {
            text.push(d);
            self.advance();
        }
    }

    fn lex_string(&mut self, line: usize, column: usize) -> Result<Token, ParseError> {
        self.advance();
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(Token::Str(text)),
                Some('\\') => {
                    let escaped = match self.advance() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(other) => {
                            return Err(ParseError::lexical(
                                self.line,
                                self.col - 1,
                                format!("unknown escape `\\{}`", other),
                            ))
                        }
                        None => break,
                    };
                    text.push(escaped);
                }
                Some(c) => text.push(c),
                None => break,
            }
        }
        Err(ParseError::lexical(
            line,
            column,
            "unterminated string literal".to_string(),
        ))
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            if self.peek() == Some('#') {
                while let Some(c) = self.advance() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(ch) = c {
            self.pos += 1;
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        c
    }
}

// ========================================================================
// PARSER
// ========================================================================

/// Recursive-descent parser over a token list that always ends in `Eof`.
struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_domain(&mut self, b: &mut DomainBuilder) -> Result<(), ParseError> {
        while !self.at(&Token::Eof) {
            let start = self.current().clone();
            let keyword = self.expect_ident("a declaration")?;
            match keyword.as_str() {
                "constants" => self.parse_constants(b)?,
                "axiom" => self.parse_axiom(b)?,
                "method" => self.parse_method(b, false)?,
                "top" => {
                    self.expect_keyword("method")?;
                    self.parse_method(b, true)?;
                }
                other => {
                    return Err(self.error_at(
                        &start,
                        format!(
                            "expected `constants`, `axiom`, `method` or `top method`, found `{}`",
                            other
                        ),
                    ))
                }
            }
        }
        Ok(())
    }

    /// `constants Group { name = literal; ... }`
    fn parse_constants(&mut self, b: &mut DomainBuilder) -> Result<(), ParseError> {
        let group = self.expect_ident("a constants group name")?;
        self.expect(&Token::LBrace)?;
        while !self.eat(&Token::RBrace) {
            let name = self.expect_ident("a constant name")?;
            self.expect(&Token::Eq)?;
            let value = self.parse_literal(b.symbols())?;
            self.eat(&Token::Semi);
            b.add_constant(&group, &name, value);
        }
        Ok(())
    }

    /// `axiom name(params) { conditions }`
    fn parse_axiom(&mut self, b: &mut DomainBuilder) -> Result<(), ParseError> {
        let name = self.expect_ident("an axiom name")?;
        self.expect(&Token::LParen)?;
        let params = self.parse_terms(b)?;
        self.expect(&Token::LBrace)?;
        let condition = self.parse_conjunction(b)?;
        self.expect(&Token::RBrace)?;
        b.add_axiom(&name, params, condition);
        Ok(())
    }

    /// `method name(params) { branch... }`
    fn parse_method(&mut self, b: &mut DomainBuilder, top: bool) -> Result<(), ParseError> {
        let name = self.expect_ident("a method name")?;
        self.expect(&Token::LParen)?;
        let params = self.parse_terms(b)?;
        self.expect(&Token::LBrace)?;
        let mut branches = Vec::new();
        while !self.eat(&Token::RBrace) {
            let label = self.expect_ident("a branch label")?;
            self.expect(&Token::Colon)?;
            let condition = if self.at(&Token::Arrow) {
                None
            } else {
                Some(self.parse_conjunction(b)?)
            };
            self.expect(&Token::Arrow)?;
            let mut tasks = vec![self.parse_task(b)?];
            while self.eat(&Token::Comma) {
                tasks.push(self.parse_task(b)?);
            }
            self.eat(&Token::Semi);
            branches.push(b.branch(&label, condition, tasks));
        }
        if top {
            b.add_top_level_method(&name, params, branches);
        } else {
            b.add_method(&name, params, branches);
        }
        Ok(())
    }

    /// Comma-separated conditions; more than one forms a conjunction.
    fn parse_conjunction(&mut self, b: &mut DomainBuilder) -> Result<Condition, ParseError> {
        let mut items = self.parse_condition_list(b)?;
        if items.len() == 1 {
            if let Some(single) = items.pop() {
                return Ok(single);
            }
        }
        Ok(b.and(items))
    }

    fn parse_condition_list(&mut self, b: &mut DomainBuilder) -> Result<Vec<Condition>, ParseError> {
        let mut items = vec![self.parse_condition(b)?];
        while self.eat(&Token::Comma) {
            items.push(self.parse_condition(b)?);
        }
        Ok(items)
    }

    fn parse_condition(&mut self, b: &mut DomainBuilder) -> Result<Condition, ParseError> {
        let name = self.expect_ident("a condition")?;
        let connective = self.at(&Token::LParen);
        match name.as_str() {
            "and" | "or" if connective => {
                self.advance();
                let items = if self.at(&Token::RParen) {
                    Vec::new()
                } else {
                    self.parse_condition_list(b)?
                };
                self.expect(&Token::RParen)?;
                Ok(if name == "and" { b.and(items) } else { b.or(items) })
            }
            "not" if connective => {
                self.advance();
                let inner = self.parse_conjunction(b)?;
                self.expect(&Token::RParen)?;
                Ok(b.not(inner))
            }
            _ => {
                let args = if self.eat(&Token::LParen) {
                    self.parse_terms(b)?
                } else {
                    Vec::new()
                };
                Ok(b.fact(&name, args))
            }
        }
    }

    /// `name(args)`
    fn parse_task(&mut self, b: &mut DomainBuilder) -> Result<TaskCall, ParseError> {
        let name = self.expect_ident("a task name")?;
        self.expect(&Token::LParen)?;
        let args = self.parse_terms(b)?;
        Ok(b.task(&name, args))
    }

    /// Terms up to and including the closing `)`.
    fn parse_terms(&mut self, b: &DomainBuilder) -> Result<Vec<Term>, ParseError> {
        let mut terms = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(terms);
        }
        loop {
            terms.push(self.parse_term(b.symbols())?);
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RParen)?;
                return Ok(terms);
            }
        }
    }

    fn parse_term(&mut self, symbols: &SymbolStore) -> Result<Term, ParseError> {
        let var = |name: &str, role| {
            Term::Var(Var {
                name: symbols.intern(name),
                role,
            })
        };
        match &self.current().token {
            Token::InVar(name) => {
                let term = var(name, VarRole::Input);
                self.advance();
                Ok(term)
            }
            Token::OutVar(name) => {
                let term = var(name, VarRole::Output);
                self.advance();
                Ok(term)
            }
            Token::InOutVar(name) => {
                let term = var(name, VarRole::InOut);
                self.advance();
                Ok(term)
            }
            Token::Ident(name) if name.starts_with('_') => {
                let term = var(name, VarRole::Wildcard);
                self.advance();
                Ok(term)
            }
            Token::Ident(_) if self.peek_at(1) == &Token::Dot => {
                let group = self.expect_ident("a constants group")?;
                self.advance();
                let name = self.expect_ident("a constant name")?;
                Ok(Term::Const {
                    group: symbols.intern(&group),
                    name: symbols.intern(&name),
                })
            }
            _ => self.parse_literal(symbols).map(Term::Literal),
        }
    }

    fn parse_literal(&mut self, symbols: &SymbolStore) -> Result<Value, ParseError> {
        let Spanned {
            token,
            line,
            column,
        } = self.advance();
        match token {
            Token::Number(n) => Ok(Value::Number(n)),
            Token::Str(s) => Ok(Value::string(&s)),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ if name.starts_with('_') => Err(ParseError::syntax(
                    line,
                    column,
                    format!("wildcard `{}` is not a literal", name),
                )),
                _ => Ok(Value::Symbol(symbols.intern(&name))),
            },
            Token::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.parse_literal(symbols)?);
                        if !self.eat(&Token::Comma) {
                            self.expect(&Token::RBracket)?;
                            break;
                        }
                    }
                }
                Ok(Value::list(items))
            }
            other => Err(ParseError::syntax(
                line,
                column,
                format!("expected a literal, found {}", other),
            )),
        }
    }

    fn parse_world(&mut self, symbols: &SymbolStore) -> Result<WorldState, ParseError> {
        let mut world = WorldState::new();
        while !self.at(&Token::Eof) {
            let start = self.current().clone();
            let name = self.expect_ident("a fact name")?;
            let mut args = Vec::new();
            if self.eat(&Token::LParen) && !self.eat(&Token::RParen) {
                loop {
                    args.push(self.parse_literal(symbols)?);
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RParen)?;
                        break;
                    }
                }
            }
            self.eat(&Token::Semi);
            world
                .insert(symbols.intern(&name), args)
                .map_err(|e| self.error_at(&start, format!("fact `{}`: {}", name, e)))?;
        }
        Ok(world)
    }

    fn current(&self) -> &Spanned {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)].token
    }

    fn at(&self, token: &Token) -> bool {
        &self.current().token == token
    }

    /// Consume the current token. `Eof` is never consumed.
    fn advance(&mut self) -> Spanned {
        let spanned = self.current().clone();
        if spanned.token != Token::Eof {
            self.pos += 1;
        }
        spanned
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                token,
                self.current().token
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match &self.current().token {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected {}, found {}", what, other))),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        match &self.current().token {
            Token::Ident(name) if name == keyword => {
                self.advance();
                Ok(())
            }
            other => Err(self.error(format!("expected `{}`, found {}", keyword, other))),
        }
    }

    fn error(&self, message: String) -> ParseError {
        self.error_at(self.current(), message)
    }

    fn error_at(&self, at: &Spanned, message: String) -> ParseError {
        ParseError::syntax(at.line, at.column, message)
    }
}

#[cfg(test)]
#[path = "tests/parser.rs"]
mod tests;
