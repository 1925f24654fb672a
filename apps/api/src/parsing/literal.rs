//! Permissive literal parser for model output that is "almost JSON".
//!
//! Accepts Python-style literals as models often emit them: single, double and
//! triple-quoted strings (with escapes, `r`/`u`/`b` prefixes and implicit
//! concatenation), `True`/`False`/`None` (JSON's lowercase spellings too),
//! integers and floats with underscores, hex/octal/binary integers, lists,
//! tuples and sets (all become arrays), dicts, trailing commas and `#`
//! comments. The result is a `serde_json::Value`.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Container nesting limit, the same as serde_json's recursion limit.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("literal syntax error at offset {offset}: {message}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parses a single literal expression covering the whole input.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser::new(input);
    parser.skip_trivia();
    let first = parser.parse_value()?;
    parser.skip_trivia();

    // A bare `a, b` at the top level is a tuple.
    let value = if parser.eat(',') {
        let mut items = vec![first];
        parser.skip_trivia();
        while !parser.at_end() {
            items.push(parser.parse_value()?);
            parser.skip_trivia();
            if !parser.eat(',') {
                break;
            }
            parser.skip_trivia();
        }
        Value::Array(items)
    } else {
        first
    };

    parser.skip_trivia();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    /// Skips whitespace, `#` comments and backslash line continuations.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else if c == '\\' && matches!(self.peek_at(1), Some('\n')) {
                self.pos += 2;
            } else {
                break;
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(open @ ('[' | '(' | '{')) => {
                if self.depth >= MAX_DEPTH {
                    return Err(self.error("nesting too deep"));
                }
                self.depth += 1;
                let value = match open {
                    '[' => self.parse_list(),
                    '(' => self.parse_parenthesized(),
                    _ => self.parse_braced(),
                };
                self.depth -= 1;
                value
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => self.parse_number(),
            Some(_) if self.starts_string() => self.parse_string_sequence().map(Value::String),
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_keyword(),
            Some(c) => Err(self.error(&format!("unexpected character '{c}'"))),
        }
    }

    // ── containers ──────────────────────────────────────────────────────────

    /// Parses comma-separated values up to `close`, allowing a trailing comma.
    fn parse_items(&mut self, close: char) -> Result<Vec<Value>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(',')?;
        }
    }

    fn parse_list(&mut self) -> Result<Value, LiteralError> {
        self.expect('[')?;
        self.parse_items(']').map(Value::Array)
    }

    /// `()` is an empty tuple, `(x)` is just `x`, `(x,)` and `(x, y)` are tuples.
    fn parse_parenthesized(&mut self) -> Result<Value, LiteralError> {
        self.expect('(')?;
        self.skip_trivia();
        if self.eat(')') {
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.parse_value()?;
        self.skip_trivia();
        if self.eat(')') {
            return Ok(first);
        }
        self.expect(',')?;
        let mut items = vec![first];
        items.extend(self.parse_items(')')?);
        Ok(Value::Array(items))
    }

    /// `{}` is an empty dict, `{k: v, ...}` a dict, `{a, b}` a set.
    fn parse_braced(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        self.skip_trivia();
        if self.eat('}') {
            return Ok(Value::Object(Map::new()));
        }
        let first = self.parse_value()?;
        self.skip_trivia();
        if !self.eat(':') {
            let mut items = vec![first];
            if !self.eat('}') {
                self.expect(',')?;
                items.extend(self.parse_items('}')?);
            }
            return Ok(Value::Array(items));
        }

        let mut map = Map::new();
        let key = self.key_text(first)?;
        self.skip_trivia();
        map.insert(key, self.parse_value()?);
        loop {
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            self.expect(',')?;
            self.skip_trivia();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            let key_value = self.parse_value()?;
            let key = self.key_text(key_value)?;
            self.skip_trivia();
            self.expect(':')?;
            self.skip_trivia();
            map.insert(key, self.parse_value()?);
        }
    }

    /// JSON objects only have string keys; scalar keys are rendered the way
    /// Python would print them.
    fn key_text(&self, key: Value) -> Result<String, LiteralError> {
        match key {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(true) => Ok("True".to_string()),
            Value::Bool(false) => Ok("False".to_string()),
            Value::Null => Ok("None".to_string()),
            _ => Err(self.error("unhashable dict key")),
        }
    }

    // ── scalars ─────────────────────────────────────────────────────────────

    fn parse_keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error(&format!("unknown name '{word}'")))
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut negative = false;
        while let Some(sign @ ('+' | '-')) = self.peek() {
            if sign == '-' {
                negative = !negative;
            }
            self.pos += 1;
            self.skip_trivia();
        }

        if self.peek() == Some('0')
            && matches!(
                self.peek_at(1),
                Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')
            )
        {
            return self.parse_radix_integer(negative);
        }

        let mut literal = String::new();
        if negative {
            literal.push('-');
        }
        let mut is_float = false;
        let mut digits = 0;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    digits += 1;
                    literal.push(c);
                }
                '_' => {}
                '.' if !is_float => {
                    is_float = true;
                    literal.push(c);
                }
                'e' | 'E' if digits > 0 => {
                    is_float = true;
                    literal.push('e');
                    self.pos += 1;
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        literal.push(sign);
                        self.pos += 1;
                    }
                    continue;
                }
                _ => break,
            }
            self.pos += 1;
        }

        if digits == 0 {
            self.pos = start;
            return Err(self.error("malformed number"));
        }

        if !is_float {
            if let Ok(n) = literal.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
            if let Ok(n) = literal.parse::<u64>() {
                return Ok(Value::Number(n.into()));
            }
        }

        // Python allows "1." and ".5"; Rust's float parser accepts both.
        literal
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("number out of range: {literal}"),
            })
    }

    fn parse_radix_integer(&mut self, negative: bool) -> Result<Value, LiteralError> {
        self.pos += 1; // '0'
        let radix = match self.bump() {
            Some('x' | 'X') => 16,
            Some('o' | 'O') => 8,
            _ => 2,
        };
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c == '_' {
                self.pos += 1;
            } else if c.is_digit(radix) {
                digits.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        let magnitude = i64::from_str_radix(&digits, radix)
            .map_err(|_| self.error("malformed integer literal"))?;
        Ok(Value::Number(
            (if negative { -magnitude } else { magnitude }).into(),
        ))
    }

    // ── strings ─────────────────────────────────────────────────────────────

    fn starts_string(&self) -> bool {
        let mut ahead = 0;
        while ahead < 2 {
            match self.peek_at(ahead) {
                Some('r' | 'R' | 'u' | 'U' | 'b' | 'B') => ahead += 1,
                _ => break,
            }
        }
        matches!(self.peek_at(ahead), Some('\'' | '"'))
    }

    /// Adjacent string literals concatenate: `'a' "b"` is `"ab"`.
    fn parse_string_sequence(&mut self) -> Result<String, LiteralError> {
        let mut out = self.parse_string()?;
        loop {
            let checkpoint = self.pos;
            self.skip_trivia();
            if self.starts_string() {
                out.push_str(&self.parse_string()?);
            } else {
                self.pos = checkpoint;
                return Ok(out);
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let mut raw = false;
        while let Some(c @ ('r' | 'R' | 'u' | 'U' | 'b' | 'B')) = self.peek() {
            raw |= matches!(c, 'r' | 'R');
            self.pos += 1;
        }

        let start = self.pos;
        let quote = self
            .bump()
            .ok_or_else(|| self.error("expected string"))?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = self.bump().ok_or_else(|| LiteralError {
                offset: start,
                message: "unterminated string".to_string(),
            })?;

            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(out);
                }
                out.push(c);
                continue;
            }

            if c == '\n' && !triple {
                return Err(LiteralError {
                    offset: start,
                    message: "unterminated string".to_string(),
                });
            }

            if c != '\\' {
                out.push(c);
                continue;
            }

            let escaped = self.bump().ok_or_else(|| self.error("dangling escape"))?;
            if raw {
                out.push('\\');
                out.push(escaped);
                continue;
            }
            self.push_escape(escaped, &mut out)?;
        }
    }

    fn push_escape(&mut self, escaped: char, out: &mut String) -> Result<(), LiteralError> {
        match escaped {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(escaped),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            'x' => out.push(self.hex_escape(2)?),
            'u' => out.push(self.hex_escape(4)?),
            'U' => out.push(self.hex_escape(8)?),
            '0'..='7' => {
                let mut code = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).ok_or_else(|| self.error("bad octal escape"))?);
            }
            // Unknown escapes keep their backslash.
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, len: usize) -> Result<char, LiteralError> {
        let mut code = 0u32;
        for _ in 0..len {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("truncated hex escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid code point in escape"))
    }
}
