//! Literal text for compound values.
//!
//! Backup files store lists and maps in the literal notation the legacy
//! tooling wrote (`['SG1:0100']`, `{'boot_device': u'none'}`). This module
//! reads that notation with a small recursive-descent parser and writes it
//! back. Nothing is ever evaluated.
//!
//! Accepted: single or double quoted strings with an optional `u`/`b`/`r`
//! prefix and backslash escapes, integers (a trailing `L` is ignored),
//! floats, `True`, `False`, `None`, lists, tuples (read as lists), maps with
//! string or integer keys, and trailing commas.

use std::collections::BTreeMap;

use crate::error::{ConfigError, Result};
use crate::value::ConfigValue;

/// Parse one literal. Trailing text other than whitespace is an error.
pub fn parse_literal(text: &str) -> Result<ConfigValue> {
    let mut parser = Parser::new(text);
    let value = parser.value()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing text"));
    }
    Ok(value)
}

/// Write a value in literal notation.
pub fn format_literal(value: &ConfigValue) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &ConfigValue) {
    match value {
        ConfigValue::None => out.push_str("None"),
        ConfigValue::Bool(true) => out.push_str("True"),
        ConfigValue::Bool(false) => out.push_str("False"),
        ConfigValue::Int(n) => out.push_str(&n.to_string()),
        ConfigValue::Float(f) => out.push_str(&format_float(*f)),
        ConfigValue::Text(text) => write_quoted(out, text),
        ConfigValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        ConfigValue::Map(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_quoted(out, key);
                out.push_str(": ");
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn write_quoted(out: &mut String, text: &str) {
    // Single quotes unless that would need escaping and double would not.
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

/// Deepest list, tuple or map nesting accepted.
const MAX_DEPTH: usize = 64;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Parser {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::Literal {
            message: message.into(),
            offset: self.pos,
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

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, wanted: char) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == wanted => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{wanted}', found '{c}'"))),
            None => Err(self.error(format!("expected '{wanted}', found end of input"))),
        }
    }

    fn value(&mut self) -> Result<ConfigValue> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("expected a value, found end of input")),
            Some('[') => self.nested(|p| p.sequence(']').map(ConfigValue::List)),
            Some('(') => self.nested(Self::tuple),
            Some('{') => self.nested(Self::map),
            Some('\'') | Some('"') => self.string().map(ConfigValue::Text),
            Some(c) if is_string_prefix(c) && matches!(self.peek_at(1), Some('\'') | Some('"')) => {
                self.string().map(ConfigValue::Text)
            }
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() => self.keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    /// Consume an opening bracket and parse the compound after it.
    fn nested(&mut self, parse: fn(&mut Self) -> Result<ConfigValue>) -> Result<ConfigValue> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        self.pos += 1;
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    /// Items up to `close`; the opening bracket is already consumed.
    fn sequence(&mut self, close: char) -> Result<Vec<ConfigValue>> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                Some(c) => return Err(self.error(format!("expected ',' or '{close}', found '{c}'"))),
                None => return Err(self.error(format!("unterminated sequence, expected '{close}'"))),
            }
        }
    }

    /// `(x)` is a parenthesised value; `()`, `(x,)` and `(x, y)` are tuples.
    fn tuple(&mut self) -> Result<ConfigValue> {
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(ConfigValue::List(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        match self.peek() {
            Some(')') => {
                self.pos += 1;
                Ok(first)
            }
            Some(',') => {
                self.pos += 1;
                let mut items = vec![first];
                items.extend(self.sequence(')')?);
                Ok(ConfigValue::List(items))
            }
            Some(c) => Err(self.error(format!("expected ',' or ')', found '{c}'"))),
            None => Err(self.error("unterminated tuple")),
        }
    }

    fn map(&mut self) -> Result<ConfigValue> {
        let mut map = BTreeMap::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(ConfigValue::Map(map));
            }
            let key_offset = self.pos;
            let key = match self.value()? {
                ConfigValue::Text(key) => key,
                ConfigValue::Int(n) => n.to_string(),
                _ => {
                    return Err(ConfigError::Literal {
                        message: "map keys must be strings or integers".to_string(),
                        offset: key_offset,
                    })
                }
            };
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{c}'"))),
                None => return Err(self.error("unterminated map, expected '}'")),
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        let mut raw = false;
        while let Some(c) = self.peek() {
            if !is_string_prefix(c) {
                break;
            }
            if c == 'r' || c == 'R' {
                raw = true;
            }
            self.pos += 1;
        }
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quote")),
        };
        self.pos += 1;

        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("unterminated string"));
            };
            self.pos += 1;
            match c {
                c if c == quote => return Ok(out),
                '\\' if raw => {
                    out.push('\\');
                    if let Some(next) = self.peek() {
                        out.push(next);
                        self.pos += 1;
                    }
                }
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<()> {
        let Some(c) = self.peek() else {
            return Err(self.error("unterminated escape"));
        };
        self.pos += 1;
        match c {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            'x' => out.push(self.hex_char(2)?),
            'u' => out.push(self.hex_char(4)?),
            'U' => out.push(self.hex_char(8)?),
            // Unknown escapes keep their backslash.
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_char(&mut self, digits: usize) -> Result<char> {
        let end = self.pos + digits;
        if end > self.chars.len() {
            return Err(self.error("truncated escape sequence"));
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        let code = u32::from_str_radix(&hex, 16)
            .map_err(|_| self.error(format!("invalid escape digits '{hex}'")))?;
        let c = char::from_u32(code).ok_or_else(|| self.error(format!("invalid code point {code:#x}")))?;
        self.pos = end;
        Ok(c)
    }

    fn number(&mut self) -> Result<ConfigValue> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    if matches!(self.peek_at(1), Some('-') | Some('+')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if matches!(self.peek(), Some('L') | Some('l')) && !is_float {
            self.pos += 1;
        }

        if is_float {
            text.parse::<f64>()
                .map(ConfigValue::Float)
                .map_err(|_| ConfigError::Literal {
                    message: format!("invalid float '{text}'"),
                    offset: start,
                })
        } else {
            text.parse::<i64>()
                .map(ConfigValue::Int)
                .map_err(|_| ConfigError::Literal {
                    message: format!("invalid integer '{text}'"),
                    offset: start,
                })
        }
    }

    fn keyword(&mut self) -> Result<ConfigValue> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" => Ok(ConfigValue::Bool(true)),
            "False" => Ok(ConfigValue::Bool(false)),
            "None" => Ok(ConfigValue::None),
            _ => Err(ConfigError::Literal {
                message: format!("unknown name '{word}'"),
                offset: start,
            }),
        }
    }
}

fn is_string_prefix(c: char) -> bool {
    matches!(c, 'u' | 'U' | 'b' | 'B' | 'r' | 'R')
}
