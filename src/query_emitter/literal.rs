//! Literal rendering for emitted Cypher
//!
//! Cypher string escaping rules:
//! - Backslash \ escapes special characters
//! - Single quotes must be escaped as \'
//! - Backslashes must be escaped as \\
//! - Newlines, tabs, etc. must be escaped
//!
//! [`parse_literal`] reads the rendered form back, so every literal kind can
//! be checked to survive emission unchanged.

use crate::errors::ScopeError;
use crate::filter_ir::Literal;

/// Escape a string value for use inside single quotes
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\") // Must be first!
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Render a literal as Cypher text
pub fn render_literal(value: &Literal) -> Result<String, ScopeError> {
    match value {
        Literal::Null => Ok("null".to_string()),
        Literal::Boolean(b) => Ok(b.to_string()),
        Literal::Integer(i) => Ok(i.to_string()),
        Literal::Float(f) => {
            if !f.is_finite() {
                return Err(ScopeError::type_mismatch(
                    "literal",
                    "a finite number",
                    f.to_string(),
                ));
            }
            let text = f.to_string();
            // Keep floats distinguishable from integers once emitted
            if text.contains('.') || text.contains('e') {
                Ok(text)
            } else {
                Ok(format!("{}.0", text))
            }
        }
        Literal::String(s) => Ok(format!("'{}'", escape_string(s))),
        Literal::List(items) => {
            let rendered: Result<Vec<String>, _> = items.iter().map(render_literal).collect();
            Ok(format!("[{}]", rendered?.join(", ")))
        }
    }
}

/// Parse a Cypher literal as produced by [`render_literal`]
pub fn parse_literal(text: &str) -> Result<Literal, ScopeError> {
    let mut parser = LiteralParser {
        chars: text.chars().collect(),
        pos: 0,
        source: text,
    };
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos != parser.chars.len() {
        return Err(parser.error("unexpected trailing content"));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl LiteralParser<'_> {
    fn error(&self, reason: &str) -> ScopeError {
        ScopeError::InvalidLiteral {
            literal: self.source.to_string(),
            reason: format!("{} at offset {}", reason, self.pos),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> Result<Literal, ScopeError> {
        self.skip_whitespace();
        match self.peek() {
            Some('\'') | Some('"') => self.parse_string(),
            Some('[') => self.parse_list(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(_) => self.parse_word(),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_string(&mut self) -> Result<Literal, ScopeError> {
        let quote = self.chars[self.pos];
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(Literal::String(out));
                }
                Some('\\') => {
                    self.pos += 1;
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(c @ ('\\' | '\'' | '"')) => c,
                        _ => return Err(self.error("invalid escape sequence")),
                    };
                    out.push(escaped);
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_list(&mut self) -> Result<Literal, ScopeError> {
        self.pos += 1; // [
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(Literal::List(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(Literal::List(items));
                }
                _ => return Err(self.error("expected `,` or `]`")),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Literal, ScopeError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Literal::Integer(i));
        }
        text.parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| self.error("invalid number"))
    }

    fn parse_word(&mut self) -> Result<Literal, ScopeError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.to_ascii_lowercase().as_str() {
            "null" => Ok(Literal::Null),
            "true" => Ok(Literal::Boolean(true)),
            "false" => Ok(Literal::Boolean(false)),
            _ => Err(self.error("unknown keyword")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Literal::from("active"), "'active'" ; "string")]
    #[test_case(Literal::from("O'Brien"), r"'O\'Brien'" ; "string with quote")]
    #[test_case(Literal::from(r"C:\temp"), r"'C:\\temp'" ; "string with backslash")]
    #[test_case(Literal::from("a\nb"), r"'a\nb'" ; "string with newline")]
    #[test_case(Literal::from(5000), "5000" ; "integer")]
    #[test_case(Literal::from(-3), "-3" ; "negative integer")]
    #[test_case(Literal::from(2.5), "2.5" ; "float")]
    #[test_case(Literal::from(3.0), "3.0" ; "integral float")]
    #[test_case(Literal::from(true), "true" ; "boolean")]
    #[test_case(Literal::Null, "null" ; "null")]
    #[test_case(Literal::from(vec!["a", "b"]), "['a', 'b']" ; "list")]
    fn test_render(value: Literal, expected: &str) {
        assert_eq!(render_literal(&value).unwrap(), expected);
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert!(matches!(
            render_literal(&Literal::Float(f64::NAN)),
            Err(ScopeError::TypeMismatch { .. })
        ));
        assert!(render_literal(&Literal::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_rendered_literals_parse_back() {
        let values = vec![
            Literal::from("it's a \"test\"\\ with\ttabs"),
            Literal::from(""),
            Literal::from(i64::MIN),
            Literal::from(1e15),
            Literal::from(0.1),
            Literal::from(-2.75),
            Literal::from(false),
            Literal::Null,
            Literal::List(vec![]),
            Literal::List(vec![
                Literal::from(1),
                Literal::from("x"),
                Literal::Null,
                Literal::List(vec![Literal::from(true)]),
            ]),
        ];
        for value in values {
            let rendered = render_literal(&value).unwrap();
            assert_eq!(parse_literal(&rendered).unwrap(), value, "via {}", rendered);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_literal("'unterminated").is_err());
        assert!(parse_literal("[1, 2").is_err());
        assert!(parse_literal("maybe").is_err());
        assert!(parse_literal("1 2").is_err());

        match parse_literal("'unterminated") {
            Err(ScopeError::InvalidLiteral { literal, .. }) => assert_eq!(literal, "'unterminated"),
            other => panic!("expected InvalidLiteral, got {:?}", other),
        }
    }
}
