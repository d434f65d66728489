//! Identifier sanitizer
//!
//! Every label, relationship type, property key and alias that reaches emitted
//! query text passes through [`sanitize_identifier`]. Two independent layers
//! are applied:
//!
//! 1. **Validation**: the identifier must match `[A-Za-z_][A-Za-z0-9_]*`, be at
//!    most 255 characters long and must not be a reserved Cypher keyword
//!    (case-insensitive).
//! 2. **Escaping**: [`escape_identifier`] is applied to the validated value as
//!    well, backtick-quoting anything outside the plain identifier alphabet.
//!
//! Offending identifiers are rejected with [`ScopeError::InjectionRisk`]; they
//! are never truncated, rewritten or dropped.

use std::collections::HashSet;

use regex::Regex;

use crate::errors::ScopeError;

pub const MAX_IDENTIFIER_LENGTH: usize = 255;

lazy_static::lazy_static! {
    static ref IDENTIFIER_GRAMMAR: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .expect("identifier grammar is a valid regex");

    static ref RESERVED_KEYWORDS: HashSet<&'static str> = [
        // Clauses
        "match", "optional", "where", "return", "with", "unwind", "order", "by",
        "skip", "limit", "union", "distinct", "yield", "use", "foreach", "load",
        // Writes
        "create", "merge", "delete", "detach", "remove", "set", "drop", "call",
        // Expressions
        "and", "or", "xor", "not", "in", "is", "null", "true", "false",
        "exists", "case", "when", "then", "else", "end",
    ]
    .into_iter()
    .collect();
}

/// Returns true if the identifier is a reserved query-language keyword (any case)
pub fn is_reserved_keyword(identifier: &str) -> bool {
    RESERVED_KEYWORDS.contains(identifier.to_ascii_lowercase().as_str())
}

/// Validate an identifier without escaping it
pub fn validate_identifier(identifier: &str) -> Result<(), ScopeError> {
    if identifier.is_empty() {
        return Err(ScopeError::injection(identifier, "identifier is empty"));
    }

    if identifier.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ScopeError::injection(
            identifier,
            format!(
                "identifier is {} characters long (maximum {})",
                identifier.len(),
                MAX_IDENTIFIER_LENGTH
            ),
        ));
    }

    if !IDENTIFIER_GRAMMAR.is_match(identifier) {
        let reason = match identifier
            .chars()
            .enumerate()
            .find(|(i, c)| !(c.is_ascii_alphabetic() || *c == '_' || (*i > 0 && c.is_ascii_digit())))
        {
            Some((0, c)) => format!("must start with a letter or underscore, found `{}`", c),
            Some((_, c)) => format!("invalid character `{}`", c),
            None => "does not match identifier grammar".to_string(),
        };
        return Err(ScopeError::injection(identifier, reason));
    }

    if is_reserved_keyword(identifier) {
        return Err(ScopeError::injection(
            identifier,
            "identifier is a reserved query keyword",
        ));
    }

    Ok(())
}

/// Backtick-quote an identifier if it contains anything outside `[A-Za-z0-9_]`
/// or starts with a digit. Embedded backticks are doubled.
///
/// # Examples
/// ```
/// use scopegraph::sanitizer::escape_identifier;
/// assert_eq!(escape_identifier("role_type"), "role_type");
/// assert_eq!(escape_identifier("role type"), "`role type`");
/// assert_eq!(escape_identifier("a`b"), "`a``b`");
/// ```
pub fn escape_identifier(identifier: &str) -> String {
    let plain = identifier
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if plain {
        identifier.to_string()
    } else {
        format!("`{}`", identifier.replace('`', "``"))
    }
}

/// Validate, then escape. This is the only path by which identifiers reach
/// emitted query text.
pub fn sanitize_identifier(identifier: &str) -> Result<String, ScopeError> {
    validate_identifier(identifier)?;
    Ok(escape_identifier(identifier))
}

/// Sanitize a qualified property reference: `alias.property`
pub fn qualified_property(alias: &str, property: &str) -> Result<String, ScopeError> {
    Ok(format!(
        "{}.{}",
        sanitize_identifier(alias)?,
        sanitize_identifier(property)?
    ))
}
