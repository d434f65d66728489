//! `{placeholder}` substitution for pattern templates
//!
//! A placeholder is an identifier in braces (`{rel_type}`, `{minCount}`). Braces
//! followed by anything else are left alone, so Cypher map literals and
//! subqueries (`EXISTS { MATCH ... }`, `duration({days: {days}})`) survive.

use std::collections::{BTreeMap, BTreeSet};

use regex::{Captures, Regex};

use super::ParamKind;
use crate::errors::ScopeError;
use crate::filter_ir::Literal;
use crate::query_emitter::render_literal;
use crate::sanitizer::sanitize_identifier;

lazy_static::lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is a valid regex");

    static ref TRAILING_LIMIT: Regex = Regex::new(
        r"(?i)\bLIMIT\s+(\d+|\{[A-Za-z_][A-Za-z0-9_]*\}|\$[A-Za-z_][A-Za-z0-9_]*)\s*;?\s*$"
    )
    .expect("limit pattern is a valid regex");
}

/// Placeholder bound by the classifier to the scope entity's label
pub const ENTITY_PLACEHOLDER: &str = "entity";
/// Placeholder bound by the classifier to the scope entity's alias
pub const ALIAS_PLACEHOLDER: &str = "alias";

/// Names of every placeholder referenced by a template, in first-use order
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Whether a query template closes with its own `LIMIT` clause.
///
/// Checked on the template, never on rendered text, where bound string values
/// could contain the word.
pub fn ends_with_limit(template: &str) -> bool {
    TRAILING_LIMIT.is_match(template)
}

/// Substitute placeholders with plain display text
pub fn render_description(template: &str, params: &BTreeMap<String, Literal>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Substitute placeholders with query text.
///
/// Identifiers and labels are sanitized, dates become quoted strings and every
/// other value is rendered as a literal. `resolve` returns the value and kind
/// bound to a placeholder, or `None` if it is unbound.
pub fn render_query<'a, F>(template: &str, mut resolve: F) -> Result<String, ScopeError>
where
    F: FnMut(&str) -> Result<(ParamKind, &'a Literal), ScopeError>,
{
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        let (kind, value) = resolve(name.as_str())?;
        out.push_str(&render_value(kind, value)?);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn render_value(kind: ParamKind, value: &Literal) -> Result<String, ScopeError> {
    match kind {
        ParamKind::Identifier | ParamKind::Label => {
            let text = value.as_str().ok_or_else(|| {
                ScopeError::type_mismatch("identifier", "a string", value.kind().to_string())
            })?;
            sanitize_identifier(text)
        }
        _ => render_literal(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_skip_cypher_braces() {
        let template = "MATCH ({alias}:{entity}) WHERE NOT EXISTS { MATCH ({alias})-[:{rel_type}]->() } AND x > duration({days: {days}})";
        assert_eq!(placeholders(template), vec!["alias", "entity", "rel_type", "days"]);
    }

    #[test]
    fn test_ends_with_limit() {
        assert!(ends_with_limit("MATCH (n) RETURN n LIMIT 5"));
        assert!(ends_with_limit("MATCH (n) RETURN n limit {max_rows};"));
        assert!(!ends_with_limit("MATCH (n) WHERE n.plan = {plan} RETURN n"));
        assert!(!ends_with_limit("MATCH (n) WHERE n.note = 'no LIMIT 5' RETURN n"));
    }

    #[test]
    fn test_placeholders_accept_mixed_case() {
        assert_eq!(placeholders("{minCount} of {Target} {min_count}"), vec!["minCount", "Target", "min_count"]);
    }

    #[test]
    fn test_render_description() {
        let mut params = BTreeMap::new();
        params.insert("rel_type".to_string(), Literal::from("HAS_ROLE"));
        params.insert("min_count".to_string(), Literal::from(3));
        assert_eq!(
            render_description("At least {min_count} {rel_type} links", &params),
            "At least 3 HAS_ROLE links"
        );
        // Unbound placeholders are kept verbatim
        assert_eq!(render_description("{missing}", &params), "{missing}");
    }

    #[test]
    fn test_render_query_sanitizes_identifiers() {
        let label = Literal::from("Person");
        let days = Literal::from(30);
        let rendered = render_query("MATCH (n:{label}) WHERE n.age > {days}", |name| match name {
            "label" => Ok((ParamKind::Label, &label)),
            _ => Ok((ParamKind::Integer, &days)),
        })
        .unwrap();
        assert_eq!(rendered, "MATCH (n:Person) WHERE n.age > 30");

        let evil = Literal::from("Person}) DETACH DELETE n //");
        let err = render_query("MATCH (n:{label})", |_| Ok((ParamKind::Label, &evil))).unwrap_err();
        assert!(err.is_injection_risk());
    }
}
