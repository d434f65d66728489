use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ScopeError;

/// Logical operators a condition can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Operator {
    Equal,          // =
    NotEqual,       // <>
    Less,           // <
    LessOrEqual,    // <=
    Greater,        // >
    GreaterOrEqual, // >=
    Contains,       // CONTAINS
    In,             // IN
    NotIn,          // NOT IN
    Between,        // range, emitted as >= AND <=
    NotBetween,     // negated range
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::Less,
        Operator::LessOrEqual,
        Operator::Greater,
        Operator::GreaterOrEqual,
        Operator::Contains,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
        Operator::NotBetween,
    ];

    /// Canonical Cypher token for this operator
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Contains => "CONTAINS",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        }
    }

    /// Parse an operator token. Accepts the canonical tokens plus the common
    /// spellings used by query builders (`==`, `!=`, `like`), case-insensitively.
    pub fn from_token(token: &str) -> Result<Self, ScopeError> {
        let normalized = token
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        let op = match normalized.as_str() {
            "=" | "==" => Operator::Equal,
            "<>" | "!=" => Operator::NotEqual,
            "<" => Operator::Less,
            "<=" => Operator::LessOrEqual,
            ">" => Operator::Greater,
            ">=" => Operator::GreaterOrEqual,
            "CONTAINS" | "LIKE" => Operator::Contains,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "BETWEEN" => Operator::Between,
            "NOT BETWEEN" => Operator::NotBetween,
            _ => return Err(ScopeError::unsupported(format!("operator `{}`", token))),
        };
        Ok(op)
    }

    /// Plain comparison operators that take a single scalar on the right
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::Less
                | Operator::LessOrEqual
                | Operator::Greater
                | Operator::GreaterOrEqual
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::from_token(s)
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.token().to_string()
    }
}

impl TryFrom<String> for Operator {
    type Error = ScopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Operator::from_token(&value)
    }
}

/// Boolean conjunction joining a record to the records before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_token_table_is_a_bijection() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_token(op.token()).unwrap(), op);
        }
        let mut tokens: Vec<&str> = Operator::ALL.iter().map(|op| op.token()).collect();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), Operator::ALL.len());
    }

    #[test_case("!=", Operator::NotEqual)]
    #[test_case("==", Operator::Equal)]
    #[test_case("like", Operator::Contains)]
    #[test_case("not   in", Operator::NotIn)]
    #[test_case("Between", Operator::Between)]
    fn test_builder_spellings(token: &str, expected: Operator) {
        assert_eq!(token.parse::<Operator>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_operator() {
        let err = Operator::from_token("=~").unwrap_err();
        assert_eq!(err, ScopeError::unsupported("operator `=~`"));
    }

    #[test]
    fn test_serde_uses_tokens() {
        let json = serde_json::to_string(&Operator::GreaterOrEqual).unwrap();
        assert_eq!(json, "\">=\"");
        let op: Operator = serde_json::from_str("\"not between\"").unwrap();
        assert_eq!(op, Operator::NotBetween);
    }
}
