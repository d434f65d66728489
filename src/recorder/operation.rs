use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::ScopeError;
use crate::filter_ir::{Conjunction, Literal, Operator};

/// Closed set of operations a scope definition may record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Where,
    WhereIn,
    WhereNotIn,
    WhereNull,
    WhereNotNull,
    WhereBetween,
    WhereNotBetween,
    WhereColumn,
    WhereLike,
    WhereHas,
    WhereDoesntHave,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Where => "where",
            OperationKind::WhereIn => "whereIn",
            OperationKind::WhereNotIn => "whereNotIn",
            OperationKind::WhereNull => "whereNull",
            OperationKind::WhereNotNull => "whereNotNull",
            OperationKind::WhereBetween => "whereBetween",
            OperationKind::WhereNotBetween => "whereNotBetween",
            OperationKind::WhereColumn => "whereColumn",
            OperationKind::WhereLike => "whereLike",
            OperationKind::WhereHas => "whereHas",
            OperationKind::WhereDoesntHave => "whereDoesntHave",
        }
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self, OperationKind::WhereHas | OperationKind::WhereDoesntHave)
    }

    /// Parse an operation name as written in a declarative scope, returning the
    /// conjunction implied by an `or` prefix.
    ///
    /// Spellings are matched ignoring case and underscores, so `orWhereIn`,
    /// `or_where_in` and `ORWHEREIN` are the same operation.
    pub fn parse_call_name(name: &str) -> Result<(Conjunction, OperationKind), ScopeError> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_')
            .flat_map(|c| c.to_lowercase())
            .collect();

        let (conjunction, base) = match normalized.strip_prefix("or") {
            Some(rest) if rest.starts_with("where") || rest == "has" || rest == "doesnthave" => {
                (Conjunction::Or, rest)
            }
            _ => (Conjunction::And, normalized.as_str()),
        };

        let kind = match base {
            "where" => OperationKind::Where,
            "wherein" => OperationKind::WhereIn,
            "wherenotin" => OperationKind::WhereNotIn,
            "wherenull" => OperationKind::WhereNull,
            "wherenotnull" => OperationKind::WhereNotNull,
            "wherebetween" => OperationKind::WhereBetween,
            "wherenotbetween" => OperationKind::WhereNotBetween,
            "wherecolumn" => OperationKind::WhereColumn,
            "wherelike" => OperationKind::WhereLike,
            "wherehas" | "has" => OperationKind::WhereHas,
            "wheredoesnthave" | "wheredoesnothave" | "doesnthave" => {
                OperationKind::WhereDoesntHave
            }
            _ => return Err(ScopeError::unsupported(name)),
        };
        Ok((conjunction, kind))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::parse_call_name(s).map(|(_, kind)| kind)
    }
}

/// A non-relationship call. Structurally has no children.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ConditionCall {
    Compare {
        kind: OperationKind,
        column: String,
        operator: Operator,
        value: Literal,
    },
    Column {
        left: String,
        operator: Operator,
        right: String,
    },
}

impl ConditionCall {
    pub fn kind(&self) -> OperationKind {
        match self {
            ConditionCall::Compare { kind, .. } => *kind,
            ConditionCall::Column { .. } => OperationKind::WhereColumn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildRecord {
    pub conjunction: Conjunction,
    pub call: ConditionCall,
}

/// A relationship existence (or absence) call with its one nested pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipCall {
    /// Relation name; dotted paths (`roles.team`) traverse several hops
    pub relation: String,
    pub negated: bool,
    pub children: Vec<ChildRecord>,
}

impl RelationshipCall {
    pub fn kind(&self) -> OperationKind {
        if self.negated {
            OperationKind::WhereDoesntHave
        } else {
            OperationKind::WhereHas
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "call", rename_all = "snake_case")]
pub enum Operation {
    Condition(ConditionCall),
    Relationship(RelationshipCall),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub conjunction: Conjunction,
    pub operation: Operation,
}

impl CallRecord {
    pub fn kind(&self) -> OperationKind {
        match &self.operation {
            Operation::Condition(call) => call.kind(),
            Operation::Relationship(call) => call.kind(),
        }
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self.operation, Operation::Relationship(_))
    }
}
