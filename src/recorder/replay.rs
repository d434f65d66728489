//! Replay of declarative call lists through the recorder
//!
//! A declarative scope may list its calls as data instead of code:
//!
//! ```yaml
//! calls:
//!   - op: where
//!     column: status
//!     value: active
//!   - op: orWhereHas
//!     relation: roles
//!     calls:
//!       - { op: where, column: role_type, value: volunteer }
//! ```
//!
//! Replaying goes through the same recorder methods as code-defined scopes, so
//! both produce identical records.

use serde::{Deserialize, Serialize};

use super::{CallRecorder, ConditionRecorder, OperationKind, RecordConditions};
use crate::errors::ScopeError;
use crate::filter_ir::{Literal, Operator};

/// One call of a declarative scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallDef {
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Absent and `null` both mean a null literal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Literal>>,
    /// Right-hand column of `whereColumn`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallDef>,
}

impl CallDef {
    fn required<'a>(&self, field: &'a str, value: &'a Option<String>) -> Result<&'a str, ScopeError> {
        value.as_deref().ok_or_else(|| ScopeError::ManifestParse {
            message: format!("call `{}` requires `{}`", self.op, field),
        })
    }

    fn value_or_null(&self) -> Literal {
        self.value.clone().unwrap_or(Literal::Null)
    }

    /// `values: [..]` or a list given as `value`
    fn list(&self) -> Literal {
        match &self.values {
            Some(values) => Literal::List(values.clone()),
            None => self.value_or_null(),
        }
    }

    fn range(&self, operator: Operator) -> Result<(Literal, Literal), ScopeError> {
        let found = match self.list() {
            Literal::List(bounds) => match <[Literal; 2]>::try_from(bounds) {
                Ok([low, high]) => return Ok((low, high)),
                Err(bounds) => describe(&Literal::List(bounds)),
            },
            other => describe(&other),
        };
        Err(ScopeError::type_mismatch(
            operator.token(),
            "a list of exactly two bounds",
            found,
        ))
    }
}

fn describe(value: &Literal) -> String {
    match value {
        Literal::List(items) => format!("list of {} values", items.len()),
        other => other.kind().to_string(),
    }
}

/// Apply a non-relationship call to any recorder
fn apply_condition<R: RecordConditions>(
    recorder: &mut R,
    kind: OperationKind,
    def: &CallDef,
) -> Result<(), ScopeError> {
    match kind {
        OperationKind::Where => {
            let column = def.required("column", &def.column)?;
            let operator = match &def.operator {
                Some(token) => Operator::from_token(token)?,
                None => Operator::Equal,
            };
            recorder.where_op(column, operator, def.value_or_null())?;
        }
        OperationKind::WhereIn => {
            recorder.where_in(def.required("column", &def.column)?, def.list())?;
        }
        OperationKind::WhereNotIn => {
            recorder.where_not_in(def.required("column", &def.column)?, def.list())?;
        }
        OperationKind::WhereNull => {
            recorder.where_null(def.required("column", &def.column)?)?;
        }
        OperationKind::WhereNotNull => {
            recorder.where_not_null(def.required("column", &def.column)?)?;
        }
        OperationKind::WhereBetween => {
            let (low, high) = def.range(Operator::Between)?;
            recorder.where_between(def.required("column", &def.column)?, low, high)?;
        }
        OperationKind::WhereNotBetween => {
            let (low, high) = def.range(Operator::NotBetween)?;
            recorder.where_not_between(def.required("column", &def.column)?, low, high)?;
        }
        OperationKind::WhereColumn => {
            recorder.where_column(
                def.required("column", &def.column)?,
                def.operator.as_deref().unwrap_or("="),
                def.required("other_column", &def.other_column)?,
            )?;
        }
        OperationKind::WhereLike => {
            recorder.where_like(def.required("column", &def.column)?, def.value_or_null())?;
        }
        OperationKind::WhereHas | OperationKind::WhereDoesntHave => {
            return Err(ScopeError::unsupported(format!("{} as a condition", kind)));
        }
    }
    Ok(())
}

impl CallRecorder {
    /// Record one declarative call, including its nested calls
    pub fn apply(&mut self, def: &CallDef) -> Result<&mut Self, ScopeError> {
        let (conjunction, kind) = OperationKind::parse_call_name(&def.op)?;
        self.set_pending(conjunction);

        if kind.is_relationship() {
            let relation = def.required("relation", &def.relation)?;
            let nested = |q: &mut ConditionRecorder| -> Result<(), ScopeError> {
                for child in &def.calls {
                    q.apply(child)?;
                }
                Ok(())
            };
            if kind == OperationKind::WhereHas {
                self.where_has(relation, nested)?;
            } else {
                self.where_doesnt_have(relation, nested)?;
            }
        } else {
            apply_condition(self, kind, def)?;
        }
        Ok(self)
    }
}

impl ConditionRecorder {
    /// Record one declarative call inside a relationship's nested pass
    pub fn apply(&mut self, def: &CallDef) -> Result<&mut Self, ScopeError> {
        let (conjunction, kind) = OperationKind::parse_call_name(&def.op)?;
        if kind.is_relationship() {
            let relation = def.relation.as_deref().unwrap_or(def.op.as_str());
            return self.has(relation);
        }
        self.set_pending(conjunction);
        apply_condition(self, kind, def)?;
        Ok(self)
    }
}
