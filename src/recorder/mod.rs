//! Call recorder
//!
//! Captures the predicate operations of a scope definition as an ordered list
//! of [`CallRecord`]s without executing anything. Each call is tagged with the
//! conjunction pending at the time it was made (`and` unless [`or`] was called
//! just before it).
//!
//! Relationship calls take one nested pass: the caller's closure receives a
//! fresh [`ConditionRecorder`] whose records become the call's children. A
//! [`ConditionRecorder`] can only hold [`ConditionCall`]s, so a relationship
//! call inside the nested pass fails with
//! [`ScopeError::NestedCallbackTooDeep`].
//!
//! ```
//! use scopegraph::recorder::{CallRecorder, RecordConditions};
//!
//! let mut recorder = CallRecorder::new();
//! recorder
//!     .where_eq("status", "active")?
//!     .where_has("roles", |q| {
//!         q.where_eq("role_type", "volunteer")?;
//!         Ok(())
//!     })?;
//! assert_eq!(recorder.records().len(), 2);
//! # Ok::<(), scopegraph::errors::ScopeError>(())
//! ```
//!
//! [`or`]: RecordConditions::or

pub mod operation;
pub mod replay;

pub use operation::{
    CallRecord, ChildRecord, ConditionCall, Operation, OperationKind, RelationshipCall,
};
pub use replay::CallDef;

use crate::errors::ScopeError;
use crate::filter_ir::{Conjunction, Literal, Operator};

/// Condition operations shared by the top-level and nested recorders
pub trait RecordConditions: Sized {
    /// Append a condition tagged with the pending conjunction
    fn push_condition(&mut self, call: ConditionCall);

    fn set_pending(&mut self, conjunction: Conjunction);

    /// Join the next call with `OR` instead of `AND`
    fn or(&mut self) -> &mut Self {
        self.set_pending(Conjunction::Or);
        self
    }

    fn where_op(
        &mut self,
        column: &str,
        operator: Operator,
        value: impl Into<Literal>,
    ) -> Result<&mut Self, ScopeError> {
        let kind = match operator {
            Operator::In => OperationKind::WhereIn,
            Operator::NotIn => OperationKind::WhereNotIn,
            Operator::Between => OperationKind::WhereBetween,
            Operator::NotBetween => OperationKind::WhereNotBetween,
            Operator::Contains => OperationKind::WhereLike,
            _ => OperationKind::Where,
        };
        self.push_condition(ConditionCall::Compare {
            kind,
            column: column.to_string(),
            operator,
            value: value.into(),
        });
        Ok(self)
    }

    /// Comparison with an operator token (`>=`, `!=`, `like`, ...)
    fn where_cmp(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<Literal>,
    ) -> Result<&mut Self, ScopeError> {
        let operator = Operator::from_token(operator)?;
        self.where_op(column, operator, value)
    }

    fn where_eq(&mut self, column: &str, value: impl Into<Literal>) -> Result<&mut Self, ScopeError> {
        self.where_op(column, Operator::Equal, value)
    }

    fn where_in(&mut self, column: &str, values: impl Into<Literal>) -> Result<&mut Self, ScopeError> {
        self.where_op(column, Operator::In, values)
    }

    fn where_not_in(
        &mut self,
        column: &str,
        values: impl Into<Literal>,
    ) -> Result<&mut Self, ScopeError> {
        self.where_op(column, Operator::NotIn, values)
    }

    fn where_null(&mut self, column: &str) -> Result<&mut Self, ScopeError> {
        self.push_condition(ConditionCall::Compare {
            kind: OperationKind::WhereNull,
            column: column.to_string(),
            operator: Operator::Equal,
            value: Literal::Null,
        });
        Ok(self)
    }

    fn where_not_null(&mut self, column: &str) -> Result<&mut Self, ScopeError> {
        self.push_condition(ConditionCall::Compare {
            kind: OperationKind::WhereNotNull,
            column: column.to_string(),
            operator: Operator::NotEqual,
            value: Literal::Null,
        });
        Ok(self)
    }

    fn where_between(
        &mut self,
        column: &str,
        low: impl Into<Literal>,
        high: impl Into<Literal>,
    ) -> Result<&mut Self, ScopeError> {
        self.where_op(
            column,
            Operator::Between,
            Literal::List(vec![low.into(), high.into()]),
        )
    }

    fn where_not_between(
        &mut self,
        column: &str,
        low: impl Into<Literal>,
        high: impl Into<Literal>,
    ) -> Result<&mut Self, ScopeError> {
        self.where_op(
            column,
            Operator::NotBetween,
            Literal::List(vec![low.into(), high.into()]),
        )
    }

    /// Column-to-column comparison: `alias.left OP alias.right`
    fn where_column(
        &mut self,
        left: &str,
        operator: &str,
        right: &str,
    ) -> Result<&mut Self, ScopeError> {
        let operator = Operator::from_token(operator)?;
        if !operator.is_comparison() {
            return Err(ScopeError::type_mismatch(
                operator.token(),
                "a plain comparison between two columns",
                "column reference",
            ));
        }
        self.push_condition(ConditionCall::Column {
            left: left.to_string(),
            operator,
            right: right.to_string(),
        });
        Ok(self)
    }

    /// Substring match, emitted as `CONTAINS`
    fn where_like(&mut self, column: &str, needle: impl Into<Literal>) -> Result<&mut Self, ScopeError> {
        self.where_op(column, Operator::Contains, needle)
    }
}

/// Top-level recorder handed to a scope definition
#[derive(Debug, Default)]
pub struct CallRecorder {
    records: Vec<CallRecord>,
    pending: Conjunction,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Related records must exist; `nested` may add conditions on them
    pub fn where_has<F>(&mut self, relation: &str, nested: F) -> Result<&mut Self, ScopeError>
    where
        F: FnOnce(&mut ConditionRecorder) -> Result<(), ScopeError>,
    {
        self.record_relationship(relation, false, nested)
    }

    /// Related records matching `nested` must not exist
    pub fn where_doesnt_have<F>(
        &mut self,
        relation: &str,
        nested: F,
    ) -> Result<&mut Self, ScopeError>
    where
        F: FnOnce(&mut ConditionRecorder) -> Result<(), ScopeError>,
    {
        self.record_relationship(relation, true, nested)
    }

    pub fn has(&mut self, relation: &str) -> Result<&mut Self, ScopeError> {
        self.where_has(relation, |_| Ok(()))
    }

    pub fn doesnt_have(&mut self, relation: &str) -> Result<&mut Self, ScopeError> {
        self.where_doesnt_have(relation, |_| Ok(()))
    }

    fn record_relationship<F>(
        &mut self,
        relation: &str,
        negated: bool,
        nested: F,
    ) -> Result<&mut Self, ScopeError>
    where
        F: FnOnce(&mut ConditionRecorder) -> Result<(), ScopeError>,
    {
        // Take the conjunction before the nested pass so an `or()` inside the
        // closure cannot leak out to this call
        let conjunction = std::mem::take(&mut self.pending);

        let mut child = ConditionRecorder::new(relation);
        nested(&mut child)?;

        self.records.push(CallRecord {
            conjunction,
            operation: Operation::Relationship(RelationshipCall {
                relation: relation.to_string(),
                negated,
                children: child.into_records(),
            }),
        });
        Ok(self)
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CallRecord> {
        self.records
    }

    pub fn relationship_operation_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_relationship()).count()
    }
}

impl RecordConditions for CallRecorder {
    fn push_condition(&mut self, call: ConditionCall) {
        let conjunction = std::mem::take(&mut self.pending);
        self.records.push(CallRecord {
            conjunction,
            operation: Operation::Condition(call),
        });
    }

    fn set_pending(&mut self, conjunction: Conjunction) {
        self.pending = conjunction;
    }
}

/// Recorder for the single nested pass of a relationship call
#[derive(Debug)]
pub struct ConditionRecorder {
    relation: String,
    records: Vec<ChildRecord>,
    pending: Conjunction,
}

impl ConditionRecorder {
    pub(crate) fn new(relation: &str) -> Self {
        ConditionRecorder {
            relation: relation.to_string(),
            records: Vec::new(),
            pending: Conjunction::And,
        }
    }

    /// Always fails: only one level of relationship nesting is allowed
    pub fn where_has<F>(&mut self, relation: &str, _nested: F) -> Result<&mut Self, ScopeError>
    where
        F: FnOnce(&mut ConditionRecorder) -> Result<(), ScopeError>,
    {
        Err(self.too_deep(relation))
    }

    /// Always fails: only one level of relationship nesting is allowed
    pub fn where_doesnt_have<F>(
        &mut self,
        relation: &str,
        _nested: F,
    ) -> Result<&mut Self, ScopeError>
    where
        F: FnOnce(&mut ConditionRecorder) -> Result<(), ScopeError>,
    {
        Err(self.too_deep(relation))
    }

    pub fn has(&mut self, relation: &str) -> Result<&mut Self, ScopeError> {
        Err(self.too_deep(relation))
    }

    pub fn doesnt_have(&mut self, relation: &str) -> Result<&mut Self, ScopeError> {
        Err(self.too_deep(relation))
    }

    fn too_deep(&self, relation: &str) -> ScopeError {
        log::debug!(
            "Rejecting nested relationship `{}` inside `{}`",
            relation,
            self.relation
        );
        ScopeError::NestedCallbackTooDeep {
            relation: format!("{}.{}", self.relation, relation),
        }
    }

    pub fn records(&self) -> &[ChildRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ChildRecord> {
        self.records
    }
}

impl RecordConditions for ConditionRecorder {
    fn push_condition(&mut self, call: ConditionCall) {
        let conjunction = std::mem::take(&mut self.pending);
        self.records.push(ChildRecord { conjunction, call });
    }

    fn set_pending(&mut self, conjunction: Conjunction) {
        self.pending = conjunction;
    }
}

/// Run a scope definition against a fresh recorder and return its records
pub fn record<F>(definition: F) -> Result<Vec<CallRecord>, ScopeError>
where
    F: FnOnce(&mut CallRecorder) -> Result<(), ScopeError>,
{
    let mut recorder = CallRecorder::new();
    definition(&mut recorder)?;
    Ok(recorder.into_records())
}
