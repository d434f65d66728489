//! Filter intermediate representation
//!
//! Sits between a recorded or declared scope and emitted query text:
//!
//! - [`Condition`]: a single property test against a literal (`p.status = 'active'`)
//! - [`Predicate`]: a condition, column comparison, existence check or group
//! - [`FilterExpr`]: conjunction-tagged predicates combined strictly in source order
//! - [`RelationshipStep`] / [`RelationshipSpec`]: the traversal path of a scope
//!
//! Records are lowered into this form by [`lowering::lower_records`].

pub mod literal;
pub mod lowering;
pub mod operator;

use serde::Serialize;

pub use literal::{Literal, ValueKind};
pub use lowering::{lower_records, lower_relationship_def, AliasAllocator, LoweredScope};
pub use operator::{Conjunction, Operator};

/// Relationship direction relative to the node the step starts from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
}

/// A bound node: alias plus label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    pub alias: String,
    pub label: String,
}

impl NodeRef {
    pub fn new(alias: impl Into<String>, label: impl Into<String>) -> Self {
        NodeRef {
            alias: alias.into(),
            label: label.into(),
        }
    }
}

/// Property test against a literal value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub alias: String,
    pub property: String,
    pub operator: Operator,
    pub value: Literal,
}

impl Condition {
    pub fn new(
        alias: impl Into<String>,
        property: impl Into<String>,
        operator: Operator,
        value: impl Into<Literal>,
    ) -> Self {
        Condition {
            alias: alias.into(),
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    Condition(Condition),

    /// `alias.left OP alias.right`, neither side quoted as a literal
    ColumnComparison {
        alias: String,
        left: String,
        operator: Operator,
        right: String,
    },

    /// `[NOT] EXISTS { MATCH (anchor)-[..]->(..) WHERE .. }`
    Exists {
        negated: bool,
        anchor: String,
        steps: Vec<RelationshipStep>,
    },

    /// Nested conditions of the hop at this index in the owning spec's path.
    /// Placed at the position of the call that introduced the hop.
    Hop(usize),

    Group(FilterExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Term {
    pub conjunction: Conjunction,
    pub predicate: Predicate,
}

/// Sequence of predicates joined by their own conjunction tags in source
/// order. The conjunction on the first term is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FilterExpr {
    pub terms: Vec<Term>,
}

impl FilterExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, conjunction: Conjunction, predicate: Predicate) {
        self.terms.push(Term {
            conjunction,
            predicate,
        });
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.push(Conjunction::And, predicate);
        self
    }

    pub fn or(mut self, predicate: Predicate) -> Self {
        self.push(Conjunction::Or, predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

/// One traversal hop to a related node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipStep {
    /// Relationship type, e.g. `HAS_ROLE`
    pub relationship: String,
    pub target: NodeRef,
    pub direction: Direction,
    /// Conditions scoped to `target.alias`
    pub conditions: FilterExpr,
}

/// Full traversal of a relationship scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipSpec {
    pub start: NodeRef,
    pub steps: Vec<RelationshipStep>,
    pub filter: FilterExpr,
    distinct: bool,
}

impl RelationshipSpec {
    /// Every MATCH hop can fan out, so `distinct` is derived from the step count.
    pub fn new(start: NodeRef, steps: Vec<RelationshipStep>, filter: FilterExpr) -> Self {
        let distinct = !steps.is_empty();
        RelationshipSpec {
            start,
            steps,
            filter,
            distinct,
        }
    }

    pub fn distinct(&self) -> bool {
        self.distinct
    }

    /// Node at the end of the MATCH path (the start node if there are no hops)
    pub fn tail(&self) -> &NodeRef {
        self.steps.last().map(|s| &s.target).unwrap_or(&self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(rel: &str, alias: &str, label: &str) -> RelationshipStep {
        RelationshipStep {
            relationship: rel.to_string(),
            target: NodeRef::new(alias, label),
            direction: Direction::Outgoing,
            conditions: FilterExpr::new(),
        }
    }

    #[test]
    fn test_distinct_follows_step_count() {
        let start = NodeRef::new("p", "Person");
        let spec = RelationshipSpec::new(start.clone(), vec![], FilterExpr::new());
        assert!(!spec.distinct());
        assert_eq!(spec.tail(), &start);

        let spec = RelationshipSpec::new(
            start,
            vec![step("HAS_ROLE", "pt", "PersonTeam"), step("IN_TEAM", "t", "Team")],
            FilterExpr::new(),
        );
        assert!(spec.distinct());
        assert_eq!(spec.tail().alias, "t");
    }

    #[test]
    fn test_filter_builder_keeps_source_order() {
        let filter = FilterExpr::new()
            .and(Predicate::Condition(Condition::new("p", "a", Operator::Equal, 1)))
            .or(Predicate::Condition(Condition::new("p", "b", Operator::Equal, 2)));
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.terms[1].conjunction, Conjunction::Or);
    }
}
