//! Query emitter
//!
//! Walks the filter IR and produces Cypher text:
//!
//! - **Property filters** become a bare predicate fragment:
//!   `p.status = 'active' AND p.value >= 5000`
//! - **Relationship traversals** become a full statement:
//!   `MATCH (p:Person)-[:HAS_ROLE]->(pt:PersonTeam) WHERE pt.role_type = 'volunteer' RETURN DISTINCT p LIMIT 100`
//! - **Patterns** render their query template, with `LIMIT` appended unless
//!   the template ends in its own `LIMIT` clause
//!
//! Terms are joined strictly in source order with their own conjunction tag.
//! No precedence regrouping is done; the only parentheses added are around a
//! multi-term nested relationship group and around a negated range.
//!
//! Every identifier goes through [`crate::sanitizer`]; every value through
//! [`render_literal`]. Any operator/value kind mismatch aborts emission.

pub mod literal;
pub mod relationship;

pub use literal::{escape_string, parse_literal, render_literal};
pub use relationship::{derive_relationship_type, render_hop, render_node, render_path};

use crate::errors::ScopeError;
use crate::filter_ir::{
    Condition, FilterExpr, Literal, Operator, Predicate, RelationshipSpec, RelationshipStep,
};
use crate::pattern_library::{template, PatternInstance};
use crate::sanitizer::{qualified_property, sanitize_identifier};

/// Fragment emitted for a property filter with no conditions
pub const MATCH_ALL_FRAGMENT: &str = "true";

#[derive(Debug, Clone)]
pub struct QueryEmitter {
    result_limit: u32,
}

impl Default for QueryEmitter {
    fn default() -> Self {
        QueryEmitter { result_limit: 100 }
    }
}

impl QueryEmitter {
    pub fn new(result_limit: u32) -> Self {
        QueryEmitter { result_limit }
    }

    pub fn result_limit(&self) -> u32 {
        self.result_limit
    }

    /// Emit a predicate fragment for a filter with no MATCH path
    pub fn emit_fragment(&self, filter: &FilterExpr) -> Result<String, ScopeError> {
        if filter.is_empty() {
            return Ok(MATCH_ALL_FRAGMENT.to_string());
        }
        self.render_expr(filter, &[])
    }

    /// Emit `MATCH ... [WHERE ...] RETURN [DISTINCT] start LIMIT n`
    pub fn emit_statement(&self, spec: &RelationshipSpec) -> Result<String, ScopeError> {
        let head = render_node(&spec.start)?;
        let path = render_path(&head, &spec.steps)?;
        let start = sanitize_identifier(&spec.start.alias)?;

        let mut statement = format!("MATCH {}", path);
        if !spec.filter.is_empty() {
            statement.push_str(" WHERE ");
            statement.push_str(&self.render_expr(&spec.filter, &spec.steps)?);
        }
        statement.push_str(" RETURN ");
        if spec.distinct() {
            statement.push_str("DISTINCT ");
        }
        statement.push_str(&start);
        statement.push_str(&format!(" LIMIT {}", self.result_limit));
        Ok(statement)
    }

    /// Render an instantiated pattern's query template as a full statement
    pub fn emit_pattern(&self, instance: &PatternInstance) -> Result<Option<String>, ScopeError> {
        let Some(query) = instance.render_query()? else {
            return Ok(None);
        };
        let query = query.trim_end().trim_end_matches(';').to_string();
        let has_limit = instance
            .definition()
            .query_template
            .as_deref()
            .is_some_and(template::ends_with_limit);
        if has_limit {
            Ok(Some(query))
        } else {
            Ok(Some(format!("{} LIMIT {}", query, self.result_limit)))
        }
    }

    fn render_expr(&self, expr: &FilterExpr, steps: &[RelationshipStep]) -> Result<String, ScopeError> {
        let mut out = String::new();
        for (i, term) in expr.terms.iter().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(term.conjunction.keyword());
                out.push(' ');
            }
            out.push_str(&self.render_predicate(&term.predicate, steps)?);
        }
        Ok(out)
    }

    /// Parenthesize only when more than one term is joined
    fn render_group(&self, expr: &FilterExpr, steps: &[RelationshipStep]) -> Result<String, ScopeError> {
        let inner = self.render_expr(expr, steps)?;
        if expr.len() > 1 {
            Ok(format!("({})", inner))
        } else {
            Ok(inner)
        }
    }

    fn render_predicate(
        &self,
        predicate: &Predicate,
        steps: &[RelationshipStep],
    ) -> Result<String, ScopeError> {
        match predicate {
            Predicate::Condition(condition) => render_condition(condition),

            Predicate::ColumnComparison {
                alias,
                left,
                operator,
                right,
            } => {
                if !operator.is_comparison() {
                    return Err(ScopeError::type_mismatch(
                        operator.token(),
                        "a plain comparison between two columns",
                        "column reference",
                    ));
                }
                Ok(format!(
                    "{} {} {}",
                    qualified_property(alias, left)?,
                    operator.token(),
                    qualified_property(alias, right)?
                ))
            }

            Predicate::Exists {
                negated,
                anchor,
                steps: sub_steps,
            } => {
                let head = format!("({})", sanitize_identifier(anchor)?);
                let mut sub = format!("MATCH {}", render_path(&head, sub_steps)?);

                let conditions: Vec<String> = sub_steps
                    .iter()
                    .filter(|s| !s.conditions.is_empty())
                    .map(|s| self.render_group(&s.conditions, sub_steps))
                    .collect::<Result<_, _>>()?;
                if !conditions.is_empty() {
                    sub.push_str(" WHERE ");
                    sub.push_str(&conditions.join(" AND "));
                }

                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{}EXISTS {{ {} }}", not, sub))
            }

            Predicate::Hop(index) => {
                let step = steps.get(*index).ok_or_else(|| {
                    ScopeError::unsupported(format!("reference to hop {} outside the MATCH path", index))
                })?;
                self.render_group(&step.conditions, steps)
            }

            Predicate::Group(expr) => Ok(format!("({})", self.render_expr(expr, steps)?)),
        }
    }
}

/// Render a single property condition, checking the value kind against the operator
pub fn render_condition(condition: &Condition) -> Result<String, ScopeError> {
    let property = qualified_property(&condition.alias, &condition.property)?;
    let op = condition.operator;
    let value = &condition.value;

    match op {
        Operator::Equal | Operator::NotEqual if value.is_null() => {
            let test = if op == Operator::Equal { "IS NULL" } else { "IS NOT NULL" };
            Ok(format!("{} {}", property, test))
        }

        _ if op.is_comparison() => {
            expect_scalar(op, value)?;
            Ok(format!("{} {} {}", property, op.token(), render_literal(value)?))
        }

        Operator::Contains => match value {
            Literal::String(_) => Ok(format!("{} CONTAINS {}", property, render_literal(value)?)),
            other => Err(ScopeError::type_mismatch(op.token(), "a string", other.kind().to_string())),
        },

        Operator::In | Operator::NotIn => match value {
            Literal::List(items) => {
                for item in items {
                    if matches!(item, Literal::List(_)) {
                        return Err(ScopeError::type_mismatch(
                            op.token(),
                            "a list of scalar values",
                            "nested list",
                        ));
                    }
                }
                let list = render_literal(value)?;
                if op == Operator::In {
                    Ok(format!("{} IN {}", property, list))
                } else {
                    Ok(format!("NOT {} IN {}", property, list))
                }
            }
            other => Err(ScopeError::type_mismatch(op.token(), "a list", other.kind().to_string())),
        },

        Operator::Between | Operator::NotBetween => {
            let (low, high) = range_bounds(op, value)?;
            let range = format!(
                "{p} >= {} AND {p} <= {}",
                render_literal(low)?,
                render_literal(high)?,
                p = property
            );
            if op == Operator::Between {
                Ok(range)
            } else {
                Ok(format!("NOT ({})", range))
            }
        }

        _ => Err(ScopeError::unsupported(format!("operator `{}`", op.token()))),
    }
}

fn expect_scalar(op: Operator, value: &Literal) -> Result<(), ScopeError> {
    match value {
        Literal::List(_) => Err(ScopeError::type_mismatch(op.token(), "a scalar value", "list")),
        Literal::Null => Err(ScopeError::type_mismatch(op.token(), "a non-null value", "null")),
        _ => Ok(()),
    }
}

fn range_bounds(op: Operator, value: &Literal) -> Result<(&Literal, &Literal), ScopeError> {
    let Literal::List(items) = value else {
        return Err(ScopeError::type_mismatch(
            op.token(),
            "a [low, high] list",
            value.kind().to_string(),
        ));
    };
    let [low, high] = items.as_slice() else {
        return Err(ScopeError::type_mismatch(
            op.token(),
            "a [low, high] list",
            format!("list of {} values", items.len()),
        ));
    };
    for bound in [low, high] {
        if !matches!(
            bound,
            Literal::Integer(_) | Literal::Float(_) | Literal::String(_)
        ) {
            return Err(ScopeError::type_mismatch(
                op.token(),
                "numeric or string bounds",
                bound.kind().to_string(),
            ));
        }
    }
    Ok((low, high))
}
