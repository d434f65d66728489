//! Graph pattern rendering for relationship hops

use crate::errors::ScopeError;
use crate::filter_ir::{Direction, NodeRef, RelationshipStep};
use crate::sanitizer::sanitize_identifier;
use crate::utils::inflect;

/// Derive a relationship type from a relation name when no override is given.
///
/// The last word is singularized and the result upper-snake-cased behind a
/// `HAS_` prefix:
/// - `roles` -> `HAS_ROLE`
/// - `teamMemberships` -> `HAS_TEAM_MEMBERSHIP`
/// - `people` -> `HAS_PERSON`
pub fn derive_relationship_type(relation: &str) -> String {
    let singular = inflect::singularize(&inflect::humanize(relation));
    format!("HAS_{}", inflect::upper_snake(&singular))
}

/// `(alias:Label)`
pub fn render_node(node: &NodeRef) -> Result<String, ScopeError> {
    Ok(format!(
        "({}:{})",
        sanitize_identifier(&node.alias)?,
        sanitize_identifier(&node.label)?
    ))
}

/// `-[:TYPE]->(alias:Label)` or `<-[:TYPE]-(alias:Label)`
pub fn render_hop(step: &RelationshipStep) -> Result<String, ScopeError> {
    let rel_type = sanitize_identifier(&step.relationship)?;
    let target = render_node(&step.target)?;
    Ok(match step.direction {
        Direction::Outgoing => format!("-[:{}]->{}", rel_type, target),
        Direction::Incoming => format!("<-[:{}]-{}", rel_type, target),
    })
}

/// Full path from a rendered head node through every step
pub fn render_path(head: &str, steps: &[RelationshipStep]) -> Result<String, ScopeError> {
    let mut path = head.to_string();
    for step in steps {
        path.push_str(&render_hop(step)?);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter_ir::FilterExpr;
    use test_case::test_case;

    #[test_case("roles", "HAS_ROLE")]
    #[test_case("teamMemberships", "HAS_TEAM_MEMBERSHIP")]
    #[test_case("donation_history", "HAS_DONATION_HISTORY")]
    #[test_case("people", "HAS_PERSON")]
    #[test_case("addresses", "HAS_ADDRESS")]
    #[test_case("Role", "HAS_ROLE")]
    fn test_derive_relationship_type(relation: &str, expected: &str) {
        assert_eq!(derive_relationship_type(relation), expected);
    }

    fn step(direction: Direction) -> RelationshipStep {
        RelationshipStep {
            relationship: "HAS_ROLE".to_string(),
            target: NodeRef::new("pt", "PersonTeam"),
            direction,
            conditions: FilterExpr::new(),
        }
    }

    #[test]
    fn test_render_path() {
        let head = render_node(&NodeRef::new("p", "Person")).unwrap();
        assert_eq!(
            render_path(&head, &[step(Direction::Outgoing)]).unwrap(),
            "(p:Person)-[:HAS_ROLE]->(pt:PersonTeam)"
        );
        assert_eq!(
            render_path("(p)", &[step(Direction::Incoming)]).unwrap(),
            "(p)<-[:HAS_ROLE]-(pt:PersonTeam)"
        );
    }

    #[test]
    fn test_render_rejects_unsafe_label() {
        let err = render_node(&NodeRef::new("p", "Person}); DELETE (n) //")).unwrap_err();
        assert!(err.is_injection_risk());
    }
}
