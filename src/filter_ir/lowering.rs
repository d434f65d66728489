//! Lowering of recorded calls into the filter IR
//!
//! Walks a record list in call order:
//! - condition calls become predicates on the start node
//! - an `and` relationship call extends the MATCH path from its current tail,
//!   its nested conditions scoped to the new target and placed (as a
//!   [`Predicate::Hop`]) at the position of the call
//! - an `or` relationship call, or any absence check, becomes an
//!   `[NOT] EXISTS` predicate anchored on the start node, adding no fan-out
//!
//! Dotted relation names (`roles.team`) expand to one hop per segment, each
//! segment resolved against the relation map of the node it starts from.

use std::collections::HashSet;

use super::{
    Condition, Conjunction, FilterExpr, NodeRef, Predicate, RelationshipSpec, RelationshipStep,
};
use crate::errors::ScopeError;
use crate::recorder::{
    CallDef, CallRecord, ChildRecord, ConditionCall, ConditionRecorder, Operation, RelationshipCall,
};
use crate::source_model::{EntityModel, ModelRegistry, RelationshipDef, ResolvedRelation};
use crate::utils::inflect;

/// Hands out unique node aliases derived from label initials
#[derive(Debug, Default)]
pub struct AliasAllocator {
    used: HashSet<String>,
}

impl AliasAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Person` -> `p`, `PersonTeam` -> `pt`; repeats become `p2`, `p3`, ...
    pub fn allocate(&mut self, label: &str) -> String {
        let mut base = inflect::initials(label);
        if base.is_empty() || !base.starts_with(|c: char| c.is_ascii_alphabetic()) {
            base = format!("n{}", base);
        }

        let mut alias = base.clone();
        let mut n = 2;
        while self.used.contains(&alias) || crate::sanitizer::is_reserved_keyword(&alias) {
            alias = format!("{}{}", base, n);
            n += 1;
        }
        self.used.insert(alias.clone());
        alias
    }
}

/// Result of lowering a recorded scope
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredScope {
    pub spec: RelationshipSpec,
    /// Number of relationship calls seen, positive or negated
    pub relationship_operations: usize,
}

impl LoweredScope {
    pub fn has_relationships(&self) -> bool {
        self.relationship_operations > 0
    }
}

struct Lowering<'a> {
    registry: &'a ModelRegistry,
    entity: &'a EntityModel,
    aliases: AliasAllocator,
    start: NodeRef,
    steps: Vec<RelationshipStep>,
    filter: FilterExpr,
    /// Positive hops join the MATCH path only when every top-level term is
    /// `and`-joined
    match_path: bool,
}

/// Lower a recorded call sequence for `entity` into a [`RelationshipSpec`]
pub fn lower_records(
    registry: &ModelRegistry,
    entity: &EntityModel,
    records: &[CallRecord],
) -> Result<LoweredScope, ScopeError> {
    let mut aliases = AliasAllocator::new();
    let start = NodeRef::new(aliases.allocate(&entity.label), entity.label.clone());

    let mut lowering = Lowering {
        registry,
        entity,
        aliases,
        start,
        steps: Vec::new(),
        filter: FilterExpr::new(),
        // The first record's conjunction joins nothing
        match_path: records
            .iter()
            .skip(1)
            .all(|r| r.conjunction == Conjunction::And),
    };

    let mut relationship_operations = 0;
    for record in records {
        match &record.operation {
            Operation::Condition(call) => {
                let predicate = lower_condition(&lowering.start.alias, call);
                lowering.filter.push(record.conjunction, predicate);
            }
            Operation::Relationship(call) => {
                relationship_operations += 1;
                lowering.relationship(record.conjunction, call)?;
            }
        }
    }

    log::trace!(
        "Lowered {} records for `{}` into {} hops",
        records.len(),
        entity.label,
        lowering.steps.len()
    );

    Ok(LoweredScope {
        spec: RelationshipSpec::new(lowering.start, lowering.steps, lowering.filter),
        relationship_operations,
    })
}

/// Lower one condition call against `alias`
pub fn lower_condition(alias: &str, call: &ConditionCall) -> Predicate {
    match call {
        ConditionCall::Compare {
            column,
            operator,
            value,
            ..
        } => Predicate::Condition(Condition::new(alias, column.clone(), *operator, value.clone())),
        ConditionCall::Column {
            left,
            operator,
            right,
        } => Predicate::ColumnComparison {
            alias: alias.to_string(),
            left: left.clone(),
            operator: *operator,
            right: right.clone(),
        },
    }
}

/// Lower a nested pass against the target alias of its hop
pub fn lower_children(alias: &str, children: &[ChildRecord]) -> FilterExpr {
    let mut expr = FilterExpr::new();
    for child in children {
        expr.push(child.conjunction, lower_condition(alias, &child.call));
    }
    expr
}

impl Lowering<'_> {
    fn relationship(
        &mut self,
        conjunction: Conjunction,
        call: &RelationshipCall,
    ) -> Result<(), ScopeError> {
        let in_match_path = !call.negated && self.match_path;

        let from = if in_match_path {
            self.steps
                .last()
                .map(|s| s.target.clone())
                .unwrap_or_else(|| self.start.clone())
        } else {
            self.start.clone()
        };

        let mut steps = self.build_path(&from, &call.relation)?;
        if let Some(last) = steps.last_mut() {
            last.conditions = lower_children(&last.target.alias, &call.children);
        }

        if in_match_path {
            let has_conditions = steps.last().is_some_and(|s| !s.conditions.is_empty());
            self.steps.extend(steps);
            if has_conditions {
                self.filter
                    .push(conjunction, Predicate::Hop(self.steps.len() - 1));
            }
        } else {
            self.filter.push(
                conjunction,
                Predicate::Exists {
                    negated: call.negated,
                    anchor: self.start.alias.clone(),
                    steps,
                },
            );
        }
        Ok(())
    }

    fn build_path(
        &mut self,
        from: &NodeRef,
        relation: &str,
    ) -> Result<Vec<RelationshipStep>, ScopeError> {
        let mut current = from.clone();
        let mut steps = Vec::new();

        for segment in relation.split('.') {
            let resolved = self.resolve(&current.label, segment)?;
            let target = NodeRef::new(self.aliases.allocate(&resolved.label), resolved.label);
            steps.push(RelationshipStep {
                relationship: resolved.rel_type,
                target: target.clone(),
                direction: resolved.direction,
                conditions: FilterExpr::new(),
            });
            current = target;
        }
        Ok(steps)
    }

    fn resolve(&self, label: &str, relation: &str) -> Result<ResolvedRelation, ScopeError> {
        resolve_relation(self.registry, self.entity, label, relation)
    }
}

/// Resolve against the entity the hop starts from, falling back to the
/// scope's own entity when that label is not registered
fn resolve_relation(
    registry: &ModelRegistry,
    entity: &EntityModel,
    label: &str,
    relation: &str,
) -> Result<ResolvedRelation, ScopeError> {
    if let Some(model) = registry
        .entity(label)
        .filter(|m| m.relations.contains_key(relation))
    {
        return model.resolve_relation(relation);
    }
    if label == entity.label || entity.relations.contains_key(relation) {
        return entity.resolve_relation(relation);
    }
    Err(ScopeError::UnknownRelation {
        entity: label.to_string(),
        relation: relation.to_string(),
    })
}

/// Lower a declarative traversal for `entity` into a [`RelationshipSpec`].
///
/// Each step names a relation (resolved like a recorded `whereHas`) or gives
/// an explicit relationship type and target label; explicit values override
/// what the relation resolves to. Start filters come first in the WHERE
/// clause, followed by each hop's conditions in path order. Terminal
/// `filters` join the conditions of the last hop.
pub fn lower_relationship_def(
    registry: &ModelRegistry,
    entity: &EntityModel,
    def: &RelationshipDef,
) -> Result<RelationshipSpec, ScopeError> {
    if def.steps.is_empty() {
        return Err(ScopeError::ManifestParse {
            message: format!("relationship scope on `{}` declares no steps", entity.label),
        });
    }

    let mut aliases = AliasAllocator::new();
    let start = NodeRef::new(aliases.allocate(&entity.label), entity.label.clone());
    let mut filter = lower_children(&start.alias, &replay_conditions(&entity.label, &def.start_filters)?);

    let mut steps: Vec<RelationshipStep> = Vec::with_capacity(def.steps.len());
    for (i, step) in def.steps.iter().enumerate() {
        let from = steps.last().map(|s| &s.target).unwrap_or(&start);
        let resolved = match &step.relation {
            Some(relation) => Some(resolve_relation(registry, entity, &from.label, relation)?),
            None => None,
        };

        let rel_type = step
            .rel_type
            .clone()
            .or_else(|| resolved.as_ref().map(|r| r.rel_type.clone()));
        let label = step
            .target
            .clone()
            .or_else(|| resolved.as_ref().map(|r| r.label.clone()));
        let (Some(rel_type), Some(label)) = (rel_type, label) else {
            return Err(ScopeError::ManifestParse {
                message: format!(
                    "step {} of relationship scope on `{}` needs `relation` or both `type` and `target`",
                    i + 1,
                    entity.label
                ),
            });
        };
        let direction = step
            .direction
            .or_else(|| resolved.as_ref().map(|r| r.direction))
            .unwrap_or_default();

        let target = NodeRef::new(aliases.allocate(&label), label);
        let mut call_defs: Vec<&CallDef> = step.conditions.iter().collect();
        if i + 1 == def.steps.len() {
            call_defs.extend(def.filters.iter());
        }
        let children = replay_conditions(&rel_type, call_defs)?;

        steps.push(RelationshipStep {
            relationship: rel_type,
            conditions: lower_children(&target.alias, &children),
            target,
            direction,
        });
    }

    for (i, step) in steps.iter().enumerate() {
        if !step.conditions.is_empty() {
            filter.push(Conjunction::And, Predicate::Hop(i));
        }
    }

    Ok(RelationshipSpec::new(start, steps, filter))
}

/// Record condition-only calls; a relationship call here is nested too deep
fn replay_conditions<'a, I>(context: &str, defs: I) -> Result<Vec<ChildRecord>, ScopeError>
where
    I: IntoIterator<Item = &'a CallDef>,
{
    let mut recorder = ConditionRecorder::new(context);
    for def in defs {
        recorder.apply(def)?;
    }
    Ok(recorder.into_records())
}
