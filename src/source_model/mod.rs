//! Source model registry
//!
//! The compiler does not discover scopes from a live data model. The model
//! layer hands over an explicit manifest instead: for each entity its primary
//! label, a relation-name -> target map, and its named scope sources.
//!
//! Scope sources are either closures run against a [`CallRecorder`]
//! ([`ScopeSource::Recorded`]) or data ([`ScopeSource::Declarative`]). Only the
//! latter can be loaded from YAML:
//!
//! ```yaml
//! entities:
//!   - label: Person
//!     relations:
//!       roles: { label: PersonTeam, type: HAS_ROLE }
//!       team: Team
//!     scopes:
//!       - name: active
//!         calls:
//!           - { op: where, column: status, value: active }
//!       - name: engaged
//!         pattern:
//!           name: has_relationship
//!           params: { rel_type: HAS_ROLE, target: PersonTeam }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::ScopeError;
use crate::filter_ir::{Direction, Literal};
use crate::query_emitter::derive_relationship_type;
use crate::recorder::{CallDef, CallRecorder};
use crate::scope_classifier::SpecificationType;

/// Where a relation of an entity leads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RelationTargetDef")]
pub struct RelationTarget {
    pub label: String,
    /// Explicit relationship type; derived from the relation name when absent
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    pub direction: Direction,
}

impl RelationTarget {
    pub fn new(label: impl Into<String>) -> Self {
        RelationTarget {
            label: label.into(),
            rel_type: None,
            direction: Direction::Outgoing,
        }
    }

    pub fn with_type(mut self, rel_type: impl Into<String>) -> Self {
        self.rel_type = Some(rel_type.into());
        self
    }

    pub fn incoming(mut self) -> Self {
        self.direction = Direction::Incoming;
        self
    }
}

/// Manifest form: either a bare target label or a full mapping
#[derive(Deserialize)]
#[serde(untagged)]
enum RelationTargetDef {
    Label(String),
    Full {
        label: String,
        #[serde(default, rename = "type")]
        rel_type: Option<String>,
        #[serde(default)]
        direction: Direction,
    },
}

impl From<RelationTargetDef> for RelationTarget {
    fn from(def: RelationTargetDef) -> Self {
        match def {
            RelationTargetDef::Label(label) => RelationTarget::new(label),
            RelationTargetDef::Full {
                label,
                rel_type,
                direction,
            } => RelationTarget {
                label,
                rel_type,
                direction,
            },
        }
    }
}

/// A relation resolved to the relationship type and target it emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelation {
    pub rel_type: String,
    pub label: String,
    pub direction: Direction,
}

/// Reference to a library pattern with bound parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternRef {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, Literal>,
}

/// One hop of a declarative relationship scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDef {
    /// Relation name looked up in the relation map of the node the hop starts from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    /// Explicit relationship type, required when `relation` is absent
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    /// Explicit target label, required when `relation` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Conditions on this hop's target
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<CallDef>,
}

/// Declarative traversal: start entity -> steps -> terminal filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipDef {
    pub steps: Vec<StepDef>,
    /// Conditions on the start entity
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub start_filters: Vec<CallDef>,
    /// Conditions on the final target of the path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<CallDef>,
}

/// Scope given as data rather than code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarativeScope {
    /// Explicitly declared classification; must agree with the derived one
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub specification_type: Option<SpecificationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<RelationshipDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallDef>,
    /// Overrides the generated concept text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
}

pub type RecordedDefinition =
    Arc<dyn Fn(&mut CallRecorder) -> Result<(), ScopeError> + Send + Sync>;

#[derive(Clone)]
pub enum ScopeSource {
    Recorded(RecordedDefinition),
    Declarative(DeclarativeScope),
}

impl fmt::Debug for ScopeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeSource::Recorded(_) => f.write_str("Recorded(<definition>)"),
            ScopeSource::Declarative(scope) => f.debug_tuple("Declarative").field(scope).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScopeDefinition {
    pub name: String,
    pub source: ScopeSource,
}

impl ScopeDefinition {
    pub fn recorded<F>(name: impl Into<String>, definition: F) -> Self
    where
        F: Fn(&mut CallRecorder) -> Result<(), ScopeError> + Send + Sync + 'static,
    {
        ScopeDefinition {
            name: name.into(),
            source: ScopeSource::Recorded(Arc::new(definition)),
        }
    }

    pub fn declarative(name: impl Into<String>, scope: DeclarativeScope) -> Self {
        ScopeDefinition {
            name: name.into(),
            source: ScopeSource::Declarative(scope),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntityModel {
    pub label: String,
    pub relations: BTreeMap<String, RelationTarget>,
    pub scopes: Vec<ScopeDefinition>,
}

impl EntityModel {
    pub fn new(label: impl Into<String>) -> Self {
        EntityModel {
            label: label.into(),
            relations: BTreeMap::new(),
            scopes: Vec::new(),
        }
    }

    pub fn with_relation(mut self, name: impl Into<String>, target: RelationTarget) -> Self {
        self.relations.insert(name.into(), target);
        self
    }

    pub fn with_recorded_scope<F>(mut self, name: impl Into<String>, definition: F) -> Self
    where
        F: Fn(&mut CallRecorder) -> Result<(), ScopeError> + Send + Sync + 'static,
    {
        self.scopes.push(ScopeDefinition::recorded(name, definition));
        self
    }

    pub fn with_declarative_scope(mut self, name: impl Into<String>, scope: DeclarativeScope) -> Self {
        self.scopes.push(ScopeDefinition::declarative(name, scope));
        self
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeDefinition> {
        self.scopes.iter().find(|s| s.name == name)
    }

    /// Resolve a relation name to its relationship type, target label and direction
    pub fn resolve_relation(&self, relation: &str) -> Result<ResolvedRelation, ScopeError> {
        let target = self
            .relations
            .get(relation)
            .ok_or_else(|| ScopeError::UnknownRelation {
                entity: self.label.clone(),
                relation: relation.to_string(),
            })?;

        Ok(ResolvedRelation {
            rel_type: target
                .rel_type
                .clone()
                .unwrap_or_else(|| derive_relationship_type(relation)),
            label: target.label.clone(),
            direction: target.direction,
        })
    }
}

/// All entities known to the compiler, keyed by label
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entities: BTreeMap<String, EntityModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: EntityModel) -> Self {
        self.register(entity);
        self
    }

    /// Register an entity, replacing any previous entity with the same label
    pub fn register(&mut self, entity: EntityModel) {
        if self.entities.contains_key(&entity.label) {
            log::warn!("Replacing entity `{}` in model registry", entity.label);
        }
        self.entities.insert(entity.label.clone(), entity);
    }

    pub fn entity(&self, label: &str) -> Option<&EntityModel> {
        self.entities.get(label)
    }

    pub fn entity_mut(&mut self, label: &str) -> Option<&mut EntityModel> {
        self.entities.get_mut(label)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityModel> {
        self.entities.values()
    }

    /// Relation maps of every entity, the part of the registry that affects
    /// how relation names resolve
    pub fn relation_maps(&self) -> BTreeMap<&str, &BTreeMap<String, RelationTarget>> {
        self.entities
            .iter()
            .map(|(label, entity)| (label.as_str(), &entity.relations))
            .collect()
    }

    /// Load entities with declarative scopes from a YAML manifest
    pub fn from_yaml_str(content: &str) -> Result<Self, ScopeError> {
        let manifest: ModelManifest =
            serde_yaml::from_str(content).map_err(|e| ScopeError::ManifestParse {
                message: e.to_string(),
            })?;

        let mut registry = ModelRegistry::new();
        for entity in manifest.entities {
            let mut model = EntityModel::new(entity.label);
            model.relations = entity.relations;
            for scope in entity.scopes {
                if model.scope(&scope.name).is_some() {
                    return Err(ScopeError::ManifestParse {
                        message: format!(
                            "entity `{}` declares scope `{}` twice",
                            model.label, scope.name
                        ),
                    });
                }
                model.scopes.push(ScopeDefinition::declarative(scope.name, scope.scope));
            }
            registry.register(model);
        }
        log::debug!("Loaded {} entities from manifest", registry.entities.len());
        Ok(registry)
    }

    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ScopeError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ScopeError::ManifestParse {
            message: format!("failed to read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_yaml_str(&content)
    }
}

#[derive(Deserialize)]
struct ModelManifest {
    entities: Vec<EntityManifest>,
}

#[derive(Deserialize)]
struct EntityManifest {
    label: String,
    #[serde(default)]
    relations: BTreeMap<String, RelationTarget>,
    #[serde(default)]
    scopes: Vec<ScopeManifest>,
}

#[derive(Deserialize)]
struct ScopeManifest {
    name: String,
    #[serde(flatten)]
    scope: DeclarativeScope,
}
