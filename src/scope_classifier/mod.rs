//! Scope classifier
//!
//! Turns a named scope source into a [`ScopeDescriptor`]. The specification
//! type is decided by these rules, first match wins:
//!
//! 1. a declarative source naming a library pattern -> `pattern`
//! 2. a source with at least one relationship operation (or a declarative
//!    relationship traversal) -> `relationship_traversal`
//! 3. anything else -> `property_filter`
//!
//! A declarative source that fits more than one shape, or whose explicit
//! `type` disagrees with the derived one, is rejected as ambiguous.
//!
//! Descriptors are cached per (entity, scope) together with a SHA-256 of the
//! canonical source: the entity label, the registry's relation maps, the scope
//! name and either the recorded calls or the declarative definition. A changed
//! hash always triggers a full recompile.

pub mod cache;
pub mod phrasing;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CompilerConfig;
use crate::errors::ScopeError;
use crate::filter_ir::{lower_records, lower_relationship_def, AliasAllocator, NodeRef, RelationshipSpec};
use crate::pattern_library::PatternLibrary;
use crate::query_emitter::QueryEmitter;
use crate::recorder::{CallRecord, CallRecorder, OperationKind};
use crate::source_model::{
    DeclarativeScope, EntityModel, ModelRegistry, PatternRef, RelationTarget, ScopeDefinition,
    ScopeSource,
};
pub use cache::{CacheMetrics, DescriptorCache, DescriptorCacheKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificationType {
    PropertyFilter,
    RelationshipTraversal,
    Pattern,
}

impl SpecificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecificationType::PropertyFilter => "property_filter",
            SpecificationType::RelationshipTraversal => "relationship_traversal",
            SpecificationType::Pattern => "pattern",
        }
    }
}

impl fmt::Display for SpecificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeDescriptor {
    pub name: String,
    pub entity: String,
    pub specification_type: SpecificationType,
    /// Predicate fragment for property filters, full statement otherwise.
    /// Empty for a pattern without a query template.
    pub query_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_spec: Option<RelationshipSpec>,
    /// Library pattern the scope was instantiated from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub examples: Vec<String>,
    pub concept: String,
    /// SHA-256 (hex) of the canonical source this was compiled from
    pub source_hash: String,
}

/// Per-scope record handed to prompt construction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeRecord {
    pub specification_type: SpecificationType,
    pub query_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_spec: Option<RelationshipSpec>,
    pub examples: Vec<String>,
    pub concept: String,
}

impl ScopeDescriptor {
    pub fn to_record(&self) -> ScopeRecord {
        ScopeRecord {
            specification_type: self.specification_type,
            query_text: self.query_text.clone(),
            relationship_spec: self.relationship_spec.clone(),
            examples: self.examples.clone(),
            concept: self.concept.clone(),
        }
    }
}

/// Source content after recording; closures are run once and hashed by their records
enum Captured<'a> {
    Recorded(Vec<CallRecord>),
    Declarative(&'a DeclarativeScope),
}

#[derive(Serialize)]
struct CanonicalSource<'a> {
    entity: &'a str,
    relations: BTreeMap<&'a str, &'a BTreeMap<String, RelationTarget>>,
    scope: &'a str,
    source: CanonicalContent<'a>,
}

#[derive(Serialize)]
#[serde(tag = "kind", content = "definition", rename_all = "snake_case")]
enum CanonicalContent<'a> {
    Recorded(&'a [CallRecord]),
    Declarative(&'a DeclarativeScope),
}

pub struct ScopeClassifier {
    config: CompilerConfig,
    library: Arc<PatternLibrary>,
    emitter: QueryEmitter,
    cache: DescriptorCache,
}

impl ScopeClassifier {
    pub fn new(config: CompilerConfig, library: Arc<PatternLibrary>) -> Self {
        ScopeClassifier {
            emitter: QueryEmitter::new(config.result_limit),
            cache: DescriptorCache::new(config.cache_enabled, config.cache_max_entries),
            config,
            library,
        }
    }

    /// Default configuration with the builtin pattern library
    pub fn with_defaults() -> Self {
        Self::new(
            CompilerConfig::default(),
            Arc::new(PatternLibrary::with_builtins()),
        )
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn cache(&self) -> &DescriptorCache {
        &self.cache
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Decide the specification type of a scope without compiling it
    pub fn classify(
        &self,
        entity: &EntityModel,
        scope: &ScopeDefinition,
    ) -> Result<SpecificationType, ScopeError> {
        match self.capture(scope)? {
            Captured::Recorded(records) => Ok(classify_records(&records)),
            Captured::Declarative(declared) => {
                let derived = classify_declarative(&scope.name, declared)?;
                check_declared_type(&entity.label, &scope.name, declared, derived)?;
                Ok(derived)
            }
        }
    }

    /// Compile one scope of a registered entity by label and scope name
    pub fn compile(
        &self,
        registry: &ModelRegistry,
        label: &str,
        scope_name: &str,
    ) -> Result<ScopeDescriptor, ScopeError> {
        let entity = registry
            .entity(label)
            .ok_or_else(|| ScopeError::UnknownEntity {
                label: label.to_string(),
            })?;
        let scope = entity
            .scope(scope_name)
            .ok_or_else(|| ScopeError::UnknownScope {
                entity: label.to_string(),
                scope: scope_name.to_string(),
            })?;
        self.compile_scope(registry, entity, scope)
    }

    /// Compile one scope, serving it from the cache when its source is unchanged
    pub fn compile_scope(
        &self,
        registry: &ModelRegistry,
        entity: &EntityModel,
        scope: &ScopeDefinition,
    ) -> Result<ScopeDescriptor, ScopeError> {
        let captured = self.capture(scope)?;
        let source_hash = content_hash(registry, entity, &scope.name, &captured)?;
        let key = DescriptorCacheKey::new(&entity.label, &scope.name);

        if let Some(descriptor) = self.cache.get(&key, &source_hash) {
            log::debug!("Descriptor cache hit for `{}.{}`", entity.label, scope.name);
            return Ok(descriptor);
        }
        log::debug!("Descriptor cache miss for `{}.{}`", entity.label, scope.name);

        let descriptor = self.build(registry, entity, &scope.name, captured, source_hash)?;
        self.cache.insert(key, descriptor.clone());
        Ok(descriptor)
    }

    /// Compile every scope of an entity, one result per scope in declaration order.
    ///
    /// A failing scope does not stop the others; skipping it is the caller's call.
    pub fn compile_entity(
        &self,
        registry: &ModelRegistry,
        entity: &EntityModel,
    ) -> Vec<(String, Result<ScopeDescriptor, ScopeError>)> {
        entity
            .scopes
            .iter()
            .map(|scope| (scope.name.clone(), self.compile_scope(registry, entity, scope)))
            .collect()
    }

    /// Compile every scope of every registered entity, keyed by entity label
    pub fn compile_all(
        &self,
        registry: &ModelRegistry,
    ) -> BTreeMap<String, Vec<(String, Result<ScopeDescriptor, ScopeError>)>> {
        registry
            .entities()
            .map(|entity| (entity.label.clone(), self.compile_entity(registry, entity)))
            .collect()
    }

    fn capture<'a>(&self, scope: &'a ScopeDefinition) -> Result<Captured<'a>, ScopeError> {
        match &scope.source {
            ScopeSource::Recorded(definition) => {
                let mut recorder = CallRecorder::new();
                definition(&mut recorder)?;
                Ok(Captured::Recorded(recorder.into_records()))
            }
            ScopeSource::Declarative(declared) => Ok(Captured::Declarative(declared)),
        }
    }

    fn build(
        &self,
        registry: &ModelRegistry,
        entity: &EntityModel,
        scope_name: &str,
        captured: Captured<'_>,
        source_hash: String,
    ) -> Result<ScopeDescriptor, ScopeError> {
        let mut concept_override = None;

        let compiled = match captured {
            Captured::Recorded(records) => self.compile_records(registry, entity, &records)?,
            Captured::Declarative(declared) => {
                let derived = classify_declarative(scope_name, declared)?;
                check_declared_type(&entity.label, scope_name, declared, derived)?;
                concept_override = declared.concept.clone();

                // At most one shape is present once classification succeeded
                match (&declared.pattern, &declared.relationship) {
                    (Some(pattern), _) => self.compile_pattern(entity, pattern)?,
                    (None, Some(def)) => {
                        let spec = lower_relationship_def(registry, entity, def)?;
                        Compiled {
                            specification_type: SpecificationType::RelationshipTraversal,
                            query_text: self.emitter.emit_statement(&spec)?,
                            relationship_spec: Some(spec),
                            pattern: None,
                        }
                    }
                    (None, None) => {
                        let mut recorder = CallRecorder::new();
                        for call in &declared.calls {
                            recorder.apply(call)?;
                        }
                        self.compile_records(registry, entity, recorder.records())?
                    }
                }
            }
        };

        log::debug!(
            "Classified `{}.{}` as {}",
            entity.label,
            scope_name,
            compiled.specification_type
        );

        let concept = match concept_override {
            Some(text) => text,
            None => phrasing::concept(
                scope_name,
                &entity.label,
                compiled.specification_type,
                compiled.pattern.as_ref().map(|(_, description)| description.as_str()),
            ),
        };

        Ok(ScopeDescriptor {
            name: scope_name.to_string(),
            entity: entity.label.clone(),
            specification_type: compiled.specification_type,
            query_text: compiled.query_text,
            relationship_spec: compiled.relationship_spec,
            pattern: compiled.pattern.map(|(name, _)| name),
            examples: phrasing::example_phrases(
                scope_name,
                &entity.label,
                self.config.example_phrase_count,
            ),
            concept,
            source_hash,
        })
    }

    fn compile_records(
        &self,
        registry: &ModelRegistry,
        entity: &EntityModel,
        records: &[CallRecord],
    ) -> Result<Compiled, ScopeError> {
        let lowered = lower_records(registry, entity, records)?;
        if lowered.has_relationships() {
            Ok(Compiled {
                specification_type: SpecificationType::RelationshipTraversal,
                query_text: self.emitter.emit_statement(&lowered.spec)?,
                relationship_spec: Some(lowered.spec),
                pattern: None,
            })
        } else {
            Ok(Compiled {
                specification_type: SpecificationType::PropertyFilter,
                query_text: self.emitter.emit_fragment(&lowered.spec.filter)?,
                relationship_spec: None,
                pattern: None,
            })
        }
    }

    fn compile_pattern(
        &self,
        entity: &EntityModel,
        pattern: &PatternRef,
    ) -> Result<Compiled, ScopeError> {
        let start = NodeRef::new(AliasAllocator::new().allocate(&entity.label), entity.label.clone());
        let instance = self
            .library
            .instantiate(&pattern.name, pattern.params.clone())?
            .bind_start(start);

        Ok(Compiled {
            specification_type: SpecificationType::Pattern,
            query_text: self.emitter.emit_pattern(&instance)?.unwrap_or_default(),
            relationship_spec: None,
            pattern: Some((pattern.name.clone(), instance.description().to_string())),
        })
    }
}

/// Output of compiling one source, before phrasing
struct Compiled {
    specification_type: SpecificationType,
    query_text: String,
    relationship_spec: Option<RelationshipSpec>,
    /// (pattern name, rendered description)
    pattern: Option<(String, String)>,
}

fn classify_records(records: &[CallRecord]) -> SpecificationType {
    if records.iter().any(CallRecord::is_relationship) {
        SpecificationType::RelationshipTraversal
    } else {
        SpecificationType::PropertyFilter
    }
}

/// Derive the type of a declarative source, rejecting sources with more than one shape
fn classify_declarative(
    scope_name: &str,
    declared: &DeclarativeScope,
) -> Result<SpecificationType, ScopeError> {
    let mut shapes = Vec::new();
    if declared.pattern.is_some() {
        shapes.push("pattern");
    }
    if declared.relationship.is_some() {
        shapes.push("relationship");
    }
    if !declared.calls.is_empty() {
        shapes.push("calls");
    }
    if shapes.len() > 1 {
        return Err(ScopeError::ambiguous_with_context(
            scope_name,
            format!("declares {}", shapes.join(" and ")),
        ));
    }

    if declared.pattern.is_some() {
        return Ok(SpecificationType::Pattern);
    }
    if declared.relationship.is_some() {
        return Ok(SpecificationType::RelationshipTraversal);
    }

    // Unparseable names are reported when the calls are replayed
    let has_relationship = declared.calls.iter().any(|call| {
        OperationKind::parse_call_name(&call.op)
            .map(|(_, kind)| kind.is_relationship())
            .unwrap_or(false)
    });
    if has_relationship {
        Ok(SpecificationType::RelationshipTraversal)
    } else {
        Ok(SpecificationType::PropertyFilter)
    }
}

fn check_declared_type(
    entity: &str,
    scope_name: &str,
    declared: &DeclarativeScope,
    derived: SpecificationType,
) -> Result<(), ScopeError> {
    match declared.specification_type {
        Some(explicit) if explicit != derived => {
            log::warn!(
                "Scope `{}.{}` declares type {} but its definition is a {}",
                entity,
                scope_name,
                explicit,
                derived
            );
            Err(ScopeError::ambiguous_with_context(
                scope_name,
                format!("declared as {} but defined as {}", explicit, derived),
            ))
        }
        _ => Ok(()),
    }
}

fn content_hash(
    registry: &ModelRegistry,
    entity: &EntityModel,
    scope_name: &str,
    captured: &Captured<'_>,
) -> Result<String, ScopeError> {
    // Registered relations plus the scope entity's own, which may not be registered
    let mut relations = registry.relation_maps();
    relations.insert(entity.label.as_str(), &entity.relations);

    let canonical = CanonicalSource {
        entity: &entity.label,
        relations,
        scope: scope_name,
        source: match captured {
            Captured::Recorded(records) => CanonicalContent::Recorded(records),
            Captured::Declarative(declared) => CanonicalContent::Declarative(declared),
        },
    };
    let bytes = serde_json::to_vec(&canonical)
        .map_err(|e| ScopeError::Serialization {
            message: format!("scope `{}`: {}", scope_name, e),
        })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
