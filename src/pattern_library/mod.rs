//! Pattern library
//!
//! Named, parameterized templates for recurring scope shapes (relationship
//! existence and absence, count thresholds, temporal windows, multi-hop
//! traversal, combined property + relationship filters).
//!
//! The library is assembled once through [`PatternLibraryBuilder`] and is
//! read-only afterwards; share it behind an `Arc`.
//!
//! ```yaml
//! patterns:
//!   - name: donated_to
//!     description: "Donated to {campaign}"
//!     query: "MATCH ({alias}:{entity})-[:DONATED_TO]->(c:Campaign) WHERE c.name = {campaign} RETURN DISTINCT {alias}"
//!     params:
//!       - { name: campaign, kind: string }
//! ```

pub mod builtin;
pub mod template;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::ScopeError;
use crate::filter_ir::{Literal, NodeRef};
use crate::sanitizer::validate_identifier;
use template::{ALIAS_PLACEHOLDER, ENTITY_PLACEHOLDER};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Kind a pattern parameter value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Property key, substituted as a sanitized identifier
    Identifier,
    /// Node label or relationship type, substituted as a sanitized identifier
    Label,
    String,
    Integer,
    /// Integer or float
    Number,
    Boolean,
    /// ISO `YYYY-MM-DD` string
    Date,
    /// Any string, number or boolean
    Scalar,
}

impl ParamKind {
    pub fn accepts(&self, value: &Literal) -> bool {
        match self {
            ParamKind::Identifier | ParamKind::Label | ParamKind::String => {
                matches!(value, Literal::String(_))
            }
            ParamKind::Integer => matches!(value, Literal::Integer(_)),
            ParamKind::Number => matches!(value, Literal::Integer(_) | Literal::Float(_)),
            ParamKind::Boolean => matches!(value, Literal::Boolean(_)),
            ParamKind::Date => value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok()),
            ParamKind::Scalar => matches!(
                value,
                Literal::String(_) | Literal::Integer(_) | Literal::Float(_) | Literal::Boolean(_)
            ),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Identifier => "identifier",
            ParamKind::Label => "label",
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Date => "date",
            ParamKind::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        ParamSpec {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub name: String,
    /// Required parameters, checked in this order
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(rename = "description")]
    pub description_template: String,
    #[serde(default, rename = "query", skip_serializing_if = "Option::is_none")]
    pub query_template: Option<String>,
}

impl PatternDefinition {
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParamSpec>,
        description_template: impl Into<String>,
    ) -> Self {
        PatternDefinition {
            name: name.into(),
            params,
            description_template: description_template.into(),
            query_template: None,
        }
    }

    pub fn with_query(mut self, query_template: impl Into<String>) -> Self {
        self.query_template = Some(query_template.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Check names and that every placeholder is bound by a declared parameter
    pub fn validate(&self) -> Result<(), ScopeError> {
        validate_identifier(&self.name)
            .map_err(|e| ScopeError::invalid_pattern(&self.name, e.to_string()))?;

        for (i, param) in self.params.iter().enumerate() {
            validate_identifier(&param.name)
                .map_err(|e| ScopeError::invalid_pattern(&self.name, e.to_string()))?;
            if param.name == ENTITY_PLACEHOLDER || param.name == ALIAS_PLACEHOLDER {
                return Err(ScopeError::invalid_pattern(
                    &self.name,
                    format!("parameter name `{}` is reserved", param.name),
                ));
            }
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(ScopeError::invalid_pattern(
                    &self.name,
                    format!("parameter `{}` is declared twice", param.name),
                ));
            }
        }

        for name in template::placeholders(&self.description_template) {
            if self.param(name).is_none() {
                return Err(ScopeError::invalid_pattern(
                    &self.name,
                    format!("description references undeclared parameter `{}`", name),
                ));
            }
        }
        if let Some(query) = &self.query_template {
            for name in template::placeholders(query) {
                let implicit = name == ENTITY_PLACEHOLDER || name == ALIAS_PLACEHOLDER;
                if !implicit && self.param(name).is_none() {
                    return Err(ScopeError::invalid_pattern(
                        &self.name,
                        format!("query references undeclared parameter `{}`", name),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A pattern with its parameters bound and checked
#[derive(Debug, Clone, PartialEq)]
pub struct PatternInstance {
    definition: Arc<PatternDefinition>,
    params: BTreeMap<String, Literal>,
    description: String,
    start: Option<NodeRef>,
}

impl PatternInstance {
    /// Bind `params` to `definition`.
    ///
    /// Parameters are checked in declaration order; the first one that is
    /// absent or of the wrong kind is named in the error.
    pub fn new(
        definition: Arc<PatternDefinition>,
        params: BTreeMap<String, Literal>,
    ) -> Result<Self, ScopeError> {
        for spec in &definition.params {
            let bound = params.get(&spec.name).filter(|v| spec.kind.accepts(v));
            if bound.is_none() {
                return Err(ScopeError::MissingParameter {
                    pattern: definition.name.clone(),
                    parameter: spec.name.clone(),
                });
            }
            if matches!(spec.kind, ParamKind::Identifier | ParamKind::Label) {
                if let Some(Literal::String(text)) = bound {
                    validate_identifier(text)?;
                }
            }
        }
        if let Some(extra) = params.keys().find(|k| definition.param(k).is_none()) {
            return Err(ScopeError::UnexpectedParameter {
                pattern: definition.name.clone(),
                parameter: extra.clone(),
            });
        }

        let description = template::render_description(&definition.description_template, &params);
        Ok(PatternInstance {
            definition,
            params,
            description,
            start: None,
        })
    }

    /// Bind the `{entity}` and `{alias}` placeholders of the query template
    pub fn bind_start(mut self, start: NodeRef) -> Self {
        self.start = Some(start);
        self
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &PatternDefinition {
        &self.definition
    }

    pub fn params(&self) -> &BTreeMap<String, Literal> {
        &self.params
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start(&self) -> Option<&NodeRef> {
        self.start.as_ref()
    }

    /// Query template with every placeholder substituted, if the pattern has one
    pub fn render_query(&self) -> Result<Option<String>, ScopeError> {
        let Some(query) = &self.definition.query_template else {
            return Ok(None);
        };

        let entity = self.start.as_ref().map(|s| Literal::String(s.label.clone()));
        let alias = self.start.as_ref().map(|s| Literal::String(s.alias.clone()));

        let rendered = template::render_query(query, |name| {
            let implicit = match name {
                ENTITY_PLACEHOLDER => Some(&entity),
                ALIAS_PLACEHOLDER => Some(&alias),
                _ => None,
            };
            if let Some(bound) = implicit {
                return bound
                    .as_ref()
                    .map(|value| (ParamKind::Label, value))
                    .ok_or_else(|| ScopeError::MissingParameter {
                        pattern: self.definition.name.clone(),
                        parameter: name.to_string(),
                    });
            }
            match (self.definition.param(name), self.params.get(name)) {
                (Some(spec), Some(value)) => Ok((spec.kind, value)),
                _ => Err(ScopeError::MissingParameter {
                    pattern: self.definition.name.clone(),
                    parameter: name.to_string(),
                }),
            }
        })?;
        Ok(Some(rendered))
    }
}

/// Read-only registry of pattern definitions
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    patterns: BTreeMap<String, Arc<PatternDefinition>>,
}

impl PatternLibrary {
    /// Builder preloaded with the builtin patterns
    pub fn builder() -> PatternLibraryBuilder {
        let mut builder = PatternLibraryBuilder::empty();
        for definition in builtin::BUILTIN_PATTERNS.iter() {
            builder
                .patterns
                .insert(definition.name.clone(), Arc::new(definition.clone()));
        }
        builder
    }

    /// Library holding only the builtin patterns
    pub fn with_builtins() -> Self {
        Self::builder().build()
    }

    pub fn get(&self, name: &str) -> Option<&PatternDefinition> {
        self.patterns.get(name).map(|p| p.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn instantiate(
        &self,
        name: &str,
        params: BTreeMap<String, Literal>,
    ) -> Result<PatternInstance, ScopeError> {
        let definition = self
            .patterns
            .get(name)
            .ok_or_else(|| ScopeError::UnknownPattern {
                name: name.to_string(),
            })?;
        let instance = PatternInstance::new(Arc::clone(definition), params)?;
        log::debug!("Instantiated pattern `{}`: {}", name, instance.description());
        Ok(instance)
    }
}

#[derive(Debug, Default)]
pub struct PatternLibraryBuilder {
    patterns: BTreeMap<String, Arc<PatternDefinition>>,
}

#[derive(Deserialize)]
struct PatternManifest {
    patterns: Vec<PatternDefinition>,
}

impl PatternLibraryBuilder {
    /// Builder without the builtin patterns
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: PatternDefinition) -> Result<&mut Self, ScopeError> {
        definition.validate()?;
        if self.patterns.contains_key(&definition.name) {
            return Err(ScopeError::DuplicatePattern {
                name: definition.name,
            });
        }
        self.patterns
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(self)
    }

    /// Register every pattern from a YAML `patterns:` list
    pub fn load_yaml_str(&mut self, content: &str) -> Result<&mut Self, ScopeError> {
        let manifest: PatternManifest =
            serde_yaml::from_str(content).map_err(|e| ScopeError::ManifestParse {
                message: e.to_string(),
            })?;
        for definition in manifest.patterns {
            self.register(definition)?;
        }
        Ok(self)
    }

    pub fn build(self) -> PatternLibrary {
        log::debug!("Pattern library built with {} patterns", self.patterns.len());
        PatternLibrary {
            patterns: self.patterns,
        }
    }
}
