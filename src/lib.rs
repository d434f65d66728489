//! Scopegraph - compiles entity scopes into Cypher filters
//!
//! A scope is a named, reusable filter attached to an entity. This crate turns
//! scope definitions into safe query text through:
//! - Recording query-builder style calls without executing them
//! - A filter IR separating property filters from relationship traversals
//! - A library of parameterized query patterns
//! - Injection-resistant Cypher emission
//! - Classification and content-hash caching of compiled scopes
//!
//! ```ignore
//! use scopegraph::prelude::*;
//!
//! let registry = ModelRegistry::new().with_entity(
//!     EntityModel::new("Person")
//!         .with_relation("roles", RelationTarget::new("PersonTeam"))
//!         .with_recorded_scope("volunteers", |q| {
//!             q.where_has("roles", |r| {
//!                 r.where_eq("role_type", "volunteer")?;
//!                 Ok(())
//!             })?;
//!             Ok(())
//!         }),
//! );
//! let descriptor = ScopeClassifier::with_defaults().compile(&registry, "Person", "volunteers")?;
//! ```

pub mod utils;

pub mod config;
pub mod errors;
pub mod filter_ir;
pub mod pattern_library;
pub mod query_emitter;
pub mod recorder;
pub mod sanitizer;
pub mod scope_classifier;
pub mod source_model;

pub mod prelude {
    pub use crate::config::CompilerConfig;
    pub use crate::errors::ScopeError;
    pub use crate::filter_ir::{Conjunction, Literal, Operator};
    pub use crate::pattern_library::{PatternLibrary, PatternLibraryBuilder};
    pub use crate::query_emitter::QueryEmitter;
    pub use crate::recorder::{CallRecorder, ConditionRecorder, RecordConditions};
    pub use crate::scope_classifier::{ScopeClassifier, ScopeDescriptor, SpecificationType};
    pub use crate::source_model::{
        DeclarativeScope, EntityModel, ModelRegistry, RelationTarget, ScopeDefinition,
    };
}
