//! # Scope Compilation Error Types
//!
//! Every failure the compiler can produce is a definition bug, never a
//! transient fault, so none of these are retryable and the compiler never
//! falls back to a best-effort emission.
//!
//! ## Error Categories
//!
//! - **Safety**: `InjectionRisk` for identifiers failing the grammar or keyword blocklist
//! - **Recording**: `UnsupportedOperation`, `NestedCallbackTooDeep`
//! - **Emission**: `TypeMismatch`, `UnknownRelation`, `InvalidLiteral`
//! - **Patterns**: `MissingParameter`, `UnexpectedParameter`, `UnknownPattern`,
//!   `DuplicatePattern`, `InvalidPattern`
//! - **Classification**: `AmbiguousClassification`, `UnknownEntity`, `UnknownScope`,
//!   `Serialization`
//! - **Manifests**: `ManifestParse`

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScopeError {
    #[error("Identifier `{token}` rejected as an injection risk: {reason}")]
    InjectionRisk { token: String, reason: String },

    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    #[error("Operator `{operator}` expects {expected} but received {found}")]
    TypeMismatch {
        operator: String,
        expected: String,
        found: String,
    },

    #[error("Relationship `{relation}` is nested inside another relationship callback (only one level is allowed)")]
    NestedCallbackTooDeep { relation: String },

    #[error("Pattern `{pattern}` is missing required parameter `{parameter}`")]
    MissingParameter { pattern: String, parameter: String },

    #[error("Scope `{scope}` has an ambiguous classification: {reason}")]
    AmbiguousClassification { scope: String, reason: String },

    #[error("No pattern named `{name}` is registered")]
    UnknownPattern { name: String },

    #[error("Pattern `{name}` is already registered")]
    DuplicatePattern { name: String },

    #[error("Pattern `{pattern}` does not declare parameter `{parameter}`")]
    UnexpectedParameter { pattern: String, parameter: String },

    #[error("Pattern `{name}` is malformed: {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Entity `{entity}` has no relation named `{relation}`")]
    UnknownRelation { entity: String, relation: String },

    #[error("No entity labelled `{label}` is registered")]
    UnknownEntity { label: String },

    #[error("Entity `{entity}` has no scope named `{scope}`")]
    UnknownScope { entity: String, scope: String },

    #[error("Failed to parse model manifest: {message}")]
    ManifestParse { message: String },

    #[error("Invalid literal `{literal}`: {reason}")]
    InvalidLiteral { literal: String, reason: String },

    #[error("Failed to serialize scope source: {message}")]
    Serialization { message: String },
}

/// Helper methods for creating errors with context information
impl ScopeError {
    /// Create an InjectionRisk error for a token with the failed rule
    pub fn injection(token: impl Into<String>, reason: impl Into<String>) -> Self {
        ScopeError::InjectionRisk {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedOperation error naming the operation
    pub fn unsupported(operation: impl Into<String>) -> Self {
        ScopeError::UnsupportedOperation {
            operation: operation.into(),
        }
    }

    /// Create a TypeMismatch error
    ///
    /// # Example
    /// ```ignore
    /// ScopeError::type_mismatch("=", "a scalar value", "list")
    /// ```
    pub fn type_mismatch(
        operator: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ScopeError::TypeMismatch {
            operator: operator.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an AmbiguousClassification error with context information
    ///
    /// # Example
    /// ```ignore
    /// ScopeError::ambiguous_with_context(
    ///     "volunteers",
    ///     "declares both `pattern` and `calls`"
    /// )
    /// ```
    pub fn ambiguous_with_context(scope: impl Into<String>, context: impl Into<String>) -> Self {
        ScopeError::AmbiguousClassification {
            scope: scope.into(),
            reason: context.into(),
        }
    }

    /// Create an InvalidPattern error for a malformed pattern definition
    pub fn invalid_pattern(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ScopeError::InvalidPattern {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn is_injection_risk(&self) -> bool {
        matches!(self, ScopeError::InjectionRisk { .. })
    }
}
