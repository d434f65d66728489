//! Integration tests - whole-pipeline compilation of scopes
//!
//! These tests drive the classifier from a model registry, either built in
//! code or loaded from the YAML fixtures under `tests/fixtures/`.

mod manifest_tests;
mod scenario_tests;
