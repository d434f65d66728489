//! Declarative scopes loaded from YAML manifests

#[cfg(test)]
mod manifest_tests {
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;

    use scopegraph::prelude::*;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn registry() -> ModelRegistry {
        ModelRegistry::from_yaml_file(fixture("people_manifest.yaml")).unwrap()
    }

    fn compile(scope: &str) -> Result<ScopeDescriptor, ScopeError> {
        let _ = env_logger::builder().is_test(true).try_init();
        ScopeClassifier::with_defaults().compile(&registry(), "Person", scope)
    }

    #[test]
    fn test_declarative_calls_match_recorded_output() {
        assert_eq!(compile("active").unwrap().query_text, "p.status = 'active'");
        assert_eq!(
            compile("vip").unwrap().query_text,
            "p.status = 'active' AND p.value >= 5000"
        );
    }

    #[test]
    fn test_absence_check_has_no_distinct() {
        let descriptor = compile("lapsed_or_flagged").unwrap();
        assert_eq!(
            descriptor.specification_type,
            SpecificationType::RelationshipTraversal
        );
        assert_eq!(
            descriptor.query_text,
            "MATCH (p:Person) WHERE NOT EXISTS { MATCH (p)-[:HAS_DONATION]->(d:Donation) } OR p.flagged = true RETURN p LIMIT 100"
        );
    }

    #[test]
    fn test_declarative_relationship_traversal() {
        let descriptor = compile("team_leads").unwrap();
        assert_eq!(
            descriptor.query_text,
            "MATCH (p:Person)-[:HAS_ROLE]->(pt:PersonTeam)-[:IN_TEAM]->(t:Team) WHERE p.status = 'active' AND pt.role_type = 'lead' RETURN DISTINCT p LIMIT 100"
        );
        let spec = descriptor.relationship_spec.unwrap();
        assert_eq!(spec.steps.len(), 2);
        assert!(spec.distinct());
    }

    #[test]
    fn test_pattern_scope_record() {
        let descriptor = compile("engaged").unwrap();
        assert_eq!(descriptor.specification_type, SpecificationType::Pattern);

        let record = serde_json::to_value(descriptor.to_record()).unwrap();
        assert_eq!(record["specification_type"], "pattern");
        assert_eq!(
            record["query_text"],
            "MATCH (p:Person)-[:HAS_ROLE]->(related:PersonTeam) RETURN DISTINCT p LIMIT 100"
        );
        assert_eq!(record["examples"][0], "Show engaged people");
        assert!(record["concept"]
            .as_str()
            .unwrap()
            .contains("at least one HAS_ROLE relationship"));
    }

    #[test]
    fn test_declared_type_conflict_is_ambiguous() {
        let err = compile("confused").unwrap_err();
        assert!(matches!(err, ScopeError::AmbiguousClassification { ref scope, .. } if scope == "confused"));
    }

    #[test]
    fn test_compile_all_reports_each_scope() {
        let registry = registry();
        let results = ScopeClassifier::with_defaults().compile_all(&registry);

        let person = &results["Person"];
        let failed: Vec<&str> = person
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(failed, vec!["confused"]);
        assert_eq!(person.len(), 6);
        assert!(results["PersonTeam"].is_empty());
    }

    #[test]
    fn test_custom_pattern_library_from_yaml() -> anyhow::Result<()> {
        let mut builder = PatternLibrary::builder();
        builder.load_yaml_str(
                r#"
patterns:
  - name: managed_by
    description: "Managed by someone named {name}"
    query: "MATCH ({alias}:{entity})<-[:MANAGES]-(m:Person) WHERE m.name = {name} RETURN DISTINCT {alias}"
    params:
      - { name: name, kind: string }
"#,
        )?;
        let classifier = ScopeClassifier::new(CompilerConfig::default(), Arc::new(builder.build()));

        let registry = ModelRegistry::from_yaml_str(
            r#"
entities:
  - label: Person
    scopes:
      - name: alices_reports
        pattern:
          name: managed_by
          params: { name: Alice }
"#,
        )?;
        let descriptor = classifier.compile(&registry, "Person", "alices_reports")?;
        assert_eq!(
            descriptor.query_text,
            "MATCH (p:Person)<-[:MANAGES]-(m:Person) WHERE m.name = 'Alice' RETURN DISTINCT p LIMIT 100"
        );
        Ok(())
    }

    #[test]
    fn test_unknown_operation_in_manifest() {
        let registry = ModelRegistry::from_yaml_str(
            r#"
entities:
  - label: Person
    scopes:
      - name: odd
        calls:
          - { op: whereJsonContains, column: tags, value: x }
"#,
        )
        .unwrap();
        let err = ScopeClassifier::with_defaults()
            .compile(&registry, "Person", "odd")
            .unwrap_err();
        assert!(matches!(err, ScopeError::UnsupportedOperation { ref operation } if operation.contains("whereJsonContains")));
    }

    #[test]
    fn test_config_from_yaml_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "result_limit: 20\ncache_max_entries: 5")?;

        let config = CompilerConfig::from_yaml_file(file.path())?;
        assert_eq!(config.result_limit, 20);
        assert_eq!(config.cache_max_entries, 5);
        assert_eq!(config.example_phrase_count, 4);
        Ok(())
    }
}
