//! Recorded scopes compiled end to end

#[cfg(test)]
mod scenario_tests {
    use scopegraph::prelude::*;
    use std::sync::Arc;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn registry() -> ModelRegistry {
        ModelRegistry::new().with_entity(
            EntityModel::new("Person")
                .with_relation("roles", RelationTarget::new("PersonTeam").with_type("HAS_ROLE"))
                .with_relation("donations", RelationTarget::new("Donation"))
                .with_recorded_scope("active", |q| {
                    q.where_eq("status", "active")?;
                    Ok(())
                })
                .with_recorded_scope("volunteers", |q| {
                    q.where_has("roles", |r| {
                        r.where_eq("role_type", "volunteer")?;
                        Ok(())
                    })?;
                    Ok(())
                })
                .with_recorded_scope("vip", |q| {
                    q.where_eq("status", "active")?
                        .where_cmp("value", ">=", 5000)?;
                    Ok(())
                })
                .with_recorded_scope("generous_volunteers", |q| {
                    q.where_eq("status", "active")?
                        .where_has("roles", |r| {
                            r.where_eq("role_type", "volunteer")?
                                .or()
                                .where_eq("role_type", "staff")?;
                            Ok(())
                        })?
                        .or()
                        .where_has("donations", |d| {
                            d.where_cmp("amount", ">=", 1000)?;
                            Ok(())
                        })?;
                    Ok(())
                })
                .with_recorded_scope("member_or_prospect", |q| {
                    q.has("roles")?.or().where_eq("status", "prospect")?;
                    Ok(())
                })
                .with_recorded_scope("too_deep", |q| {
                    q.where_has("roles", |r| {
                        r.has("team")?;
                        Ok(())
                    })?;
                    Ok(())
                }),
        )
    }

    #[test]
    fn test_scenario_active_property_filter() {
        init_logging();
        let descriptor = ScopeClassifier::with_defaults()
            .compile(&registry(), "Person", "active")
            .unwrap();
        assert_eq!(descriptor.specification_type, SpecificationType::PropertyFilter);
        assert_eq!(descriptor.query_text, "p.status = 'active'");
    }

    #[test]
    fn test_scenario_volunteers_traversal() {
        init_logging();
        let descriptor = ScopeClassifier::with_defaults()
            .compile(&registry(), "Person", "volunteers")
            .unwrap();
        assert_eq!(
            descriptor.specification_type,
            SpecificationType::RelationshipTraversal
        );
        let query = &descriptor.query_text;
        assert!(query.starts_with("MATCH "));
        assert!(query.contains("HAS_ROLE"));
        assert!(query.contains("WHERE pt.role_type = 'volunteer'"));
        assert!(query.contains("RETURN DISTINCT"));
    }

    #[test]
    fn test_scenario_vip_conjunction() {
        init_logging();
        let descriptor = ScopeClassifier::with_defaults()
            .compile(&registry(), "Person", "vip")
            .unwrap();
        assert_eq!(descriptor.specification_type, SpecificationType::PropertyFilter);
        assert_eq!(descriptor.query_text, "p.status = 'active' AND p.value >= 5000");
    }

    #[test]
    fn test_mixed_conjunctions_keep_source_order() {
        init_logging();
        let descriptor = ScopeClassifier::with_defaults()
            .compile(&registry(), "Person", "generous_volunteers")
            .unwrap();
        assert_eq!(
            descriptor.query_text,
            "MATCH (p:Person) \
             WHERE p.status = 'active' \
             AND EXISTS { MATCH (p)-[:HAS_ROLE]->(pt:PersonTeam) WHERE (pt.role_type = 'volunteer' OR pt.role_type = 'staff') } \
             OR EXISTS { MATCH (p)-[:HAS_DONATION]->(d:Donation) WHERE d.amount >= 1000 } \
             RETURN p LIMIT 100"
        );
    }

    #[test]
    fn test_or_after_bare_hop_is_kept() {
        init_logging();
        let descriptor = ScopeClassifier::with_defaults()
            .compile(&registry(), "Person", "member_or_prospect")
            .unwrap();
        assert_eq!(descriptor.specification_type, SpecificationType::RelationshipTraversal);
        assert_eq!(
            descriptor.query_text,
            "MATCH (p:Person) \
             WHERE EXISTS { MATCH (p)-[:HAS_ROLE]->(pt:PersonTeam) } \
             OR p.status = 'prospect' \
             RETURN p LIMIT 100"
        );
    }

    #[test]
    fn test_nested_relationship_is_rejected() {
        init_logging();
        let err = ScopeClassifier::with_defaults()
            .compile(&registry(), "Person", "too_deep")
            .unwrap_err();
        assert_eq!(
            err,
            ScopeError::NestedCallbackTooDeep {
                relation: "roles.team".to_string()
            }
        );
    }

    #[test]
    fn test_compilation_is_idempotent() {
        init_logging();
        let config = CompilerConfig {
            cache_enabled: false,
            ..Default::default()
        };
        let classifier = ScopeClassifier::new(config, Arc::new(PatternLibrary::with_builtins()));
        let registry = registry();

        for scope in ["active", "volunteers", "vip", "generous_volunteers"] {
            let first = classifier.compile(&registry, "Person", scope).unwrap();
            let second = classifier.compile(&registry, "Person", scope).unwrap();
            assert_eq!(first.query_text, second.query_text);
            assert_eq!(first.source_hash, second.source_hash);
            assert_eq!(
                serde_json::to_string(&first.to_record()).unwrap(),
                serde_json::to_string(&second.to_record()).unwrap()
            );
        }
        assert_eq!(classifier.cache_metrics().hits, 0);
    }

    #[test]
    fn test_result_limit_and_phrase_count_follow_config() {
        init_logging();
        let config = CompilerConfig {
            result_limit: 7,
            example_phrase_count: 2,
            ..Default::default()
        };
        let classifier = ScopeClassifier::new(config, Arc::new(PatternLibrary::with_builtins()));
        let descriptor = classifier.compile(&registry(), "Person", "volunteers").unwrap();
        assert!(descriptor.query_text.ends_with("LIMIT 7"));
        assert_eq!(
            descriptor.examples,
            vec!["Show volunteers people", "How many volunteers people?"]
        );
    }

    #[test]
    fn test_cache_serves_repeat_compilations() {
        init_logging();
        let classifier = ScopeClassifier::with_defaults();
        let registry = registry();
        for _ in 0..3 {
            classifier.compile(&registry, "Person", "vip").unwrap();
        }
        let metrics = classifier.cache_metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hits, 2);
        assert_eq!(metrics.size, 1);
    }

    #[test]
    fn test_relation_map_change_invalidates_cached_descriptor() {
        init_logging();
        let classifier = ScopeClassifier::with_defaults();
        let before = classifier.compile(&registry(), "Person", "volunteers").unwrap();

        // Same scope source, but `roles` now emits a different relationship type
        let mut changed = registry();
        if let Some(person) = changed.entity_mut("Person") {
            person
                .relations
                .insert("roles".to_string(), RelationTarget::new("PersonTeam").with_type("PLAYS"));
        }
        let after = classifier.compile(&changed, "Person", "volunteers").unwrap();

        assert_ne!(before.source_hash, after.source_hash);
        assert!(after.query_text.contains("[:PLAYS]"));
        assert_eq!(classifier.cache_metrics().hits, 0);
    }
}
