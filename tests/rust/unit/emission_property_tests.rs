//! Operator, literal, range and DISTINCT guarantees of emitted Cypher

#[cfg(test)]
mod emission_property_tests {
    use scopegraph::filter_ir::{Condition, FilterExpr, Literal, Operator, Predicate};
    use scopegraph::query_emitter::{parse_literal, render_condition, QueryEmitter};
    use scopegraph::recorder::{CallRecorder, RecordConditions};
    use scopegraph::scope_classifier::ScopeClassifier;
    use scopegraph::source_model::{EntityModel, ModelRegistry, RelationTarget};
    use test_case::test_case;

    fn emit(predicate: Predicate) -> String {
        QueryEmitter::default()
            .emit_fragment(&FilterExpr::new().and(predicate))
            .unwrap()
    }

    #[test]
    fn test_operator_tokens_are_a_bijection() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_token(op.token()).unwrap(), op, "{:?}", op);
        }
        let mut tokens: Vec<&str> = Operator::ALL.iter().map(|op| op.token()).collect();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), Operator::ALL.len());
    }

    #[test]
    fn test_emitted_comparison_reads_back_as_same_operator() {
        for op in Operator::ALL.into_iter().filter(Operator::is_comparison) {
            let text = emit(Predicate::Condition(Condition::new("p", "value", op, 10)));
            let token = text
                .strip_prefix("p.value ")
                .and_then(|rest| rest.strip_suffix(" 10"))
                .unwrap_or_else(|| panic!("unexpected emission {}", text));
            assert_eq!(Operator::from_token(token).unwrap(), op);
        }

        let text = emit(Predicate::Condition(Condition::new("p", "name", Operator::Contains, "ann")));
        assert_eq!(text, "p.name CONTAINS 'ann'");
        let text = emit(Predicate::Condition(Condition::new("p", "id", Operator::NotIn, vec![1, 2])));
        assert_eq!(text, "NOT p.id IN [1, 2]");
    }

    #[test_case(Literal::from("O'Reilly \\ \"quoted\"\n") ; "string")]
    #[test_case(Literal::from(42) ; "integer")]
    #[test_case(Literal::from(-0.125) ; "float")]
    #[test_case(Literal::from(true) ; "boolean")]
    #[test_case(Literal::from(vec!["a", "b'c"]) ; "list")]
    fn test_emitted_literal_parses_back(value: Literal) {
        let op = match value {
            Literal::List(_) => Operator::In,
            _ => Operator::Equal,
        };
        let text = render_condition(&Condition::new("p", "x", op, value.clone())).unwrap();
        let literal = text
            .strip_prefix(&format!("p.x {} ", op.token()))
            .unwrap_or_else(|| panic!("unexpected emission {}", text));
        assert_eq!(parse_literal(literal).unwrap(), value);
    }

    #[test]
    fn test_null_literal_becomes_null_check() {
        let text = render_condition(&Condition::new("p", "x", Operator::Equal, Literal::Null)).unwrap();
        assert_eq!(text, "p.x IS NULL");
        assert_eq!(parse_literal("null").unwrap(), Literal::Null);
    }

    /// Interpret `p.age >= a AND p.age <= b`, optionally wrapped in `NOT (...)`
    fn interpret(text: &str, age: i64) -> bool {
        if let Some(inner) = text.strip_prefix("NOT (").and_then(|t| t.strip_suffix(')')) {
            return !interpret(inner, age);
        }
        text.split(" AND ").all(|clause| {
            let parts: Vec<&str> = clause.split_whitespace().collect();
            assert_eq!(parts[0], "p.age");
            let bound: i64 = parts[2].parse().unwrap();
            match parts[1] {
                ">=" => age >= bound,
                "<=" => age <= bound,
                other => panic!("unexpected operator {}", other),
            }
        })
    }

    #[test]
    fn test_range_is_inclusive_conjunction_and_negation_inverts_it() {
        let mut recorder = CallRecorder::new();
        recorder.where_between("age", 2, 5).unwrap();
        recorder.where_not_between("age", 2, 5).unwrap();
        let registry = ModelRegistry::new();
        let person = EntityModel::new("Person");
        let lowered =
            scopegraph::filter_ir::lower_records(&registry, &person, recorder.records()).unwrap();

        let emitter = QueryEmitter::default();
        let range = emitter
            .emit_fragment(&FilterExpr::new().and(lowered.spec.filter.terms[0].predicate.clone()))
            .unwrap();
        let negated = emitter
            .emit_fragment(&FilterExpr::new().and(lowered.spec.filter.terms[1].predicate.clone()))
            .unwrap();
        assert_eq!(range, "p.age >= 2 AND p.age <= 5");

        for age in -1..=8 {
            let expected = (2..=5).contains(&age);
            assert_eq!(interpret(&range, age), expected, "age {}", age);
            assert_eq!(interpret(&negated, age), !expected, "age {}", age);
        }
    }

    fn graph() -> EntityModel {
        EntityModel::new("Person")
            .with_relation("roles", RelationTarget::new("PersonTeam").with_type("HAS_ROLE"))
            .with_relation("team", RelationTarget::new("Team").with_type("IN_TEAM"))
            .with_relation("donations", RelationTarget::new("Donation"))
    }

    #[test]
    fn test_distinct_follows_relationship_operations() {
        let entity = graph()
            .with_recorded_scope("plain", |q| {
                q.where_eq("status", "active")?.or().where_null("deleted_at")?;
                Ok(())
            })
            .with_recorded_scope("chained", |q| {
                q.has("roles")?.has("team")?;
                Ok(())
            })
            .with_recorded_scope("three_hops", |q| {
                q.has("roles")?.has("team")?.where_has("donations", |d| {
                    d.where_cmp("amount", ">", 100)?;
                    Ok(())
                })?;
                Ok(())
            });
        let registry = ModelRegistry::new().with_entity(entity);
        let classifier = ScopeClassifier::with_defaults();

        let plain = classifier.compile(&registry, "Person", "plain").unwrap();
        assert!(!plain.query_text.contains("DISTINCT"));

        for scope in ["chained", "three_hops"] {
            let descriptor = classifier.compile(&registry, "Person", scope).unwrap();
            assert!(
                descriptor.query_text.contains("RETURN DISTINCT p"),
                "{}: {}",
                scope,
                descriptor.query_text
            );
        }
    }

    /// Absence checks and `or`-joined existence checks are `EXISTS` subqueries
    /// in the WHERE clause: they never multiply result rows, so even two or
    /// more of them emit no `DISTINCT`.
    #[test]
    fn test_where_clause_existence_checks_do_not_fan_out() {
        let entity = graph()
            .with_recorded_scope("two_absences", |q| {
                q.doesnt_have("roles")?.doesnt_have("donations")?;
                Ok(())
            })
            .with_recorded_scope("either_relationship", |q| {
                q.has("roles")?.or().has("donations")?;
                Ok(())
            });
        let registry = ModelRegistry::new().with_entity(entity);
        let classifier = ScopeClassifier::with_defaults();

        let absences = classifier.compile(&registry, "Person", "two_absences").unwrap();
        assert_eq!(
            absences.query_text,
            "MATCH (p:Person) \
             WHERE NOT EXISTS { MATCH (p)-[:HAS_ROLE]->(pt:PersonTeam) } \
             AND NOT EXISTS { MATCH (p)-[:HAS_DONATION]->(d:Donation) } \
             RETURN p LIMIT 100"
        );

        let either = classifier
            .compile(&registry, "Person", "either_relationship")
            .unwrap();
        assert_eq!(
            either.query_text,
            "MATCH (p:Person) \
             WHERE EXISTS { MATCH (p)-[:HAS_ROLE]->(pt:PersonTeam) } \
             OR EXISTS { MATCH (p)-[:HAS_DONATION]->(d:Donation) } \
             RETURN p LIMIT 100"
        );
    }
}
