//! Pattern instantiation through the public library API

#[cfg(test)]
mod pattern_library_tests {
    use std::collections::BTreeMap;

    use scopegraph::errors::ScopeError;
    use scopegraph::filter_ir::Literal;
    use scopegraph::pattern_library::PatternLibrary;

    fn full_params() -> BTreeMap<String, Literal> {
        [
            ("property", Literal::from("tier")),
            ("value", Literal::from("gold")),
            ("rel_type", Literal::from("HAS_ROLE")),
            ("target", Literal::from("PersonTeam")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn test_each_omitted_parameter_is_named() {
        let library = PatternLibrary::with_builtins();
        for omitted in ["property", "value", "rel_type", "target"] {
            let mut params = full_params();
            params.remove(omitted);
            let err = library
                .instantiate("property_with_relationship", params)
                .unwrap_err();
            assert_eq!(
                err,
                ScopeError::MissingParameter {
                    pattern: "property_with_relationship".to_string(),
                    parameter: omitted.to_string(),
                }
            );
        }
    }

    #[test]
    fn test_complete_parameters_render_description() {
        let instance = PatternLibrary::with_builtins()
            .instantiate("property_with_relationship", full_params())
            .unwrap();
        assert_eq!(
            instance.description(),
            "Records where tier is gold that have a HAS_ROLE relationship to a PersonTeam"
        );
        assert_eq!(instance.name(), "property_with_relationship");
    }
}
