//! Identifier sanitizer acceptance and rejection

#[cfg(test)]
mod sanitizer_tests {
    use scopegraph::errors::ScopeError;
    use scopegraph::sanitizer::{sanitize_identifier, validate_identifier};
    use test_case::test_case;

    #[test_case("Person_Profile")]
    #[test_case("_private")]
    #[test_case("HAS_ROLE")]
    #[test_case("address2")]
    fn test_accepts(identifier: &str) {
        assert_eq!(sanitize_identifier(identifier).unwrap(), identifier);
    }

    #[test_case("Person}); DELETE (n) //" ; "cypher injection")]
    #[test_case("2fast" ; "leading digit")]
    #[test_case("first name" ; "whitespace")]
    #[test_case("a`b" ; "backtick")]
    #[test_case("" ; "empty")]
    #[test_case("MATCH" ; "keyword")]
    #[test_case("Delete" ; "mixed case keyword")]
    fn test_rejects(identifier: &str) {
        match validate_identifier(identifier) {
            Err(ScopeError::InjectionRisk { token, .. }) => assert_eq!(token, identifier),
            other => panic!("expected InjectionRisk for {:?}, got {:?}", identifier, other),
        }
    }

    #[test]
    fn test_length_limit() {
        let longest = "a".repeat(255);
        assert!(validate_identifier(&longest).is_ok());
        let too_long = "a".repeat(256);
        let err = validate_identifier(&too_long).unwrap_err();
        // Never truncated: the full token is reported
        assert!(matches!(err, ScopeError::InjectionRisk { ref token, .. } if token.len() == 256));
    }
}
