//! Example phrasings and concept text for compiled scopes

use super::SpecificationType;
use crate::utils::inflect;

/// `{scope}` and `{plural}` are replaced; order is the order phrases are emitted
const EXAMPLE_TEMPLATES: [&str; 8] = [
    "Show {scope} {plural}",
    "How many {scope} {plural}?",
    "List all {scope} {plural}",
    "Find {scope} {plural}",
    "Which {plural} are {scope}?",
    "Count the {scope} {plural}",
    "Give me every {scope} {singular}",
    "Are there any {scope} {plural}?",
];

/// First `count` example questions for a scope of `entity`
pub fn example_phrases(scope: &str, entity: &str, count: usize) -> Vec<String> {
    let scope = inflect::humanize(scope);
    let singular = inflect::humanize(entity);
    let plural = inflect::pluralize(&singular);

    EXAMPLE_TEMPLATES
        .iter()
        .take(count)
        .map(|template| {
            template
                .replace("{scope}", &scope)
                .replace("{plural}", &plural)
                .replace("{singular}", &singular)
        })
        .collect()
}

/// One-line description of what a scope selects
pub fn concept(
    scope: &str,
    entity: &str,
    specification_type: SpecificationType,
    pattern_description: Option<&str>,
) -> String {
    let subject = format!(
        "{} {}",
        inflect::humanize(scope),
        inflect::pluralize(&inflect::humanize(entity))
    );
    match (specification_type, pattern_description) {
        (SpecificationType::Pattern, Some(description)) => format!("{}: {}", subject, description),
        (SpecificationType::RelationshipTraversal, _) => {
            format!("{}: selected through their relationships", subject)
        }
        _ => format!("{}: filtered on their own properties", subject),
    }
}
