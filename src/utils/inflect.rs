//! Word inflection helpers
//!
//! Used to derive relationship types from relation names (`roles` -> `HAS_ROLE`),
//! node aliases from labels (`PersonTeam` -> `pt`) and the natural language
//! example phrases attached to every compiled scope.

/// (singular, plural) pairs that do not follow the suffix rules
const IRREGULARS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
];

/// Words whose singular and plural forms are identical
const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "information",
    "metadata",
    "news",
    "series",
    "species",
    "staff",
];

/// Split an identifier into lowercase words.
///
/// Handles snake_case, kebab-case, camelCase, PascalCase and acronym runs:
/// - `teamMemberships` -> `["team", "memberships"]`
/// - `PersonTeam` -> `["person", "team"]`
/// - `HTTPRequest_log` -> `["http", "request", "log"]`
pub fn split_words(identifier: &str) -> Vec<String> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // Break on lower->Upper, and at the end of an acronym run (`HTTPRequest`)
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Lowercase, space separated form: `high_value` -> `high value`
pub fn humanize(identifier: &str) -> String {
    split_words(identifier).join(" ")
}

/// Uppercase, underscore separated form: `teamMembership` -> `TEAM_MEMBERSHIP`
pub fn upper_snake(identifier: &str) -> String {
    split_words(identifier)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Lowercased initials of each word: `PersonTeam` -> `pt`
pub fn initials(identifier: &str) -> String {
    split_words(identifier)
        .iter()
        .filter_map(|w| w.chars().next())
        .collect()
}

/// Pluralize a single lowercase word
pub fn pluralize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULARS.iter().find(|(s, p)| *s == word || *p == word) {
        return plural.to_string();
    }

    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) && !stem.is_empty() {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with("ss")
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if word.ends_with('s') {
        // Already plural (`roles`); `status` and friends are handled by the `us` check
        if word.ends_with("us") || word.ends_with("is") {
            return format!("{}es", word);
        }
        return word.to_string();
    }
    format!("{}s", word)
}

/// Singularize a single lowercase word
pub fn singularize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULARS.iter().find(|(s, p)| *p == word || *s == word) {
        return singular.to_string();
    }

    if word.len() > 3 {
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "xes", "zes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Pluralize the last word of a phrase: `person team` -> `person teams`
pub fn pluralize(phrase: &str) -> String {
    map_last_word(phrase, pluralize_word)
}

/// Singularize the last word of a phrase: `team memberships` -> `team membership`
pub fn singularize(phrase: &str) -> String {
    map_last_word(phrase, singularize_word)
}

fn map_last_word(phrase: &str, f: fn(&str) -> String) -> String {
    match phrase.rsplit_once(' ') {
        Some((head, last)) => format!("{} {}", head, f(last)),
        None => f(phrase),
    }
}
