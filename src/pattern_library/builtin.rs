//! Builtin pattern definitions
//!
//! Query templates reference the scope entity through `{entity}` (label) and
//! `{alias}`; related nodes are bound to `related`.

use super::{ParamKind, ParamSpec, PatternDefinition};

lazy_static::lazy_static! {
    pub static ref BUILTIN_PATTERNS: Vec<PatternDefinition> = vec![
        PatternDefinition::new(
            "has_relationship",
            vec![
                ParamSpec::new("rel_type", ParamKind::Label),
                ParamSpec::new("target", ParamKind::Label),
            ],
            "Records with at least one {rel_type} relationship to a {target}",
        )
        .with_query(
            "MATCH ({alias}:{entity})-[:{rel_type}]->(related:{target}) RETURN DISTINCT {alias}",
        ),
        PatternDefinition::new(
            "lacks_relationship",
            vec![
                ParamSpec::new("rel_type", ParamKind::Label),
                ParamSpec::new("target", ParamKind::Label),
            ],
            "Records with no {rel_type} relationship to any {target}",
        )
        .with_query(
            "MATCH ({alias}:{entity}) WHERE NOT EXISTS { MATCH ({alias})-[:{rel_type}]->(:{target}) } RETURN {alias}",
        ),
        PatternDefinition::new(
            "relationship_count_at_least",
            vec![
                ParamSpec::new("rel_type", ParamKind::Label),
                ParamSpec::new("target", ParamKind::Label),
                ParamSpec::new("min_count", ParamKind::Integer),
            ],
            "Records with at least {min_count} {rel_type} relationships to {target}",
        )
        .with_query(
            "MATCH ({alias}:{entity})-[:{rel_type}]->(related:{target}) WITH {alias}, count(related) AS related_count WHERE related_count >= {min_count} RETURN {alias}",
        ),
        PatternDefinition::new(
            "temporal_window",
            vec![
                ParamSpec::new("property", ParamKind::Identifier),
                ParamSpec::new("start_date", ParamKind::Date),
                ParamSpec::new("end_date", ParamKind::Date),
            ],
            "Records whose {property} falls between {start_date} and {end_date}",
        )
        .with_query(
            "MATCH ({alias}:{entity}) WHERE {alias}.{property} >= date({start_date}) AND {alias}.{property} <= date({end_date}) RETURN {alias}",
        ),
        PatternDefinition::new(
            "recent_activity",
            vec![
                ParamSpec::new("rel_type", ParamKind::Label),
                ParamSpec::new("target", ParamKind::Label),
                ParamSpec::new("property", ParamKind::Identifier),
                ParamSpec::new("days", ParamKind::Integer),
            ],
            "Records with a {rel_type} {target} in the last {days} days",
        )
        .with_query(
            "MATCH ({alias}:{entity})-[:{rel_type}]->(related:{target}) WHERE related.{property} >= date() - duration({days: {days}}) RETURN DISTINCT {alias}",
        ),
        PatternDefinition::new(
            "multi_hop",
            vec![
                ParamSpec::new("first_rel", ParamKind::Label),
                ParamSpec::new("middle", ParamKind::Label),
                ParamSpec::new("second_rel", ParamKind::Label),
                ParamSpec::new("target", ParamKind::Label),
            ],
            "Records connected to a {target} through {first_rel} and {second_rel} via {middle}",
        )
        .with_query(
            "MATCH ({alias}:{entity})-[:{first_rel}]->(:{middle})-[:{second_rel}]->(related:{target}) RETURN DISTINCT {alias}",
        ),
        PatternDefinition::new(
            "property_with_relationship",
            vec![
                ParamSpec::new("property", ParamKind::Identifier),
                ParamSpec::new("value", ParamKind::Scalar),
                ParamSpec::new("rel_type", ParamKind::Label),
                ParamSpec::new("target", ParamKind::Label),
            ],
            "Records where {property} is {value} that have a {rel_type} relationship to a {target}",
        )
        .with_query(
            "MATCH ({alias}:{entity})-[:{rel_type}]->(related:{target}) WHERE {alias}.{property} = {value} RETURN DISTINCT {alias}",
        ),
    ];
}
