//! Base schema and operator schema merging

use crate::rule::{FieldRule, NestedSchema, Schema};
use tracing::warn;

/// Spec fields every deployment has regardless of operator
pub const COMMON_SPEC_FIELDS: [&str; 2] = ["bento", "instances"];

/// Return a copy of `schema` with every `help_message` removed.
///
/// Recurses into `dict` field schemas and into the item rule of `list`
/// fields. The input is left untouched.
pub fn remove_help_message(schema: &Schema) -> Schema {
    schema
        .iter()
        .map(|(name, rule)| (name.clone(), strip_rule(rule)))
        .collect()
}

fn strip_rule(rule: &FieldRule) -> FieldRule {
    let schema = rule.schema.as_ref().map(|nested| match nested {
        NestedSchema::Fields(fields) => NestedSchema::Fields(remove_help_message(fields)),
        NestedSchema::Item(item) => NestedSchema::Item(Box::new(strip_rule(item))),
    });

    FieldRule {
        help_message: None,
        schema,
        ..rule.clone()
    }
}

/// Spec fields shared by all operators
pub fn common_spec_schema() -> Schema {
    Schema::new()
        .field(
            "bento",
            FieldRule::string()
                .required()
                .with_help("Bento tag or path to a built bento directory"),
        )
        .field(
            "instances",
            FieldRule::dict(
                Schema::new()
                    .field(
                        "min",
                        FieldRule::integer()
                            .required()
                            .with_help("Minimum number of instances"),
                    )
                    .field(
                        "max",
                        FieldRule::integer()
                            .required()
                            .with_help("Maximum number of instances"),
                    ),
            )
            .required(),
        )
}

/// Top level document schema with the given rules under `spec`
pub fn base_schema(spec: Schema) -> Schema {
    Schema::new()
        .field("api_version", FieldRule::string().required())
        .field(
            "metadata",
            FieldRule::dict(
                Schema::new()
                    .field(
                        "name",
                        FieldRule::string()
                            .required()
                            .with_help("The name for the deployment"),
                    )
                    .field(
                        "operator",
                        FieldRule::string()
                            .required()
                            .with_help("The operator to use for deployment"),
                    ),
            )
            .required(),
        )
        .field("spec", FieldRule::dict(spec).required())
}

/// Build the validation-time schema for an operator's leaf schema.
///
/// Operator fields are nested under `spec` next to the common fields. A leaf
/// field that reuses a common field name is replaced by the common rule. The
/// result carries no help messages.
pub fn merge_operator_schema(leaf: &Schema) -> Schema {
    let mut spec = leaf.clone();
    for (name, rule) in common_spec_schema() {
        if spec.insert(name.clone(), rule).is_some() {
            warn!(
                field = %name,
                "Operator schema redefines a common spec field, keeping the common rule"
            );
        }
    }
    remove_help_message(&base_schema(spec))
}

/// Help text for every documented field, keyed by dotted path
pub fn help_messages(schema: &Schema) -> Vec<(String, String)> {
    let mut out = Vec::new();
    collect_help(schema, "", &mut out);
    out
}

fn collect_help(schema: &Schema, prefix: &str, out: &mut Vec<(String, String)>) {
    for (name, rule) in schema.iter() {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        collect_rule_help(rule, &path, out);
    }
}

fn collect_rule_help(rule: &FieldRule, path: &str, out: &mut Vec<(String, String)>) {
    if let Some(help) = &rule.help_message {
        out.push((path.to_string(), help.clone()));
    }
    match &rule.schema {
        Some(NestedSchema::Fields(fields)) => collect_help(fields, path, out),
        Some(NestedSchema::Item(item)) => collect_rule_help(item, &format!("{}.*", path), out),
        None => {}
    }
}
