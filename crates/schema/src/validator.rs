//! Generic validator walking a [`Schema`] alongside a YAML document
//!
//! Normalization (coercion and defaults) runs before the rules are checked,
//! so the document returned by [`Validator::validated`] is the one that was
//! actually validated. Every violation is collected; validation never stops
//! at the first error.

use crate::report::ValidationReport;
use crate::rule::{Coercion, FieldRule, NestedSchema, Schema};
use serde_yaml::{Mapping, Number, Value};
use tracing::debug;
use types::utils::{display_value, value_type_name};

/// Schema validator
#[derive(Debug, Clone)]
pub struct Validator<'a> {
    schema: &'a Schema,
    allow_unknown: bool,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            allow_unknown: false,
        }
    }

    /// Accept keys the schema does not mention instead of reporting them
    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    /// Validate a document, returning the report only
    pub fn validate(&self, document: &Value) -> ValidationReport {
        self.run(document).1
    }

    /// Validate and normalize a document.
    ///
    /// Returns the normalized document, or the report if any error was found.
    /// Warnings alone do not fail validation; use [`Validator::run`] to see them.
    pub fn validated(&self, document: &Value) -> Result<Value, ValidationReport> {
        let (normalized, report) = self.run(document);
        if report.is_valid() {
            Ok(normalized)
        } else {
            Err(report)
        }
    }

    /// Validate and normalize, returning both the document and the full report
    pub fn run(&self, document: &Value) -> (Value, ValidationReport) {
        let mut report = ValidationReport::new();
        let normalized = match document {
            Value::Mapping(mapping) => {
                Value::Mapping(self.validate_mapping(self.schema, mapping, "", &mut report))
            }
            other => {
                report.add_error(
                    "",
                    &format!("document must be a dict, got {}", value_type_name(other)),
                );
                other.clone()
            }
        };
        debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Validated document"
        );
        (normalized, report)
    }

    fn validate_mapping(
        &self,
        schema: &Schema,
        mapping: &Mapping,
        path: &str,
        report: &mut ValidationReport,
    ) -> Mapping {
        let mut out = Mapping::new();

        for (key, value) in mapping {
            let name = match key.as_str() {
                Some(name) => name,
                None => {
                    report.add_error(
                        &join(path, &display_value(key)),
                        "field names must be strings",
                    );
                    continue;
                }
            };
            let field_path = join(path, name);
            match schema.get(name) {
                Some(rule) => {
                    let value = match &rule.default {
                        Some(default) if value.is_null() && !rule.nullable => {
                            report.add_warning(
                                &field_path,
                                &format!("null, using default {}", display_value(default)),
                            );
                            default
                        }
                        _ => value,
                    };
                    let checked = self.validate_field(rule, value, &field_path, report);
                    out.insert(key.clone(), checked);
                }
                None if self.allow_unknown => {
                    out.insert(key.clone(), value.clone());
                }
                None => report.add_error(&field_path, "unknown field"),
            }
        }

        for (name, rule) in schema.iter() {
            if mapping.contains_key(name.as_str()) {
                continue;
            }
            let field_path = join(path, name);
            if let Some(default) = &rule.default {
                report.add_warning(
                    &field_path,
                    &format!("not set, using default {}", display_value(default)),
                );
                let checked = self.validate_field(rule, default, &field_path, report);
                out.insert(Value::String(name.clone()), checked);
            } else if rule.required {
                report.add_error(&field_path, "required field");
            }
        }

        out
    }

    fn validate_field(
        &self,
        rule: &FieldRule,
        value: &Value,
        path: &str,
        report: &mut ValidationReport,
    ) -> Value {
        let value = match (rule.coerce, value) {
            (Some(_), Value::Null) | (None, _) => value.clone(),
            (Some(coercion), _) => match coerce(coercion, value) {
                Ok(coerced) => coerced,
                Err(reason) => {
                    report.add_error(path, &reason);
                    return value.clone();
                }
            },
        };

        if value.is_null() {
            if !rule.nullable {
                report.add_error(path, "null value not allowed");
            }
            return value;
        }

        if let Some(field_type) = rule.field_type {
            if !field_type.matches(&value) {
                report.add_error(
                    path,
                    &format!(
                        "must be of {} type, got {}",
                        field_type,
                        value_type_name(&value)
                    ),
                );
                return value;
            }
        }

        if rule.empty == Some(false) && is_empty(&value) {
            report.add_error(path, "empty values not allowed");
        }

        if let Some(allowed) = &rule.allowed {
            check_allowed(allowed, &value, path, report);
        }

        if let Some(actual) = as_f64(&value) {
            if let Some(min) = &rule.min {
                if min.as_f64().is_some_and(|min| actual < min) {
                    report.add_error(path, &format!("min value is {}", min));
                }
            }
            if let Some(max) = &rule.max {
                if max.as_f64().is_some_and(|max| actual > max) {
                    report.add_error(path, &format!("max value is {}", max));
                }
            }
        }

        match (&rule.schema, value) {
            (Some(NestedSchema::Fields(fields)), Value::Mapping(mapping)) => {
                Value::Mapping(self.validate_mapping(fields, &mapping, path, report))
            }
            (Some(NestedSchema::Item(item)), Value::Sequence(items)) => Value::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| {
                        self.validate_field(item, entry, &join(path, &index.to_string()), report)
                    })
                    .collect(),
            ),
            (_, value) => value,
        }
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(mapping) => mapping.is_empty(),
        _ => false,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn check_allowed(allowed: &[Value], value: &Value, path: &str, report: &mut ValidationReport) {
    let candidates: Vec<&Value> = match value {
        Value::Sequence(items) => items.iter().collect(),
        other => vec![other],
    };
    let unallowed: Vec<String> = candidates
        .into_iter()
        .filter(|candidate| !allowed.contains(*candidate))
        .map(display_value)
        .collect();
    if !unallowed.is_empty() {
        let choices: Vec<String> = allowed.iter().map(display_value).collect();
        report.add_error(
            path,
            &format!(
                "unallowed value {} (allowed: {})",
                unallowed.join(", "),
                choices.join(", ")
            ),
        );
    }
}

/// Apply a `coerce` rule to a non-null value
fn coerce(coercion: Coercion, value: &Value) -> Result<Value, String> {
    let fail = || {
        format!(
            "cannot be coerced to {}: {}",
            coercion.as_str(),
            display_value(value)
        )
    };

    match (coercion, value) {
        (Coercion::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        (Coercion::Integer, Value::Number(n)) => match n.as_f64() {
            Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                Ok(Value::Number(Number::from(f.trunc() as i64)))
            }
            _ => Err(fail()),
        },
        (Coercion::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|i| Value::Number(Number::from(i)))
            .map_err(|_| fail()),
        (Coercion::Integer, Value::Bool(b)) => Ok(Value::Number(Number::from(i64::from(*b)))),

        (Coercion::Float, Value::Number(n)) => n
            .as_f64()
            .map(|f| Value::Number(Number::from(f)))
            .ok_or_else(fail),
        (Coercion::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(|f| Value::Number(Number::from(f)))
            .map_err(|_| fail()),

        (Coercion::String, Value::String(_)) => Ok(value.clone()),
        (Coercion::String, Value::Number(_) | Value::Bool(_)) => {
            Ok(Value::String(display_value(value)))
        }

        (Coercion::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (Coercion::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(fail()),
        },
        (Coercion::Boolean, Value::Number(n)) => n
            .as_f64()
            .map(|f| Value::Bool(f != 0.0))
            .ok_or_else(fail),

        _ => Err(fail()),
    }
}
