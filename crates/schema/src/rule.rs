//! Schema-as-data definitions
//!
//! A [`Schema`] maps field names to [`FieldRule`]s. Rules are written in YAML
//! by operators (their leaf schema) and by this crate (the base schema), e.g.
//!
//! ```yaml
//! region:
//!   type: string
//!   required: true
//!   default: us-west-1
//!   help_message: AWS region to deploy into
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use types::SchemaError;

/// Value types understood by the `type` rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    /// Any number; integers are accepted as floats
    Float,
    /// Integer or float
    Number,
    Boolean,
    Dict,
    List,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Dict => "dict",
            FieldType::List => "list",
        }
    }

    /// Check whether a YAML value has this type
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (FieldType::Float | FieldType::Number, Value::Number(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Dict, Value::Mapping(_)) => true,
            (FieldType::List, Value::Sequence(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "integer" => Ok(FieldType::Integer),
            "float" => Ok(FieldType::Float),
            "number" => Ok(FieldType::Number),
            "boolean" => Ok(FieldType::Boolean),
            "dict" => Ok(FieldType::Dict),
            "list" => Ok(FieldType::List),
            other => Err(SchemaError::UnknownType(other.to_string())),
        }
    }
}

/// Conversions applied by the `coerce` rule before type checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Integer,
    Float,
    String,
    Boolean,
}

impl Coercion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Coercion::Integer => "integer",
            Coercion::Float => "float",
            Coercion::String => "string",
            Coercion::Boolean => "boolean",
        }
    }
}

impl FromStr for Coercion {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integer" | "int" => Ok(Coercion::Integer),
            "float" => Ok(Coercion::Float),
            "string" | "str" => Ok(Coercion::String),
            "boolean" | "bool" => Ok(Coercion::Boolean),
            other => Err(SchemaError::UnknownCoercion(other.to_string())),
        }
    }
}

/// Sub-schema attached to a `dict` or `list` field
#[derive(Debug, Clone, PartialEq)]
pub enum NestedSchema {
    /// Field rules of a `dict` value
    Fields(Schema),
    /// Rule applied to every item of a `list` value
    Item(Box<FieldRule>),
}

/// Validation rules for a single field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawFieldRule", into = "RawFieldRule")]
pub struct FieldRule {
    pub field_type: Option<FieldType>,
    pub required: bool,
    pub nullable: bool,
    /// `Some(false)` rejects empty strings, lists and dicts
    pub empty: Option<bool>,
    pub default: Option<Value>,
    pub allowed: Option<Vec<Value>>,
    pub min: Option<Number>,
    pub max: Option<Number>,
    pub coerce: Option<Coercion>,
    pub schema: Option<NestedSchema>,
    /// Documentation only, stripped before validation
    pub help_message: Option<String>,
}

impl FieldRule {
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::default()
        }
    }

    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::of(FieldType::Integer)
    }

    /// `dict` field validated against `fields`
    pub fn dict(fields: Schema) -> Self {
        Self {
            schema: Some(NestedSchema::Fields(fields)),
            ..Self::of(FieldType::Dict)
        }
    }

    /// `list` field whose items are validated against `item`
    pub fn list(item: FieldRule) -> Self {
        Self {
            schema: Some(NestedSchema::Item(Box::new(item))),
            ..Self::of(FieldType::List)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_help(mut self, message: impl Into<String>) -> Self {
        self.help_message = Some(message.into());
        self
    }

    /// True if this rule or any nested rule carries a help message
    pub fn contains_help_message(&self) -> bool {
        self.help_message.is_some()
            || match &self.schema {
                Some(NestedSchema::Fields(fields)) => fields.contains_help_message(),
                Some(NestedSchema::Item(item)) => item.contains_help_message(),
                None => false,
            }
    }
}

/// Field name to rule mapping, ordered by field name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(BTreeMap<String, FieldRule>);

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schema from its YAML form
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Builder-style insert
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.0.insert(name.into(), rule);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, rule: FieldRule) -> Option<FieldRule> {
        self.0.insert(name.into(), rule)
    }

    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldRule)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any rule at any depth carries a help message
    pub fn contains_help_message(&self) -> bool {
        self.0.values().any(FieldRule::contains_help_message)
    }
}

impl FromIterator<(String, FieldRule)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, FieldRule)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Schema {
    type Item = (String, FieldRule);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// On-disk shape of a rule, before the nested `schema` is interpreted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFieldRule {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    field_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    empty: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coerce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    help_message: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TryFrom<RawFieldRule> for FieldRule {
    type Error = SchemaError;

    fn try_from(raw: RawFieldRule) -> Result<Self, Self::Error> {
        let field_type = raw
            .field_type
            .as_deref()
            .map(FieldType::from_str)
            .transpose()?;
        let coerce = raw.coerce.as_deref().map(Coercion::from_str).transpose()?;

        let schema = match (raw.schema, field_type) {
            (None, _) => None,
            (Some(value), Some(FieldType::Dict)) => {
                let fields: Schema = serde_yaml::from_value(value).map_err(|e| {
                    SchemaError::InvalidNested {
                        field_type: "dict".to_string(),
                        message: e.to_string(),
                    }
                })?;
                Some(NestedSchema::Fields(fields))
            }
            (Some(value), Some(FieldType::List)) => {
                let item: FieldRule = serde_yaml::from_value(value).map_err(|e| {
                    SchemaError::InvalidNested {
                        field_type: "list".to_string(),
                        message: e.to_string(),
                    }
                })?;
                Some(NestedSchema::Item(Box::new(item)))
            }
            (Some(_), other) => {
                return Err(SchemaError::InvalidNested {
                    field_type: other.map_or("untyped", |t| t.as_str()).to_string(),
                    message: "'schema' only applies to dict and list fields".to_string(),
                })
            }
        };

        Ok(FieldRule {
            field_type,
            required: raw.required,
            nullable: raw.nullable,
            empty: raw.empty,
            default: raw.default,
            allowed: raw.allowed,
            min: raw.min,
            max: raw.max,
            coerce,
            schema,
            help_message: raw.help_message,
        })
    }
}

impl From<FieldRule> for RawFieldRule {
    fn from(rule: FieldRule) -> Self {
        let schema = rule.schema.map(|nested| match nested {
            NestedSchema::Fields(fields) => serde_yaml::to_value(fields).unwrap_or_default(),
            NestedSchema::Item(item) => serde_yaml::to_value(*item).unwrap_or_default(),
        });

        RawFieldRule {
            field_type: rule.field_type.map(|t| t.as_str().to_string()),
            required: rule.required,
            nullable: rule.nullable,
            empty: rule.empty,
            default: rule.default,
            allowed: rule.allowed,
            min: rule.min,
            max: rule.max,
            coerce: rule.coerce.map(|c| c.as_str().to_string()),
            schema,
            help_message: rule.help_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATOR_SCHEMA: &str = r#"
project_id:
  type: string
  required: true
  help_message: GCP project to deploy into
memory:
  type: integer
  coerce: int
  default: 512
  help_message: Memory in MiB
env:
  type: list
  schema:
    type: dict
    schema:
      name:
        type: string
        help_message: Variable name
      value:
        type: string
"#;

    #[test]
    fn test_parse_nested_schema() {
        let schema = Schema::from_yaml_str(OPERATOR_SCHEMA).unwrap();
        assert_eq!(schema.len(), 3);

        let memory = schema.get("memory").unwrap();
        assert_eq!(memory.field_type, Some(FieldType::Integer));
        assert_eq!(memory.coerce, Some(Coercion::Integer));
        assert_eq!(memory.default, Some(Value::from(512)));

        let env = schema.get("env").unwrap();
        match &env.schema {
            Some(NestedSchema::Item(item)) => match &item.schema {
                Some(NestedSchema::Fields(fields)) => {
                    assert!(fields.contains("name"));
                    assert!(fields.get("name").unwrap().help_message.is_some());
                }
                other => panic!("expected dict item schema, got {:?}", other),
            },
            other => panic!("expected list item rule, got {:?}", other),
        }
        assert!(schema.contains_help_message());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = Schema::from_yaml_str("region:\n  type: text\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Unknown field type 'text'"), "{}", err);
    }

    #[test]
    fn test_schema_on_scalar_is_rejected() {
        let result = Schema::from_yaml_str(
            "region:\n  type: string\n  schema:\n    type: string\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_rule_is_rejected() {
        let result = Schema::from_yaml_str("region:\n  type: string\n  regex: '^us'\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_keeps_rules() {
        let schema = Schema::from_yaml_str(OPERATOR_SCHEMA).unwrap();
        let yaml = serde_yaml::to_string(&schema).unwrap();
        let reparsed = Schema::from_yaml_str(&yaml).unwrap();
        assert_eq!(schema, reparsed);
        assert!(yaml.contains("help_message"));
        assert!(!yaml.contains("nullable"));
    }

    #[test]
    fn test_field_type_matches() {
        assert!(FieldType::Integer.matches(&Value::from(3)));
        assert!(!FieldType::Integer.matches(&Value::from(3.5)));
        assert!(FieldType::Number.matches(&Value::from(3.5)));
        assert!(FieldType::Number.matches(&Value::from(3)));
        assert!(FieldType::Float.matches(&Value::from(3)));
        assert!(FieldType::Float.matches(&Value::from(3.5)));
        assert!(!FieldType::Float.matches(&Value::Bool(true)));
        assert!(!FieldType::String.matches(&Value::Null));
    }
}
