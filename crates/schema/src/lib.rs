//! Deployment config schemas
//!
//! Schemas are plain data: a fixed base schema describing the
//! `api_version` / `metadata` / `spec` document, and a leaf schema supplied by
//! each operator. This crate merges the two, strips documentation-only rules
//! and validates documents against the result.

pub mod merge;
pub mod report;
pub mod rule;
pub mod validator;

pub use merge::{
    base_schema, common_spec_schema, help_messages, merge_operator_schema, remove_help_message,
    COMMON_SPEC_FIELDS,
};
pub use report::{ValidationIssue, ValidationReport};
pub use rule::{Coercion, FieldRule, FieldType, NestedSchema, Schema};
pub use validator::Validator;
