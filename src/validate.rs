//! Validation collaborator. The form compiles its schema once per
//! initialization and validates after every formatting pass; errors come
//! back as pointer/message pairs and are never raised.
use serde::Serialize;
use serde_json::Value;

use crate::error::{FormError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Indexed data pointer of the failing value (`""` for the root).
    pub pointer: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self { valid: true, errors: Vec::new() }
    }
}

impl ValidationReport {
    pub fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self { valid: errors.is_empty(), errors }
    }
}

pub trait Validator {
    fn compile(&self, schema: &Value) -> Result<Box<dyn CompiledValidator>>;
}

pub trait CompiledValidator {
    fn validate(&self, data: &Value) -> ValidationReport;
}

/// Draft-07 validation through the `jsonschema` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSchemaValidator;

struct CompiledJsonSchema(jsonschema::Validator);

impl Validator for JsonSchemaValidator {
    fn compile(&self, schema: &Value) -> Result<Box<dyn CompiledValidator>> {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft7);
        let validator = opts.build(schema).map_err(|e| FormError::ValidatorBuild(e.to_string()))?;
        Ok(Box::new(CompiledJsonSchema(validator)))
    }
}

impl CompiledValidator for CompiledJsonSchema {
    fn validate(&self, data: &Value) -> ValidationReport {
        let errors = self
            .0
            .iter_errors(data)
            .map(|e| ValidationIssue { pointer: e.instance_path.to_string(), message: e.to_string() })
            .collect();
        ValidationReport::from_issues(errors)
    }
}

/// Accepts everything. For callers that validate elsewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopValidator;

struct AcceptAll;

impl Validator for NoopValidator {
    fn compile(&self, _schema: &Value) -> Result<Box<dyn CompiledValidator>> {
        Ok(Box::new(AcceptAll))
    }
}

impl CompiledValidator for AcceptAll {
    fn validate(&self, _data: &Value) -> ValidationReport {
        ValidationReport::default()
    }
}
