//! JSON Schema validation of the summary document.
//!
//! The schema is embedded at compile time from
//! `schemas/summary-document.json` (Draft 7). The pipeline validates every
//! document before writing it, and `salescube check` validates documents
//! that already exist on disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use salescube::validation::validate;
//!
//! let schema = json!({
//!     "type": "object",
//!     "required": ["rev"],
//!     "properties": { "rev": { "type": "number" } }
//! });
//!
//! assert!(validate(&schema, &json!({ "rev": 10.5 })).is_ok());
//! assert!(validate(&schema, &json!({ "qty": 3 })).is_err());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static SUMMARY_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/summary-document.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Boolean form of [`validate`].
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate against the summary document schema.
pub fn validate_summary_document(data: &Value) -> Result<(), Vec<String>> {
    validate(&SUMMARY_SCHEMA, data)
}

/// Quick check against the summary document schema.
pub fn is_valid_summary_document(data: &Value) -> bool {
    is_valid(&SUMMARY_SCHEMA, data)
}
