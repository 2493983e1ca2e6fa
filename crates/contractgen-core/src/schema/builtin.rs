//! Error payload schemas every generated server ships with.
//!
//! Synthesized response variants point at these by name, so the schema model
//! always contains them. A description may define a schema with the same name
//! to replace the builtin shape.

use std::collections::BTreeSet;

use super::{Field, ObjectType, SchemaType};

pub const VALIDATION_ERROR: &str = "ValidationError";
pub const VALIDATION_ISSUE: &str = "ValidationIssue";
pub const UNAUTHORIZED_ERROR: &str = "UnauthorizedError";
pub const FORBIDDEN_ERROR: &str = "ForbiddenError";
pub const NOT_FOUND_ERROR: &str = "NotFoundError";
pub const GENERIC_ERROR: &str = "GenericError";

fn object(fields: &[(&str, SchemaType)], required: &[&str]) -> SchemaType {
    SchemaType::Object(ObjectType {
        fields: fields
            .iter()
            .map(|(name, schema)| Field {
                name: (*name).to_string(),
                schema: schema.clone(),
            })
            .collect(),
        required: required.iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>(),
    })
}

fn message_only() -> SchemaType {
    object(&[("message", SchemaType::string())], &["message"])
}

/// All builtin schemas, in a stable order
pub fn error_schemas() -> Vec<(&'static str, SchemaType)> {
    vec![
        (
            VALIDATION_ERROR,
            object(
                &[
                    ("message", SchemaType::string()),
                    (
                        "errors",
                        SchemaType::array(SchemaType::reference(VALIDATION_ISSUE)),
                    ),
                ],
                &["message", "errors"],
            ),
        ),
        (
            VALIDATION_ISSUE,
            object(
                &[
                    ("field", SchemaType::string()),
                    ("message", SchemaType::string()),
                ],
                &["field", "message"],
            ),
        ),
        (UNAUTHORIZED_ERROR, message_only()),
        (FORBIDDEN_ERROR, message_only()),
        (NOT_FOUND_ERROR, message_only()),
        (
            GENERIC_ERROR,
            object(
                &[
                    ("code", SchemaType::integer()),
                    ("message", SchemaType::string()),
                ],
                &["code", "message"],
            ),
        ),
    ]
}
