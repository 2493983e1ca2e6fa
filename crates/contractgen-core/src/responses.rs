//! Response variant resolution.
//!
//! Every operation ends up with a closed set of response variants, one per
//! status code. Declared responses come from the description; the error
//! responses every generated server can produce (validation, authentication,
//! authorization, lookup and generic failures) are synthesized from the
//! operation's shape when the description does not declare them.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ContractError;
use crate::schema::{builtin, SchemaType};

/// Status code of the default (catch-all) variant
pub const DEFAULT_STATUS: u16 = 500;

/// Where a variant came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantOrigin {
    Declared,
    Synthesized,
}

/// One (status code, payload) pair an operation can answer with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseVariant {
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_schema: Option<SchemaType>,
    pub is_default: bool,
    pub origin: VariantOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResponseVariant {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    fn synthesized(status_code: u16, schema: &str, description: &str) -> Self {
        Self {
            status_code,
            payload_schema: Some(SchemaType::reference(schema)),
            is_default: status_code == DEFAULT_STATUS,
            origin: VariantOrigin::Synthesized,
            description: Some(description.to_string()),
        }
    }
}

/// The closed set of variants of one operation, ordered by status code
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ResponseSet {
    variants: Vec<ResponseVariant>,
}

impl ResponseSet {
    pub fn variants(&self) -> &[ResponseVariant] {
        &self.variants
    }

    pub fn get(&self, status_code: u16) -> Option<&ResponseVariant> {
        self.variants.iter().find(|v| v.status_code == status_code)
    }

    pub fn declared(&self) -> impl Iterator<Item = &ResponseVariant> {
        self.variants
            .iter()
            .filter(|v| v.origin == VariantOrigin::Declared)
    }

    pub fn synthesized(&self) -> impl Iterator<Item = &ResponseVariant> {
        self.variants
            .iter()
            .filter(|v| v.origin == VariantOrigin::Synthesized)
    }

    pub fn success(&self) -> impl Iterator<Item = &ResponseVariant> {
        self.variants.iter().filter(|v| v.is_success())
    }

    pub fn default_variant(&self) -> Option<&ResponseVariant> {
        self.variants.iter().find(|v| v.is_default)
    }

    pub fn status_codes(&self) -> Vec<u16> {
        self.variants.iter().map(|v| v.status_code).collect()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// A response as written in the description, before resolution
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredResponse {
    /// `"200"`, `"404"`, `"default"`, ...
    pub status: String,
    pub description: Option<String>,
    pub payload_schema: Option<SchemaType>,
}

/// Operation facts the synthesis conventions depend on
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationShape {
    pub has_path_parameters: bool,
    /// Any query, header or body parameter
    pub has_validated_input: bool,
    pub requires_authentication: bool,
    pub requires_scopes: bool,
}

/// Resolve the full variant set of one operation
pub fn resolve_responses(
    operation_id: &str,
    declared: &[DeclaredResponse],
    shape: OperationShape,
) -> Result<ResponseSet, Vec<ContractError>> {
    let mut errors = Vec::new();
    let mut by_status: BTreeMap<u16, ResponseVariant> = BTreeMap::new();
    let mut declared_default: Option<ResponseVariant> = None;

    for response in declared {
        let key = response.status.trim();
        if key.eq_ignore_ascii_case("default") {
            declared_default = Some(ResponseVariant {
                status_code: DEFAULT_STATUS,
                payload_schema: response.payload_schema.clone(),
                is_default: true,
                origin: VariantOrigin::Declared,
                description: response.description.clone(),
            });
            continue;
        }
        match key.parse::<u16>() {
            Ok(code) if (100..=599).contains(&code) => {
                by_status.insert(
                    code,
                    ResponseVariant {
                        status_code: code,
                        payload_schema: response.payload_schema.clone(),
                        is_default: code == DEFAULT_STATUS,
                        origin: VariantOrigin::Declared,
                        description: response.description.clone(),
                    },
                );
            }
            _ => errors.push(ContractError::InvalidStatusCode {
                operation_id: operation_id.to_string(),
                status: response.status.clone(),
            }),
        }
    }

    if let Some(default) = declared_default {
        if by_status.contains_key(&DEFAULT_STATUS) {
            log::warn!(
                "{operation_id}: both 'default' and '500' responses declared, keeping '500'"
            );
        } else {
            by_status.insert(DEFAULT_STATUS, default);
        }
    }

    if !by_status.keys().any(|code| (200..300).contains(code)) {
        errors.push(ContractError::NoSuccessVariant {
            operation_id: operation_id.to_string(),
        });
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    for variant in synthesized_variants(shape) {
        by_status.entry(variant.status_code).or_insert(variant);
    }

    Ok(ResponseSet {
        variants: by_status.into_values().collect(),
    })
}

fn synthesized_variants(shape: OperationShape) -> Vec<ResponseVariant> {
    let mut out = Vec::with_capacity(5);
    if shape.has_validated_input {
        out.push(ResponseVariant::synthesized(
            422,
            builtin::VALIDATION_ERROR,
            "Validation failed",
        ));
    }
    if shape.requires_authentication {
        out.push(ResponseVariant::synthesized(
            401,
            builtin::UNAUTHORIZED_ERROR,
            "Authentication required",
        ));
    }
    if shape.requires_scopes {
        out.push(ResponseVariant::synthesized(
            403,
            builtin::FORBIDDEN_ERROR,
            "Insufficient scope",
        ));
    }
    if shape.has_path_parameters {
        out.push(ResponseVariant::synthesized(
            404,
            builtin::NOT_FOUND_ERROR,
            "Resource not found",
        ));
    }
    out.push(ResponseVariant::synthesized(
        DEFAULT_STATUS,
        builtin::GENERIC_ERROR,
        "Unexpected error",
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(status: &str, schema: Option<&str>) -> DeclaredResponse {
        DeclaredResponse {
            status: status.to_string(),
            description: None,
            payload_schema: schema.map(SchemaType::reference),
        }
    }

    #[test]
    fn synthesizes_conventional_errors() {
        let set = resolve_responses(
            "deletePet",
            &[declared("204", None)],
            OperationShape {
                has_path_parameters: true,
                requires_authentication: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(set.status_codes(), vec![204, 401, 404, 500]);
        assert_eq!(set.declared().count(), 1);
        let default = set.default_variant().unwrap();
        assert_eq!(default.status_code, 500);
        assert_eq!(default.origin, VariantOrigin::Synthesized);
    }

    #[test]
    fn declared_wins_over_synthesized() {
        let set = resolve_responses(
            "getPet",
            &[declared("200", Some("Pet")), declared("404", Some("Problem"))],
            OperationShape {
                has_path_parameters: true,
                ..Default::default()
            },
        )
        .unwrap();
        let not_found = set.get(404).unwrap();
        assert_eq!(not_found.origin, VariantOrigin::Declared);
        assert_eq!(
            not_found.payload_schema,
            Some(SchemaType::reference("Problem"))
        );
    }

    #[test]
    fn default_maps_to_500() {
        let set = resolve_responses(
            "findPets",
            &[declared("200", Some("Pets")), declared("default", Some("Error"))],
            OperationShape::default(),
        )
        .unwrap();
        assert_eq!(set.status_codes(), vec![200, 500]);
        let default = set.default_variant().unwrap();
        assert_eq!(default.origin, VariantOrigin::Declared);
        assert_eq!(default.payload_schema, Some(SchemaType::reference("Error")));
    }

    #[test]
    fn explicit_500_beats_default() {
        let set = resolve_responses(
            "findPets",
            &[
                declared("200", None),
                declared("500", Some("ServerError")),
                declared("default", Some("Error")),
            ],
            OperationShape::default(),
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        let default = set.default_variant().unwrap();
        assert_eq!(
            default.payload_schema,
            Some(SchemaType::reference("ServerError"))
        );
    }

    #[test]
    fn scopes_add_forbidden() {
        let set = resolve_responses(
            "putSquare",
            &[declared("200", None)],
            OperationShape {
                has_validated_input: true,
                requires_authentication: true,
                requires_scopes: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(set.status_codes(), vec![200, 401, 403, 422, 500]);
    }

    #[test]
    fn missing_success_fails() {
        let err = resolve_responses(
            "deletePet",
            &[declared("404", None)],
            OperationShape::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            vec![ContractError::NoSuccessVariant {
                operation_id: "deletePet".into()
            }]
        );
    }

    #[test]
    fn invalid_status_fails() {
        let err = resolve_responses(
            "getPet",
            &[declared("200", None), declared("2XX", None), declared("700", None)],
            OperationShape::default(),
        )
        .unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(matches!(
            &err[0],
            ContractError::InvalidStatusCode { status, .. } if status == "2XX"
        ));
    }

    #[test]
    fn exactly_one_default() {
        let set = resolve_responses(
            "getPet",
            &[declared("200", None), declared("500", None)],
            OperationShape {
                has_validated_input: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(set.variants().iter().filter(|v| v.is_default).count(), 1);
        assert_eq!(set.synthesized().count(), 1);
    }
}
