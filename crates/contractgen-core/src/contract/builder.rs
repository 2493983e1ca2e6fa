//! Builds [`OperationContract`]s from a normalized description.
//!
//! Operations are independent of each other once the schema model exists, so
//! they are built in parallel. Every violation is collected; the caller gets
//! either the complete contract set or the complete list of problems.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::{ContractSet, OperationContract, Parameter, ParameterLocation};
use crate::description::{ApiDescription, RawOperation};
use crate::error::{ContractError, ContractViolations};
use crate::responses::{resolve_responses, DeclaredResponse, OperationShape};
use crate::schema::{SchemaModel, SchemaType};
use crate::security::{SecurityResolver, SecuritySchemeDefinition, SecuritySemantics};
use crate::utils::{to_snake_case, to_upper_camel_case};

/// `{id}` or `{id:[0-9]+}`; captures the placeholder name
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}:]+)(?::[^}]*)?\}").expect("placeholder pattern is valid"));

/// Separators and quotes of the generated guard attachments
const RESERVED: &[char] = &[',', '+', '=', ';', '\'', '"', '\\'];
const RESERVED_LIST: &str = ", + = ; ' \" \\";

/// Knobs that change what gets built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    #[serde(default)]
    pub security_semantics: SecuritySemantics,
    /// Only build these operationIds (all when empty)
    #[serde(default)]
    pub include_operations: Vec<String>,
    /// Skip these operationIds
    #[serde(default)]
    pub exclude_operations: Vec<String>,
}

impl BuildOptions {
    fn selects(&self, operation_id: &str) -> bool {
        let included = self.include_operations.is_empty()
            || self.include_operations.iter().any(|id| id == operation_id);
        included && !self.exclude_operations.iter().any(|id| id == operation_id)
    }
}

/// Turns one description into a [`ContractSet`]
#[derive(Debug)]
pub struct ContractBuilder<'a> {
    description: &'a ApiDescription,
    schemas: SchemaModel,
    options: BuildOptions,
}

impl<'a> ContractBuilder<'a> {
    /// Prepare a builder; fails when a named schema references a missing one
    pub fn new(
        description: &'a ApiDescription,
        options: BuildOptions,
    ) -> Result<Self, ContractViolations> {
        let schemas = SchemaModel::new(description.schema_types())?;
        Ok(Self {
            description,
            schemas,
            options,
        })
    }

    pub fn schemas(&self) -> &SchemaModel {
        &self.schemas
    }

    /// Build every selected operation
    pub fn build(self) -> Result<ContractSet, ContractViolations> {
        let operations = &self.description.operations;
        let mut errors = check_operation_ids(operations);

        let selected: Vec<&RawOperation> = operations
            .iter()
            .filter(|op| !op.operation_id.trim().is_empty())
            .filter(|op| self.options.selects(&op.operation_id))
            .collect();
        log::debug!(
            "building {} of {} operation(s)",
            selected.len(),
            operations.len()
        );

        // par_iter keeps the input order in the collected Vec
        let built: Vec<Result<OperationContract, Vec<ContractError>>> = selected
            .par_iter()
            .map(|op| self.build_operation(op))
            .collect();

        let mut contracts = Vec::with_capacity(built.len());
        for result in built {
            match result {
                Ok(contract) => contracts.push(contract),
                Err(errs) => errors.extend(errs),
            }
        }

        errors.extend(check_class_names(
            "operation",
            contracts.iter().map(|c| c.operation_id.as_str()),
        ));
        errors.extend(check_class_names(
            "schema",
            self.schemas
                .iter()
                .filter(|(_, schema)| matches!(schema, SchemaType::Object(_) | SchemaType::Enum { .. }))
                .map(|(name, _)| name),
        ));
        errors.extend(check_class_names(
            "security scheme",
            self.description.security_schemes.keys().map(String::as_str),
        ));
        errors.extend(check_guard_tokens(
            &self.description.security_schemes,
            &contracts,
        ));

        if !errors.is_empty() {
            return Err(ContractViolations(errors));
        }

        let security_schemes = self
            .description
            .security_schemes
            .iter()
            .map(|(name, def)| (name.clone(), def.clone()))
            .collect();
        log::info!("built {} contract(s)", contracts.len());
        Ok(ContractSet::new(contracts, self.schemas, security_schemes))
    }

    /// Build one operation, collecting every violation it has
    pub fn build_operation(
        &self,
        op: &RawOperation,
    ) -> Result<OperationContract, Vec<ContractError>> {
        let operation_id = op.operation_id.trim().to_string();
        let mut errors = Vec::new();

        let parameters = self.collect_parameters(&operation_id, op, &mut errors);
        check_route(&operation_id, &op.path, &parameters, &mut errors);

        let declared: Vec<DeclaredResponse> = op
            .responses
            .iter()
            .map(|(status, response)| DeclaredResponse {
                status: status.clone(),
                description: response.description.clone(),
                payload_schema: response.schema.as_ref().map(|s| s.to_schema()),
            })
            .collect();

        let mut referenced: Vec<&SchemaType> = parameters.iter().map(|p| &p.schema).collect();
        referenced.extend(declared.iter().filter_map(|d| d.payload_schema.as_ref()));
        let mut missing = BTreeSet::new();
        for schema in referenced {
            missing.extend(self.schemas.unresolved_references(schema));
        }
        errors.extend(missing.into_iter().map(|name| ContractError::UnresolvedReference {
            operation_id: operation_id.clone(),
            name,
        }));

        let resolver = SecurityResolver::new(
            &self.description.security_schemes,
            &self.description.security,
            self.options.security_semantics,
        );
        let security = match resolver.resolve(&operation_id, op.security.as_deref()) {
            Ok(security) => Some(security),
            Err(errs) => {
                errors.extend(errs);
                None
            }
        };

        let shape = OperationShape {
            has_path_parameters: parameters
                .iter()
                .any(|p| p.location == ParameterLocation::Path),
            has_validated_input: parameters
                .iter()
                .any(|p| p.location != ParameterLocation::Path),
            requires_authentication: security.as_ref().is_some_and(|s| !s.is_public()),
            requires_scopes: security.as_ref().is_some_and(|s| s.requires_scopes()),
        };
        let responses = match resolve_responses(&operation_id, &declared, shape) {
            Ok(responses) => Some(responses),
            Err(errs) => {
                errors.extend(errs);
                None
            }
        };

        match (security, responses) {
            (Some(security), Some(responses)) if errors.is_empty() => Ok(OperationContract {
                operation_id,
                http_method: op.method,
                route_template: op.path.clone(),
                tags: op.tags.clone(),
                parameters,
                responses,
                security,
                summary: op.summary.clone(),
                description: op.description.clone(),
            }),
            _ => Err(errors),
        }
    }

    fn collect_parameters(
        &self,
        operation_id: &str,
        op: &RawOperation,
        errors: &mut Vec<ContractError>,
    ) -> Vec<Parameter> {
        let mut parameters: Vec<Parameter> = op
            .parameters
            .iter()
            .map(|raw| Parameter {
                name: raw.name.clone(),
                location: raw.location,
                schema: raw.schema.to_schema(),
                required: raw.required || raw.location == ParameterLocation::Path,
                default: raw.default.clone(),
                description: raw.description.clone(),
            })
            .collect();

        if let Some(body) = &op.request_body {
            let schema = body.schema.to_schema();
            let name = body
                .name
                .clone()
                .unwrap_or_else(|| body_name(&schema));
            parameters.push(Parameter {
                name,
                location: ParameterLocation::Body,
                schema,
                required: body.required,
                default: None,
                description: body.description.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        for p in &parameters {
            if !seen.insert((p.location, p.name.as_str()))
                && reported.insert((p.location, p.name.as_str()))
            {
                errors.push(ContractError::DuplicateParameter {
                    operation_id: operation_id.to_string(),
                    name: p.name.clone(),
                    location: p.location,
                });
            }
        }

        let bodies: Vec<String> = parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Body)
            .map(|p| p.name.clone())
            .collect();
        if bodies.len() > 1 {
            errors.push(ContractError::MultipleBodyParameters {
                operation_id: operation_id.to_string(),
                names: bodies,
            });
        }

        // stable: declaration order survives inside each location
        parameters.sort_by_key(|p| p.location);
        check_input_names(operation_id, &parameters, &self.schemas, errors);

        for p in parameters.iter_mut() {
            let defaultable = matches!(
                p.location,
                ParameterLocation::Query | ParameterLocation::Header
            );
            if defaultable && !p.required && p.default.is_none() {
                p.default = Some(self.schemas.default_value(&p.schema));
            }
        }
        parameters
    }
}

/// Convenience wrapper: prepare a builder and build everything
pub fn build_contracts(
    description: &ApiDescription,
    options: BuildOptions,
) -> Result<ContractSet, ContractViolations> {
    ContractBuilder::new(description, options)?.build()
}

/// Body argument name: the referenced schema in snake_case, else `body`
fn body_name(schema: &SchemaType) -> String {
    match schema {
        SchemaType::Reference { name } => to_snake_case(name),
        _ => "body".to_string(),
    }
}

fn check_operation_ids(operations: &[RawOperation]) -> Vec<ContractError> {
    let mut errors = Vec::new();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for op in operations {
        let id = op.operation_id.trim();
        if id.is_empty() {
            errors.push(ContractError::MissingOperationId {
                method: op.method.as_upper(),
                path: op.path.clone(),
            });
        } else {
            *counts.entry(id).or_default() += 1;
        }
    }
    errors.extend(
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(id, _)| ContractError::DuplicateOperationId {
                operation_id: id.to_string(),
            }),
    );
    errors
}

/// Query and header names and the fields of a flattened object body are
/// validated as one input map, so a name may come from one location only
fn check_input_names(
    operation_id: &str,
    parameters: &[Parameter],
    schemas: &SchemaModel,
    errors: &mut Vec<ContractError>,
) {
    let mut seen: BTreeMap<String, ParameterLocation> = BTreeMap::new();
    for p in parameters {
        let names: Vec<String> = match p.location {
            ParameterLocation::Path => continue,
            ParameterLocation::Query | ParameterLocation::Header => vec![p.name.clone()],
            ParameterLocation::Body => match schemas.resolve(&p.schema) {
                Some(SchemaType::Object(object)) => {
                    object.fields.iter().map(|f| f.name.clone()).collect()
                }
                _ => continue,
            },
        };
        for name in names {
            match seen.get(&name) {
                Some(&first) if first != p.location => {
                    errors.push(ContractError::ConflictingInputName {
                        operation_id: operation_id.to_string(),
                        name,
                        first,
                        second: p.location,
                    })
                }
                Some(_) => {}
                None => {
                    seen.insert(name, p.location);
                }
            }
        }
    }
}

/// Names that become the same PHP class name would overwrite each other's files
fn check_class_names<'n>(
    kind: &'static str,
    names: impl IntoIterator<Item = &'n str>,
) -> Vec<ContractError> {
    // a set, so exact duplicates stay reported as duplicates only
    let mut classes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for name in names {
        classes
            .entry(to_upper_camel_case(name))
            .or_default()
            .insert(name.to_string());
    }
    classes
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(class, names)| ContractError::ClassNameCollision {
            kind,
            class,
            names: names.into_iter().collect(),
        })
        .collect()
}

/// Scheme names and scopes are embedded in guard attachments as is
fn check_guard_tokens(
    schemes: &BTreeMap<String, SecuritySchemeDefinition>,
    contracts: &[OperationContract],
) -> Vec<ContractError> {
    let mut values: BTreeSet<(String, String)> = BTreeSet::new();
    for (name, definition) in schemes {
        values.insert((name.clone(), name.clone()));
        if let SecuritySchemeDefinition::Oauth2 { scopes, .. } = definition {
            values.extend(scopes.keys().map(|scope| (name.clone(), scope.clone())));
        }
    }
    let required = contracts
        .iter()
        .flat_map(|c| c.security.alternatives.iter())
        .flat_map(|group| group.schemes.iter());
    for scheme in required {
        values.extend(
            scheme
                .required_scopes
                .iter()
                .map(|scope| (scheme.name.clone(), scope.clone())),
        );
    }
    values
        .into_iter()
        .filter(|(_, value)| value.contains(RESERVED))
        .map(|(scheme, value)| ContractError::ReservedCharacter {
            scheme,
            value,
            reserved: RESERVED_LIST,
        })
        .collect()
}

/// Placeholder names of a route template, in order
pub(crate) fn route_placeholders(route: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(route)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Strip framework constraint syntax from placeholders: `{id:[0-9]+}` → `{id}`
pub fn normalize_route(route: &str) -> String {
    PLACEHOLDER
        .replace_all(route, |caps: &regex::Captures<'_>| format!("{{{}}}", caps[1].trim()))
        .into_owned()
}

fn check_route(
    operation_id: &str,
    route: &str,
    parameters: &[Parameter],
    errors: &mut Vec<ContractError>,
) {
    let placeholders = route_placeholders(route);
    let path_params: Vec<&str> = parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Path)
        .map(|p| p.name.as_str())
        .collect();

    for name in &placeholders {
        if !path_params.contains(&name.as_str()) {
            errors.push(ContractError::UndeclaredPathParameter {
                operation_id: operation_id.to_string(),
                name: name.clone(),
            });
        }
    }
    for name in path_params {
        if !placeholders.iter().any(|p| p == name) {
            errors.push(ContractError::PathParameterNotInRoute {
                operation_id: operation_id.to_string(),
                name: name.to_string(),
            });
        }
    }
}
