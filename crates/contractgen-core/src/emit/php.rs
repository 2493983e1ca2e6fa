//! PHP type mapping shared by every emitter.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::contract::{ContractSet, Parameter, ParameterLocation};
use crate::schema::{PrimitiveKind, SchemaModel, SchemaType};
use crate::security::SecuritySchemeDefinition;
use crate::utils::{php_string, php_variable, to_upper_camel_case};

/// Maps schemas to PHP type declarations.
///
/// Named object and enum schemas become classes in `model_namespace`;
/// named aliases of anything else are followed.
#[derive(Debug, Clone)]
pub struct PhpTypeMapper<'a> {
    schemas: &'a SchemaModel,
    model_namespace: String,
}

impl<'a> PhpTypeMapper<'a> {
    pub fn new(schemas: &'a SchemaModel, model_namespace: impl Into<String>) -> Self {
        Self {
            schemas,
            model_namespace: model_namespace.into(),
        }
    }

    pub fn model_namespace(&self) -> &str {
        &self.model_namespace
    }

    /// Fully qualified class of a named model, if `name` is one
    pub fn model_class(&self, name: &str) -> Option<String> {
        match self.schemas.get(name)? {
            SchemaType::Object(_) | SchemaType::Enum { .. } => Some(format!(
                "\\{}\\{}",
                self.model_namespace,
                to_upper_camel_case(name)
            )),
            _ => None,
        }
    }

    /// Model class a value of `schema` is hydrated into, with the factory
    /// method to call: `fromArray` for objects, `from` for backed enums
    pub fn hydrated_class(&self, schema: &SchemaType) -> Option<(String, &'static str)> {
        let name = match schema {
            SchemaType::Reference { name } => name,
            SchemaType::Union { variants } => {
                let rest: Vec<&SchemaType> = variants.iter().filter(|v| !is_null(v)).collect();
                match rest.as_slice() {
                    [SchemaType::Reference { name }] => name,
                    _ => return None,
                }
            }
            _ => return None,
        };
        let converter = match self.schemas.get(name)? {
            SchemaType::Object(_) => "fromArray",
            SchemaType::Enum { .. } => "from",
            _ => return None,
        };
        Some((self.model_class(name)?, converter))
    }

    /// Native type declaration without the nullable marker
    pub fn hint(&self, schema: &SchemaType) -> String {
        self.hint_inner(schema, &mut BTreeSet::new())
    }

    fn hint_inner(&self, schema: &SchemaType, seen: &mut BTreeSet<String>) -> String {
        match schema {
            SchemaType::Primitive(p) => primitive_hint(p.kind).to_string(),
            SchemaType::Enum { .. } => "string".to_string(),
            SchemaType::Object(_) | SchemaType::Array { .. } => "array".to_string(),
            SchemaType::Union { variants } => {
                let rest: Vec<&SchemaType> = variants
                    .iter()
                    .filter(|v| !is_null(v))
                    .collect();
                match rest.as_slice() {
                    [single] => self.hint_inner(single, seen),
                    _ => "mixed".to_string(),
                }
            }
            SchemaType::Reference { name } => {
                if let Some(class) = self.model_class(name) {
                    return class;
                }
                if !seen.insert(name.clone()) {
                    return "mixed".to_string();
                }
                match self.schemas.get(name) {
                    Some(target) => self.hint_inner(target, seen),
                    None => "mixed".to_string(),
                }
            }
        }
    }

    /// Declaration including `?` for nullable schemas
    pub fn declaration(&self, schema: &SchemaType, nullable: bool) -> String {
        let hint = self.hint(schema);
        if (nullable || schema.is_nullable()) && hint != "mixed" && hint != "null" {
            format!("?{hint}")
        } else {
            hint
        }
    }

    /// Docblock type, which can say more than the declaration (`Pet[]`)
    pub fn doc(&self, schema: &SchemaType) -> String {
        self.doc_inner(schema, &mut BTreeSet::new())
    }

    fn doc_inner(&self, schema: &SchemaType, seen: &mut BTreeSet<String>) -> String {
        match schema {
            SchemaType::Array { element } => format!("{}[]", self.doc_inner(element, seen)),
            SchemaType::Object(_) => "array<string, mixed>".to_string(),
            SchemaType::Union { variants } => variants
                .iter()
                .map(|v| self.doc_inner(v, seen))
                .collect::<Vec<_>>()
                .join("|"),
            SchemaType::Reference { name } => {
                if let Some(class) = self.model_class(name) {
                    return class;
                }
                if !seen.insert(name.clone()) {
                    return "mixed".to_string();
                }
                match self.schemas.get(name) {
                    Some(target) => self.doc_inner(target, seen),
                    None => "mixed".to_string(),
                }
            }
            other => self.hint(other),
        }
    }
}

fn primitive_hint(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::String => "string",
        PrimitiveKind::Integer => "int",
        PrimitiveKind::Number => "float",
        PrimitiveKind::Boolean => "bool",
        PrimitiveKind::Null => "null",
    }
}

fn is_null(schema: &SchemaType) -> bool {
    matches!(schema, SchemaType::Primitive(p) if p.kind == PrimitiveKind::Null)
}

/// Render a JSON value as a PHP literal
pub fn php_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => php_string(s),
        JsonValue::Array(items) => {
            let items: Vec<String> = items.iter().map(php_literal).collect();
            format!("[{}]", items.join(", "))
        }
        JsonValue::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{} => {}", php_string(k), php_literal(v)))
                .collect();
            format!("[{}]", entries.join(", "))
        }
    }
}

/// A handler argument derived from one contract parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerArgument {
    /// Wire name (`X-Request-Id`, `limit`)
    pub name: String,
    /// PHP variable without `$`
    pub variable: String,
    pub location: ParameterLocation,
    /// Declaration including the nullable marker
    pub php_type: String,
    pub doc_type: String,
    /// Static factory hydrating the argument (`\App\Models\Pet::fromArray`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_factory: Option<String>,
    pub required: bool,
    pub nullable: bool,
    /// PHP literal of the default, when the parameter has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Whether the default may appear in the signature (every later
    /// argument also has one)
    pub signature_default: bool,
}

/// Arguments for every parameter, in contract order
pub fn handler_arguments(parameters: &[Parameter], mapper: &PhpTypeMapper<'_>) -> Vec<HandlerArgument> {
    let mut used = BTreeSet::new();
    let mut arguments: Vec<HandlerArgument> = parameters
        .iter()
        .map(|p| {
            let nullable = !p.required || p.schema.is_nullable();
            HandlerArgument {
                name: p.name.clone(),
                variable: unique_variable(&p.name, p.location, &mut used),
                location: p.location,
                php_type: mapper.declaration(&p.schema, nullable),
                doc_type: mapper.doc(&p.schema),
                model_factory: mapper
                    .hydrated_class(&p.schema)
                    .map(|(class, converter)| format!("{class}::{converter}")),
                required: p.required,
                nullable,
                default: p.default.as_ref().map(php_literal),
                signature_default: false,
            }
        })
        .collect();

    let mut trailing = true;
    for argument in arguments.iter_mut().rev() {
        trailing = trailing && argument.default.is_some();
        argument.signature_default = trailing;
    }
    arguments
}

/// PHP variable for a parameter; a taken name gets its location appended
/// (`idQuery`), then a counter
fn unique_variable(name: &str, location: ParameterLocation, used: &mut BTreeSet<String>) -> String {
    let mut variable = php_variable(name);
    if used.contains(&variable) {
        variable = format!("{variable}{}", to_upper_camel_case(location.as_str()));
    }
    let base = variable.clone();
    let mut n = 2;
    while !used.insert(variable.clone()) {
        variable = format!("{base}{n}");
        n += 1;
    }
    variable
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelField {
    pub name: String,
    pub property: String,
    pub php_type: String,
    pub doc_type: String,
    pub required: bool,
    pub nullable: bool,
    /// Model class and its factory (`fromArray` or `from`) for nested models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converter: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumCase {
    pub name: String,
    pub value: String,
    /// `value` as a PHP string literal
    pub literal: String,
}

/// A named object or enum schema rendered as a PHP class or enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelBinding {
    pub name: String,
    pub class_name: String,
    /// `object` or `enum`
    pub kind: &'static str,
    pub fields: Vec<ModelField>,
    pub cases: Vec<EnumCase>,
}

/// Every named object and enum schema, in name order
pub fn model_bindings(schemas: &SchemaModel, mapper: &PhpTypeMapper<'_>) -> Vec<ModelBinding> {
    schemas
        .iter()
        .filter_map(|(name, schema)| match schema {
            SchemaType::Object(object) => Some(ModelBinding {
                name: name.to_string(),
                class_name: to_upper_camel_case(name),
                kind: "object",
                fields: object
                    .fields
                    .iter()
                    .map(|f| {
                        let required = object.is_required(&f.name);
                        let nullable = !required || f.schema.is_nullable();
                        let hydrated = mapper.hydrated_class(&f.schema);
                        ModelField {
                            name: f.name.clone(),
                            property: php_variable(&f.name),
                            php_type: mapper.declaration(&f.schema, nullable),
                            doc_type: mapper.doc(&f.schema),
                            required,
                            nullable,
                            converter: hydrated.as_ref().map(|(_, converter)| *converter),
                            class: hydrated.map(|(class, _)| class),
                        }
                    })
                    .collect(),
                cases: Vec::new(),
            }),
            SchemaType::Enum { values } => Some(ModelBinding {
                name: name.to_string(),
                class_name: to_upper_camel_case(name),
                kind: "enum",
                fields: Vec::new(),
                cases: enum_cases(values),
            }),
            _ => None,
        })
        .collect()
}

fn enum_cases(values: &[String]) -> Vec<EnumCase> {
    let mut used = BTreeSet::new();
    values
        .iter()
        .map(|value| {
            let mut name = to_upper_camel_case(value);
            if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
                name = format!("Value{name}");
            }
            let base = name.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{base}{n}");
                n += 1;
            }
            EnumCase {
                name,
                value: value.clone(),
                literal: php_string(value),
            }
        })
        .collect()
}

/// A declared security scheme, as the scheme templates see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemeBinding {
    pub name: String,
    pub class_base: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_location: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn scheme_bindings(contracts: &ContractSet) -> Vec<SchemeBinding> {
    contracts
        .security_schemes()
        .iter()
        .map(|(name, definition)| {
            let mut binding = SchemeBinding {
                name: name.clone(),
                class_base: to_upper_camel_case(name),
                kind: definition.kind().as_str(),
                api_key_location: None,
                api_key_name: None,
                bearer_format: None,
                scopes: Vec::new(),
                description: definition.description().map(str::to_string),
            };
            match definition {
                SecuritySchemeDefinition::ApiKey { location, name, .. } => {
                    binding.api_key_location = Some(location.as_str());
                    binding.api_key_name = Some(name.clone());
                }
                SecuritySchemeDefinition::Http { bearer_format, .. } => {
                    binding.bearer_format = bearer_format.clone();
                }
                SecuritySchemeDefinition::Oauth2 { scopes, .. } => {
                    binding.scopes = scopes.keys().cloned().collect();
                }
            }
            binding
        })
        .collect()
}
