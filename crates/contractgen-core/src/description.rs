//! Normalized API description loading.
//!
//! The generator does not read OpenAPI documents directly. It consumes a
//! normalized description (operations, named schemas, security schemes) that
//! an upstream tool has already flattened. This module deserializes that
//! description from JSON or YAML, from disk or over HTTP.
//!
//! # Examples
//!
//! ```no_run
//! use contractgen_core::description::ApiDescription;
//! use contractgen_core::error::Result;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let description = ApiDescription::from_file_or_url("petshop.yaml").await?;
//! println!("{} operations", description.operations.len());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::fs;

use crate::contract::{HttpMethod, ParameterLocation};
use crate::schema::{Field, ObjectType, Primitive, PrimitiveKind, SchemaType, StringFormat};
use crate::security::{SecurityRequirement, SecuritySchemeDefinition};
use crate::utils::to_upper_camel_case;

/// Title, version and target namespace of the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub title: String,
    #[serde(default)]
    pub version: String,
    /// PHP namespace root; derived from the title when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A schema as written in the description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSchema {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Typed(TypedSchema),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TypedSchema {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    Boolean,
    Null,
    Object {
        #[serde(default)]
        properties: Vec<RawField>,
        #[serde(default)]
        required: Vec<String>,
    },
    Enum {
        values: Vec<String>,
    },
    Array {
        items: Box<RawSchema>,
    },
    Union {
        variants: Vec<RawSchema>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    pub schema: RawSchema,
}

impl RawSchema {
    /// Convert into the normalized schema type.
    ///
    /// Formats that carry no validation meaning (`int64`, `float`, ...) are
    /// dropped.
    pub fn to_schema(&self) -> SchemaType {
        match self {
            Self::Ref { reference } => SchemaType::reference(strip_ref_prefix(reference)),
            Self::Typed(typed) => match typed {
                TypedSchema::String { format } => {
                    let primitive = match format.as_deref().and_then(string_format) {
                        Some(f) => Primitive::with_format(PrimitiveKind::String, f),
                        None => Primitive::new(PrimitiveKind::String),
                    };
                    SchemaType::Primitive(primitive)
                }
                TypedSchema::Integer { .. } => SchemaType::primitive(PrimitiveKind::Integer),
                TypedSchema::Number { .. } => SchemaType::primitive(PrimitiveKind::Number),
                TypedSchema::Boolean => SchemaType::primitive(PrimitiveKind::Boolean),
                TypedSchema::Null => SchemaType::primitive(PrimitiveKind::Null),
                TypedSchema::Object {
                    properties,
                    required,
                } => SchemaType::Object(ObjectType {
                    fields: properties
                        .iter()
                        .map(|f| Field {
                            name: f.name.clone(),
                            schema: f.schema.to_schema(),
                        })
                        .collect(),
                    required: required.iter().cloned().collect(),
                }),
                TypedSchema::Enum { values } => SchemaType::Enum {
                    values: values.clone(),
                },
                TypedSchema::Array { items } => SchemaType::array(items.to_schema()),
                TypedSchema::Union { variants } => SchemaType::Union {
                    variants: variants.iter().map(RawSchema::to_schema).collect(),
                },
            },
        }
    }
}

/// `#/components/schemas/Pet` and `Pet` both name `Pet`
fn strip_ref_prefix(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

fn string_format(format: &str) -> Option<StringFormat> {
    match format {
        "uuid" => Some(StringFormat::Uuid),
        "date" => Some(StringFormat::Date),
        "date-time" => Some(StringFormat::DateTime),
        "email" => Some(StringFormat::Email),
        "uri" | "url" => Some(StringFormat::Uri),
        other => {
            log::debug!("ignoring string format '{other}'");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    pub schema: RawSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequestBody {
    /// Handler argument name; derived from the schema when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub required: bool,
    pub schema: RawSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<RawSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperation {
    #[serde(default)]
    pub operation_id: String,
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<RawParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RawRequestBody>,
    #[serde(default)]
    pub responses: BTreeMap<String, RawResponse>,
    /// `None` inherits the description-level requirements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// A normalized API description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDescription {
    pub info: ApiInfo,
    #[serde(default)]
    pub schemas: BTreeMap<String, RawSchema>,
    #[serde(default)]
    pub security_schemes: BTreeMap<String, SecuritySchemeDefinition>,
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
    #[serde(default)]
    pub operations: Vec<RawOperation>,
}

impl ApiDescription {
    /// Load from a file path or an `http(s)://` URL
    pub async fn from_file_or_url<P: AsRef<str>>(location: P) -> crate::Result<Self> {
        let location = location.as_ref();
        if location.starts_with("http://") || location.starts_with("https://") {
            return Self::from_url(location).await;
        }
        Self::from_file(location).await
    }

    /// Load from a JSON or YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        Self::parse_content(&content).map_err(|e| {
            crate::Error::description(format!(
                "Failed to parse description at {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Fetch and parse a description served over HTTP
    pub async fn from_url(url: &str) -> crate::Result<Self> {
        let response = reqwest::get(url).await?;
        if !response.status().is_success() {
            return Err(crate::Error::description(format!(
                "Failed to fetch description from {}: HTTP {}",
                url,
                response.status()
            )));
        }
        let content = response.text().await?;
        Self::parse_content(&content).map_err(|e| {
            crate::Error::description(format!(
                "Failed to parse description from {}: {}",
                url, e
            ))
        })
    }

    /// Parse JSON, falling back to YAML
    pub fn parse_content(content: &str) -> Result<Self, String> {
        if let Ok(description) = serde_json::from_str(content) {
            return Ok(description);
        }
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    /// Named schemas converted to the normalized model
    pub fn schema_types(&self) -> BTreeMap<String, SchemaType> {
        self.schemas
            .iter()
            .map(|(name, raw)| (name.clone(), raw.to_schema()))
            .collect()
    }

    /// Namespace root for generated code
    pub fn namespace(&self) -> String {
        match &self.info.namespace {
            Some(ns) if !ns.trim().is_empty() => ns.trim().to_string(),
            _ => to_upper_camel_case(&self.info.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PETSHOP: &str = r##"
info: { title: petshop api, version: 1.0.0 }
schemas:
  Pet:
    type: object
    required: [id, name]
    properties:
      - { name: id, schema: { type: integer, format: int64 } }
      - { name: name, schema: { type: string } }
      - { name: tag, schema: { type: union, variants: [ { type: string }, { type: "null" } ] } }
      - { name: parent, schema: { $ref: "#/components/schemas/Pet" } }
securitySchemes:
  bearerAuth: { type: http, scheme: bearer }
security:
  - { bearerAuth: [] }
operations:
  - operationId: deletePet
    method: DELETE
    path: /pets/{id}
    parameters:
      - { name: id, in: path, required: true, schema: { type: integer } }
    responses:
      "204": { description: deleted }
"##;

    #[test]
    fn parses_yaml() {
        let description = ApiDescription::parse_content(PETSHOP).unwrap();
        assert_eq!(description.operations.len(), 1);
        let op = &description.operations[0];
        assert_eq!(op.method, HttpMethod::Delete);
        assert_eq!(op.parameters[0].location, ParameterLocation::Path);
        assert!(op.security.is_none());
        assert_eq!(description.namespace(), "PetshopApi");
    }

    #[test]
    fn converts_schemas() {
        let description = ApiDescription::parse_content(PETSHOP).unwrap();
        let schemas = description.schema_types();
        let SchemaType::Object(pet) = &schemas["Pet"] else {
            panic!("Pet should be an object");
        };
        assert_eq!(pet.fields[0].schema, SchemaType::integer());
        assert!(pet.fields[2].schema.is_nullable());
        assert_eq!(pet.fields[3].schema, SchemaType::reference("Pet"));
        assert!(pet.is_required("name"));
    }

    #[test]
    fn parses_json() {
        let json = r#"{
            "info": {"title": "Games", "version": "1", "namespace": "TicTacToe"},
            "operations": [{
                "operationId": "getBoard",
                "method": "get",
                "path": "/games/{gameId}/board",
                "responses": {"200": {"schema": {"type": "string", "format": "uuid"}}},
                "security": []
            }]
        }"#;
        let description = ApiDescription::parse_content(json).unwrap();
        assert_eq!(description.namespace(), "TicTacToe");
        let op = &description.operations[0];
        assert_eq!(op.security, Some(vec![]));
        assert_eq!(
            op.responses["200"].schema.as_ref().unwrap().to_schema(),
            SchemaType::Primitive(Primitive::with_format(
                PrimitiveKind::String,
                StringFormat::Uuid
            ))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(ApiDescription::parse_content("operations: [1, 2").is_err());
    }

    #[tokio::test]
    async fn loads_from_file() -> crate::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("petshop.yaml");
        tokio::fs::write(&path, PETSHOP).await?;

        let description = ApiDescription::from_file_or_url(path.to_string_lossy()).await?;
        assert_eq!(description.info.title, "petshop api");

        let missing = ApiDescription::from_file(dir.path().join("nope.yaml")).await;
        assert!(matches!(missing, Err(crate::Error::Io(_))));
        Ok(())
    }
}
