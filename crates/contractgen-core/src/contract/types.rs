//! Canonical contract types shared by every emitter

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::responses::ResponseSet;
use crate::schema::{SchemaModel, SchemaType};
use crate::security::{SecurityObligation, SecuritySchemeDefinition};

/// HTTP methods an operation can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[serde(alias = "GET")]
    Get,
    #[serde(alias = "POST")]
    Post,
    #[serde(alias = "PUT")]
    Put,
    #[serde(alias = "PATCH")]
    Patch,
    #[serde(alias = "DELETE")]
    Delete,
    #[serde(alias = "HEAD")]
    Head,
    #[serde(alias = "OPTIONS")]
    Options,
}

impl HttpMethod {
    /// Lowercase form, as used by route builders (`Route::get`, `$app->get`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
        }
    }

    /// Uppercase form, as used in documentation and method lists
    pub fn as_upper(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            "head" => Ok(Self::Head),
            "options" => Ok(Self::Options),
            _ => Err(format!("Unknown HTTP method: {s}")),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_upper())
    }
}

/// Where a parameter is bound from.
///
/// The declaration order of the variants is the binding order of handler
/// arguments: path, then query, then header, then body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bound operation parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub schema: SchemaType,
    pub required: bool,
    /// Explicit or schema-level default; `None` for required parameters and bodies
    pub default: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Canonical, immutable representation of one operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationContract {
    pub operation_id: String,
    pub http_method: HttpMethod,
    pub route_template: String,
    /// Carried through to the `contracts` JSON output only; generated code is not grouped by tag
    pub tags: Vec<String>,
    /// Ordered path → query → header → body
    pub parameters: Vec<Parameter>,
    pub responses: ResponseSet,
    pub security: SecurityObligation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OperationContract {
    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }

    pub fn body(&self) -> Option<&Parameter> {
        self.parameters_in(ParameterLocation::Body).next()
    }

    pub fn has_parameters_in(&self, location: ParameterLocation) -> bool {
        self.parameters_in(location).next().is_some()
    }

    /// Status codes of every variant, ascending
    pub fn status_codes(&self) -> Vec<u16> {
        self.responses.status_codes()
    }

    pub fn requires_authentication(&self) -> bool {
        !self.security.is_public()
    }
}

/// The immutable output of one build: every contract plus the models they
/// reference. Shared by reference with every emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractSet {
    contracts: Vec<OperationContract>,
    schemas: SchemaModel,
    security_schemes: Vec<(String, SecuritySchemeDefinition)>,
}

impl ContractSet {
    pub(crate) fn new(
        contracts: Vec<OperationContract>,
        schemas: SchemaModel,
        security_schemes: Vec<(String, SecuritySchemeDefinition)>,
    ) -> Self {
        Self {
            contracts,
            schemas,
            security_schemes,
        }
    }

    pub fn contracts(&self) -> &[OperationContract] {
        &self.contracts
    }

    pub fn get(&self, operation_id: &str) -> Option<&OperationContract> {
        self.contracts
            .iter()
            .find(|c| c.operation_id == operation_id)
    }

    pub fn schemas(&self) -> &SchemaModel {
        &self.schemas
    }

    /// Declared security schemes in name order
    pub fn security_schemes(&self) -> &[(String, SecuritySchemeDefinition)] {
        &self.security_schemes
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
