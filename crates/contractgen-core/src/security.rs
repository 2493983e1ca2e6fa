//! Security binding resolution.
//!
//! An operation lists security requirement objects. Each object names one or
//! more schemes; schemes inside the same object must all succeed (an AND
//! group) while separate objects are alternatives (OR). The resolver turns
//! those names into a [`SecurityObligation`] whose every entry carries the full
//! scheme definition, so emitters never have to look a scheme up again.
//!
//! How multi-scheme requirements are combined is configurable through
//! [`SecuritySemantics`]; the default follows the usual OpenAPI reading.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ContractError;

/// One security requirement object: scheme name → required scopes
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// Where an API key is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

impl ApiKeyLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Cookie => "cookie",
        }
    }
}

/// HTTP authentication schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpAuthScheme {
    Basic,
    Bearer,
}

/// A security scheme as declared in the description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SecuritySchemeDefinition {
    Http {
        scheme: HttpAuthScheme,
        #[serde(default, rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
        bearer_format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    ApiKey {
        #[serde(rename = "in")]
        location: ApiKeyLocation,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Oauth2 {
        /// Scope name → description
        #[serde(default)]
        scopes: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SecuritySchemeDefinition {
    pub fn kind(&self) -> SchemeKind {
        match self {
            Self::Http {
                scheme: HttpAuthScheme::Basic,
                ..
            } => SchemeKind::HttpBasic,
            Self::Http {
                scheme: HttpAuthScheme::Bearer,
                ..
            } => SchemeKind::HttpBearer,
            Self::ApiKey { .. } => SchemeKind::ApiKey,
            Self::Oauth2 { .. } => SchemeKind::OAuth2,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Http { description, .. }
            | Self::ApiKey { description, .. }
            | Self::Oauth2 { description, .. } => description.as_deref(),
        }
    }
}

/// Kind of a resolved scheme reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemeKind {
    #[serde(rename = "http-basic")]
    HttpBasic,
    #[serde(rename = "http-bearer")]
    HttpBearer,
    #[serde(rename = "apiKey")]
    ApiKey,
    #[serde(rename = "oauth2")]
    OAuth2,
}

impl SchemeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpBasic => "http-basic",
            Self::HttpBearer => "http-bearer",
            Self::ApiKey => "apiKey",
            Self::OAuth2 => "oauth2",
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an API key scheme reads its credential from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ApiKeyCarrier {
    pub location: ApiKeyLocation,
    pub name: String,
}

/// A scheme an operation requires, fully resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SecuritySchemeRef {
    pub name: String,
    pub kind: SchemeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKeyCarrier>,
    /// Only ever non-empty for oauth2
    pub required_scopes: BTreeSet<String>,
}

/// Schemes that must all succeed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SecurityGroup {
    pub schemes: Vec<SecuritySchemeRef>,
}

impl SecurityGroup {
    pub fn names(&self) -> Vec<String> {
        self.schemes.iter().map(|s| s.name.clone()).collect()
    }
}

/// Alternatives of which at least one group must succeed.
///
/// No alternatives means the operation is public.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SecurityObligation {
    pub alternatives: Vec<SecurityGroup>,
}

impl SecurityObligation {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn is_public(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Evaluate the obligation given which schemes a request satisfies
    pub fn is_satisfied<F>(&self, mut satisfied: F) -> bool
    where
        F: FnMut(&SecuritySchemeRef) -> bool,
    {
        self.is_public()
            || self
                .alternatives
                .iter()
                .any(|group| group.schemes.iter().all(&mut satisfied))
    }

    /// Every scheme mentioned anywhere in the obligation
    pub fn scheme_names(&self) -> BTreeSet<String> {
        self.alternatives
            .iter()
            .flat_map(|g| g.schemes.iter().map(|s| s.name.clone()))
            .collect()
    }

    /// Groups as sorted name lists, the form compared across targets
    pub fn normalized(&self) -> BTreeSet<Vec<String>> {
        self.alternatives
            .iter()
            .map(|g| {
                let mut names = g.names();
                names.sort();
                names
            })
            .collect()
    }

    pub fn requires_scopes(&self) -> bool {
        self.alternatives
            .iter()
            .flat_map(|g| g.schemes.iter())
            .any(|s| !s.required_scopes.is_empty())
    }
}

/// How requirement objects with several schemes are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecuritySemantics {
    /// Schemes in one requirement object are ANDed, objects are ORed
    #[default]
    Conventional,
    /// Every scheme is an alternative on its own
    Any,
    /// Every scheme is required
    All,
}

impl SecuritySemantics {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conventional => "conventional",
            Self::Any => "any",
            Self::All => "all",
        }
    }
}

impl FromStr for SecuritySemantics {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conventional" => Ok(Self::Conventional),
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown security semantics: {s}")),
        }
    }
}

impl fmt::Display for SecuritySemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves per-operation requirements against the declared schemes
#[derive(Debug, Clone)]
pub struct SecurityResolver<'a> {
    schemes: &'a BTreeMap<String, SecuritySchemeDefinition>,
    default_requirements: &'a [SecurityRequirement],
    semantics: SecuritySemantics,
}

impl<'a> SecurityResolver<'a> {
    pub fn new(
        schemes: &'a BTreeMap<String, SecuritySchemeDefinition>,
        default_requirements: &'a [SecurityRequirement],
        semantics: SecuritySemantics,
    ) -> Self {
        Self {
            schemes,
            default_requirements,
            semantics,
        }
    }

    /// Resolve an operation's requirements.
    ///
    /// `None` inherits the description-level requirements, `Some(&[])` makes
    /// the operation public. An empty requirement object allows anonymous
    /// access and therefore also yields a public obligation.
    pub fn resolve(
        &self,
        operation_id: &str,
        requirements: Option<&[SecurityRequirement]>,
    ) -> Result<SecurityObligation, Vec<ContractError>> {
        let requirements = requirements.unwrap_or(self.default_requirements);
        let mut errors = Vec::new();
        let mut groups = Vec::new();
        let mut anonymous = false;

        for requirement in requirements {
            if requirement.is_empty() {
                anonymous = true;
                continue;
            }
            let mut group = Vec::with_capacity(requirement.len());
            for (name, scopes) in requirement {
                match self.schemes.get(name) {
                    Some(definition) => group.push(scheme_ref(name, definition, scopes)),
                    None => errors.push(ContractError::UnknownSecurityScheme {
                        operation_id: operation_id.to_string(),
                        scheme: name.clone(),
                    }),
                }
            }
            groups.push(SecurityGroup { schemes: group });
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        if anonymous {
            log::debug!("{operation_id}: anonymous requirement present, treating as public");
            return Ok(SecurityObligation::public());
        }
        Ok(self.apply_semantics(groups))
    }

    fn apply_semantics(&self, groups: Vec<SecurityGroup>) -> SecurityObligation {
        let alternatives = match self.semantics {
            SecuritySemantics::Conventional => groups,
            SecuritySemantics::Any => merge_by_name(groups)
                .into_iter()
                .map(|scheme| SecurityGroup {
                    schemes: vec![scheme],
                })
                .collect(),
            SecuritySemantics::All => {
                let schemes = merge_by_name(groups);
                if schemes.is_empty() {
                    Vec::new()
                } else {
                    vec![SecurityGroup { schemes }]
                }
            }
        };

        let mut unique: Vec<SecurityGroup> = Vec::with_capacity(alternatives.len());
        for group in alternatives {
            if !unique.contains(&group) {
                unique.push(group);
            }
        }
        SecurityObligation {
            alternatives: unique,
        }
    }
}

fn scheme_ref(
    name: &str,
    definition: &SecuritySchemeDefinition,
    scopes: &[String],
) -> SecuritySchemeRef {
    let kind = definition.kind();
    let api_key = match definition {
        SecuritySchemeDefinition::ApiKey { location, name, .. } => Some(ApiKeyCarrier {
            location: *location,
            name: name.clone(),
        }),
        _ => None,
    };
    let required_scopes = if kind == SchemeKind::OAuth2 {
        scopes.iter().cloned().collect()
    } else {
        BTreeSet::new()
    };
    SecuritySchemeRef {
        name: name.to_string(),
        kind,
        api_key,
        required_scopes,
    }
}

/// Flatten groups into one entry per scheme name, unioning scopes
fn merge_by_name(groups: Vec<SecurityGroup>) -> Vec<SecuritySchemeRef> {
    let mut merged: Vec<SecuritySchemeRef> = Vec::new();
    for scheme in groups.into_iter().flat_map(|g| g.schemes) {
        match merged.iter_mut().find(|s| s.name == scheme.name) {
            Some(existing) => existing.required_scopes.extend(scheme.required_scopes),
            None => merged.push(scheme),
        }
    }
    merged
}
