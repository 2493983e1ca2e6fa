//! Error handling for the contractgen library.
//!
//! Two layers live here. [`ContractError`] describes a single violation found
//! while turning the normalized description into canonical contracts; all of
//! them are collected into [`ContractViolations`] so one run reports every
//! broken operation at once. [`Error`] is the crate-wide error type, with a
//! `Result` alias, that wraps I/O, parsing, rendering and contract failures.
//!
//! # Examples
//!
//! ```
//! use contractgen_core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::config("no targets selected"))
//! }
//! assert!(might_fail().is_err());
//! ```

use std::fmt;

use thiserror::Error;

use crate::contract::ParameterLocation;

/// Result type for contractgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// A construction-time contract violation. Always fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("{method} {path}: operationId is missing or empty")]
    MissingOperationId { method: String, path: String },

    #[error("duplicate operationId '{operation_id}'")]
    DuplicateOperationId { operation_id: String },

    #[error("{operation_id}: unresolved schema reference '{name}'")]
    UnresolvedReference { operation_id: String, name: String },

    #[error("schema '{schema}': unresolved schema reference '{name}'")]
    UnresolvedSchemaReference { schema: String, name: String },

    #[error("{operation_id}: more than one body parameter ({})", .names.join(", "))]
    MultipleBodyParameters {
        operation_id: String,
        names: Vec<String>,
    },

    #[error("{operation_id}: parameter '{name}' declared twice in {location}")]
    DuplicateParameter {
        operation_id: String,
        name: String,
        location: ParameterLocation,
    },

    #[error("{operation_id}: route placeholder '{{{name}}}' has no path parameter")]
    UndeclaredPathParameter { operation_id: String, name: String },

    #[error("{operation_id}: path parameter '{name}' does not appear in the route template")]
    PathParameterNotInRoute { operation_id: String, name: String },

    #[error("{operation_id}: no 2xx response declared")]
    NoSuccessVariant { operation_id: String },

    #[error("{operation_id}: invalid response status '{status}'")]
    InvalidStatusCode { operation_id: String, status: String },

    #[error("{operation_id}: unknown security scheme '{scheme}'")]
    UnknownSecurityScheme { operation_id: String, scheme: String },

    #[error("{operation_id}: input '{name}' is bound from both {first} and {second}")]
    ConflictingInputName {
        operation_id: String,
        name: String,
        first: ParameterLocation,
        second: ParameterLocation,
    },

    #[error("{kind} names {} all map to the PHP class '{class}'", .names.join(", "))]
    ClassNameCollision {
        kind: &'static str,
        class: String,
        names: Vec<String>,
    },

    #[error("security scheme '{scheme}': '{value}' contains a reserved character ({reserved})")]
    ReservedCharacter {
        scheme: String,
        value: String,
        reserved: &'static str,
    },
}

impl ContractError {
    /// The operation the violation belongs to, if it belongs to one
    pub fn operation_id(&self) -> Option<&str> {
        match self {
            Self::MissingOperationId { .. }
            | Self::UnresolvedSchemaReference { .. }
            | Self::ClassNameCollision { .. }
            | Self::ReservedCharacter { .. } => None,
            Self::DuplicateOperationId { operation_id }
            | Self::UnresolvedReference { operation_id, .. }
            | Self::MultipleBodyParameters { operation_id, .. }
            | Self::DuplicateParameter { operation_id, .. }
            | Self::UndeclaredPathParameter { operation_id, .. }
            | Self::PathParameterNotInRoute { operation_id, .. }
            | Self::NoSuccessVariant { operation_id }
            | Self::InvalidStatusCode { operation_id, .. }
            | Self::UnknownSecurityScheme { operation_id, .. }
            | Self::ConflictingInputName { operation_id, .. } => Some(operation_id),
        }
    }
}

/// Every contract violation found in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractViolations(pub Vec<ContractError>);

impl ContractViolations {
    pub fn errors(&self) -> &[ContractError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContractViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} contract violation(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ContractViolations {}

impl From<ContractError> for ContractViolations {
    fn from(err: ContractError) -> Self {
        Self(vec![err])
    }
}

/// Main error type for contractgen operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Remote description could not be fetched
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Atomic file replacement failed
    #[error("failed to persist artifact: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Template engine error
    #[error("Template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// The description violates one or more contract rules
    #[error("{0}")]
    Contract(#[from] ContractViolations),

    /// Malformed normalized description
    #[error("Description error: {0}")]
    Description(String),

    /// Template or manifest problem
    #[error("Template error: {0}")]
    Template(String),

    /// An emitter produced a binding that breaks the contract
    #[error("Emission error: {0}")]
    Emit(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new description error
    pub fn description<S: Into<String>>(msg: S) -> Self {
        Self::Description(msg.into())
    }

    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template(msg.into())
    }

    /// Create a new emission error
    pub fn emit<S: Into<String>>(msg: S) -> Self {
        Self::Emit(msg.into())
    }
}

impl From<ContractError> for Error {
    fn from(err: ContractError) -> Self {
        Self::Contract(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violations_list_every_error() {
        let violations = ContractViolations(vec![
            ContractError::DuplicateOperationId {
                operation_id: "getPet".into(),
            },
            ContractError::NoSuccessVariant {
                operation_id: "deletePet".into(),
            },
        ]);
        let rendered = violations.to_string();
        assert!(rendered.starts_with("2 contract violation(s)"));
        assert!(rendered.contains("duplicate operationId 'getPet'"));
        assert!(rendered.contains("deletePet: no 2xx response declared"));
    }

    #[test]
    fn operation_id_is_reported() {
        let err = ContractError::UnknownSecurityScheme {
            operation_id: "listGames".into(),
            scheme: "cookieAuth".into(),
        };
        assert_eq!(err.operation_id(), Some("listGames"));
        assert_eq!(
            err.to_string(),
            "listGames: unknown security scheme 'cookieAuth'"
        );

        let err = ContractError::MissingOperationId {
            method: "GET".into(),
            path: "/pets".into(),
        };
        assert_eq!(err.operation_id(), None);
    }

    #[test]
    fn placeholder_message_keeps_braces() {
        let err = ContractError::UndeclaredPathParameter {
            operation_id: "getPet".into(),
            name: "id".into(),
        };
        assert_eq!(
            err.to_string(),
            "getPet: route placeholder '{id}' has no path parameter"
        );
    }
}
