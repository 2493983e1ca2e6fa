//! Normalized schema model.
//!
//! The [`SchemaModel`] owns every named schema of a description. It is built
//! once, checked for dangling references, and then shared read-only by the
//! contract builder and every emitter.

pub mod builtin;
mod types;

pub use types::*;

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as JsonValue;

use crate::error::{ContractError, ContractViolations};

/// Named schemas of one description plus the builtin error payloads
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaModel {
    schemas: BTreeMap<String, SchemaType>,
}

impl SchemaModel {
    /// Build the model and verify every reference resolves.
    ///
    /// Builtin error schemas are added unless the description defines a
    /// schema with the same name.
    pub fn new(schemas: BTreeMap<String, SchemaType>) -> Result<Self, ContractViolations> {
        let mut all = schemas;
        for (name, schema) in builtin::error_schemas() {
            all.entry(name.to_string()).or_insert(schema);
        }
        let model = Self { schemas: all };

        let mut errors = Vec::new();
        for (owner, schema) in &model.schemas {
            for name in schema.direct_references() {
                if !model.schemas.contains_key(name) {
                    errors.push(ContractError::UnresolvedSchemaReference {
                        schema: owner.clone(),
                        name: name.to_string(),
                    });
                }
            }
        }
        if errors.is_empty() {
            Ok(model)
        } else {
            Err(ContractViolations(errors))
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaType> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Iterate named schemas in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaType)> {
        self.schemas.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Follow reference chains until a non-reference schema is reached.
    ///
    /// Returns `None` for a dangling reference or a cycle made only of
    /// references.
    pub fn resolve<'a>(&'a self, schema: &'a SchemaType) -> Option<&'a SchemaType> {
        let mut current = schema;
        let mut seen = BTreeSet::new();
        while let SchemaType::Reference { name } = current {
            if !seen.insert(name.as_str()) {
                return None;
            }
            current = self.schemas.get(name)?;
        }
        Some(current)
    }

    /// Every reference name reachable from `schema` that does not resolve.
    ///
    /// Named schemas are visited at most once, so cycles terminate.
    pub fn unresolved_references(&self, schema: &SchemaType) -> Vec<String> {
        let mut missing = Vec::new();
        let mut visited = BTreeSet::new();
        let mut stack: Vec<&SchemaType> = vec![schema];
        while let Some(next) = stack.pop() {
            for name in next.direct_references() {
                if !visited.insert(name.to_string()) {
                    continue;
                }
                match self.schemas.get(name) {
                    Some(target) => stack.push(target),
                    None => missing.push(name.to_string()),
                }
            }
        }
        missing.sort();
        missing
    }

    /// Default bound to an optional parameter that declares none:
    /// `[]` for arrays, `null` for everything else.
    pub fn default_value(&self, schema: &SchemaType) -> JsonValue {
        match self.resolve(schema) {
            Some(SchemaType::Array { .. }) => JsonValue::Array(Vec::new()),
            _ => JsonValue::Null,
        }
    }
}
