//! Framework-neutral validation rules.
//!
//! Each emitter renders the same [`FieldRule`] list in its own syntax
//! (Laravel rule arrays, Symfony constraints, a Slim validator), which keeps
//! the accepted inputs identical across targets.

use serde::Serialize;

use crate::contract::{OperationContract, Parameter, ParameterLocation};
use crate::schema::{ObjectType, PrimitiveKind, SchemaModel, SchemaType, StringFormat};

/// Value shape checked by a type constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    fn from_primitive(kind: PrimitiveKind) -> Option<Self> {
        match kind {
            PrimitiveKind::String => Some(Self::String),
            PrimitiveKind::Integer => Some(Self::Integer),
            PrimitiveKind::Number => Some(Self::Number),
            PrimitiveKind::Boolean => Some(Self::Boolean),
            PrimitiveKind::Null => None,
        }
    }
}

/// One check applied to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    /// Must be present
    Required,
    /// May be omitted; checked only when present
    Sometimes,
    /// May be `null`
    Nullable,
    Type(ValueType),
    Format(StringFormat),
    AllowList(Vec<String>),
}

/// Every constraint for one field path.
///
/// Paths are dotted for nested object fields and use `.*` for array
/// elements: `owner.name`, `tags.*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRule {
    pub path: String,
    pub location: ParameterLocation,
    pub constraints: Vec<Constraint>,
}

impl FieldRule {
    pub fn is_required(&self) -> bool {
        self.constraints.contains(&Constraint::Required)
    }

    pub fn is_nullable(&self) -> bool {
        self.constraints.contains(&Constraint::Nullable)
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Type(t) => Some(*t),
            _ => None,
        })
    }

    pub fn format(&self) -> Option<StringFormat> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Format(f) => Some(*f),
            _ => None,
        })
    }

    pub fn allow_list(&self) -> Option<&[String]> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::AllowList(values) => Some(values.as_slice()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
    /// Array elements: neither required nor omittable
    Element,
}

struct RuleWalker<'a> {
    schemas: &'a SchemaModel,
    location: ParameterLocation,
    /// Reference names on the current descent path
    visiting: Vec<&'a str>,
    out: Vec<FieldRule>,
}

impl<'a> RuleWalker<'a> {
    fn walk(&mut self, path: String, schema: &'a SchemaType, presence: Presence, nullable: bool) {
        match schema {
            SchemaType::Reference { name } => {
                if self.visiting.contains(&name.as_str()) {
                    self.push(path, presence, nullable, Vec::new());
                    return;
                }
                match self.schemas.get(name) {
                    Some(target) => {
                        self.visiting.push(name);
                        self.walk(path, target, presence, nullable);
                        self.visiting.pop();
                    }
                    None => self.push(path, presence, nullable, Vec::new()),
                }
            }
            SchemaType::Primitive(p) => {
                let mut checks = Vec::new();
                match ValueType::from_primitive(p.kind) {
                    Some(t) => checks.push(Constraint::Type(t)),
                    None => return self.push(path, presence, true, checks),
                }
                if let Some(format) = p.format {
                    checks.push(Constraint::Format(format));
                }
                self.push(path, presence, nullable, checks);
            }
            SchemaType::Enum { values } => self.push(
                path,
                presence,
                nullable,
                vec![
                    Constraint::Type(ValueType::String),
                    Constraint::AllowList(values.clone()),
                ],
            ),
            SchemaType::Union { variants } => {
                let nullable = nullable || schema.is_nullable();
                let rest: Vec<&'a SchemaType> = variants
                    .iter()
                    .filter(|v| !matches!(v, SchemaType::Primitive(p) if p.kind == PrimitiveKind::Null))
                    .collect();
                match rest.as_slice() {
                    [single] => self.walk(path, *single, presence, nullable),
                    _ => self.push(path, presence, nullable, Vec::new()),
                }
            }
            SchemaType::Array { element } => {
                self.push(
                    path.clone(),
                    presence,
                    nullable,
                    vec![Constraint::Type(ValueType::Array)],
                );
                self.walk(format!("{path}.*"), element, Presence::Element, false);
            }
            SchemaType::Object(object) => {
                self.push(
                    path.clone(),
                    presence,
                    nullable,
                    vec![Constraint::Type(ValueType::Object)],
                );
                self.fields(Some(&path), object, false);
            }
        }
    }

    /// `optional` drops the object's own required list, for an object that may be absent
    fn fields(&mut self, prefix: Option<&str>, object: &'a ObjectType, optional: bool) {
        for field in &object.fields {
            let path = match prefix {
                Some(prefix) => format!("{prefix}.{}", field.name),
                None => field.name.clone(),
            };
            let presence = if !optional && object.is_required(&field.name) {
                Presence::Required
            } else {
                Presence::Optional
            };
            self.walk(path, &field.schema, presence, false);
        }
    }

    fn push(&mut self, path: String, presence: Presence, nullable: bool, checks: Vec<Constraint>) {
        let mut constraints = Vec::with_capacity(checks.len() + 2);
        match presence {
            Presence::Required => constraints.push(Constraint::Required),
            Presence::Optional => constraints.push(Constraint::Sometimes),
            Presence::Element => {}
        }
        if nullable {
            constraints.push(Constraint::Nullable);
        }
        constraints.extend(checks);
        self.out.push(FieldRule {
            path,
            location: self.location,
            constraints,
        });
    }
}

/// Rules for one parameter.
///
/// An object body contributes its fields at the top level (`name`,
/// `owner.id`), the way request validators address JSON bodies; when the
/// body itself is optional none of those top-level fields is required.
/// Optional query and header parameters are also nullable, matching their
/// `null` default.
pub fn parameter_rules(parameter: &Parameter, schemas: &SchemaModel) -> Vec<FieldRule> {
    let mut walker = RuleWalker {
        schemas,
        location: parameter.location,
        visiting: Vec::new(),
        out: Vec::new(),
    };

    if parameter.location == ParameterLocation::Body {
        let (object, name) = match &parameter.schema {
            SchemaType::Object(object) => (Some(object), None),
            SchemaType::Reference { name } => match schemas.resolve(&parameter.schema) {
                Some(SchemaType::Object(object)) => (Some(object), Some(name.as_str())),
                _ => (None, None),
            },
            _ => (None, None),
        };
        if let Some(object) = object {
            walker.visiting.extend(name);
            walker.fields(None, object, !parameter.required);
            return walker.out;
        }
    }

    let presence = if parameter.required {
        Presence::Required
    } else {
        Presence::Optional
    };
    let relaxed = !parameter.required && parameter.location != ParameterLocation::Body;
    walker.walk(parameter.name.clone(), &parameter.schema, presence, relaxed);
    walker.out
}

/// Rules for every validated (non-path) parameter, in parameter order
pub fn derive_rules(contract: &OperationContract, schemas: &SchemaModel) -> Vec<FieldRule> {
    contract
        .parameters
        .iter()
        .filter(|p| p.location != ParameterLocation::Path)
        .flat_map(|p| parameter_rules(p, schemas))
        .collect()
}
