//! Schema type definitions

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar kinds understood by every target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String formats that map to a dedicated validation check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    Uuid,
    Date,
    DateTime,
    Email,
    Uri,
}

/// A scalar schema: its kind plus an optional string format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
}

impl Primitive {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self { kind, format: None }
    }

    pub fn with_format(kind: PrimitiveKind, format: StringFormat) -> Self {
        Self {
            kind,
            format: Some(format),
        }
    }
}

/// One named field of an object schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub schema: SchemaType,
}

/// Object schema with ordered fields
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectType {
    pub fields: Vec<Field>,
    pub required: BTreeSet<String>,
}

impl ObjectType {
    pub fn is_required(&self, field: &str) -> bool {
        self.required.contains(field)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Normalized API type.
///
/// References are kept by name and never inlined, which is what lets
/// self-referential schemas exist without unbounded recursion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaType {
    Primitive(Primitive),
    Object(ObjectType),
    Enum { values: Vec<String> },
    Array { element: Box<SchemaType> },
    Union { variants: Vec<SchemaType> },
    Reference { name: String },
}

impl SchemaType {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive(Primitive::new(kind))
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn integer() -> Self {
        Self::primitive(PrimitiveKind::Integer)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference { name: name.into() }
    }

    pub fn array(element: SchemaType) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    /// A union that contains the `null` primitive
    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Primitive(p) => p.kind == PrimitiveKind::Null,
            Self::Union { variants } => variants.iter().any(SchemaType::is_nullable),
            _ => false,
        }
    }

    /// The union without its `null` members; `self` for anything else
    pub fn without_null(&self) -> SchemaType {
        match self {
            Self::Union { variants } => {
                let mut rest: Vec<SchemaType> = variants
                    .iter()
                    .filter(|v| !matches!(v, Self::Primitive(p) if p.kind == PrimitiveKind::Null))
                    .cloned()
                    .collect();
                if rest.len() == 1 {
                    rest.remove(0)
                } else {
                    Self::Union { variants: rest }
                }
            }
            other => other.clone(),
        }
    }

    /// Names referenced directly by this schema, without following them
    pub fn direct_references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_direct_references(&mut out);
        out
    }

    fn collect_direct_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Reference { name } => out.push(name),
            Self::Object(obj) => {
                for field in &obj.fields {
                    field.schema.collect_direct_references(out);
                }
            }
            Self::Array { element } => element.collect_direct_references(out),
            Self::Union { variants } => {
                for v in variants {
                    v.collect_direct_references(out);
                }
            }
            Self::Primitive(_) | Self::Enum { .. } => {}
        }
    }
}
