//! Target emitters.
//!
//! An emitter turns each [`OperationContract`] into a framework-specific
//! [`OperationBinding`] (routing entry, handler signature, response classes,
//! guard attachments, validation rules) and renders the bindings into PHP
//! artifacts through the template renderer.
//!
//! Emitters only ever read the shared [`ContractSet`]; a binding's
//! [`PublicSurface`] is what the consistency validator compares across
//! targets.

pub mod laravel;
pub mod php;
pub mod slim;
pub mod symfony;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::contract::{
    normalize_route, ContractSet, HttpMethod, OperationContract, ParameterLocation,
};
use crate::error::{Error, Result};
use crate::rules::FieldRule;
use crate::templates::{TargetFramework, TemplateRenderer};

pub use laravel::LaravelEmitter;
pub use php::{HandlerArgument, ModelBinding, PhpTypeMapper, SchemeBinding};
pub use slim::SlimEmitter;
pub use symfony::SymfonyEmitter;

/// Shared read-only input of every emitter
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    pub contracts: &'a ContractSet,
    /// PHP namespace root, e.g. `PetshopApi`
    pub namespace: &'a str,
    pub title: &'a str,
    pub version: &'a str,
}

impl<'a> EmitContext<'a> {
    pub fn new(contracts: &'a ContractSet, namespace: &'a str) -> Self {
        Self {
            contracts,
            namespace,
            title: "",
            version: "",
        }
    }

    pub fn with_info(mut self, title: &'a str, version: &'a str) -> Self {
        self.title = title;
        self.version = version;
        self
    }
}

/// One response class of a binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseBinding {
    pub status_code: u16,
    pub class_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_doc: Option<String>,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Guard coverage of one security group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardBinding {
    /// Scheme names that must all succeed
    pub schemes: Vec<String>,
    /// Framework text attaching the group (middleware parameter,
    /// expression, middleware list)
    pub attachment: String,
}

/// A validation rule rendered in the target's syntax
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRule {
    pub path: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub nullable: bool,
    pub expression: String,
    pub rule: FieldRule,
}

impl RenderedRule {
    pub fn new(rule: FieldRule, expression: String) -> Self {
        Self {
            path: rule.path.clone(),
            location: rule.location,
            required: rule.is_required(),
            nullable: rule.is_nullable(),
            expression,
            rule,
        }
    }
}

/// An emitter's framework-specific view of one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationBinding {
    pub target: TargetFramework,
    pub operation_id: String,
    pub http_method: HttpMethod,
    /// Route in the framework's own syntax
    pub route: String,
    pub route_name: String,
    pub handler_interface: String,
    pub handler_method: String,
    /// Ordered exactly like the contract's parameters
    pub arguments: Vec<HandlerArgument>,
    pub responses: Vec<ResponseBinding>,
    /// PHP union of every response class
    pub return_type: String,
    /// One entry per security alternative; empty for public operations
    pub guards: Vec<GuardBinding>,
    /// Combined guard attachment for the routing entry, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard_attachment: Option<String>,
    pub rules: Vec<RenderedRule>,
    /// Named classes the templates need (`controller`, `form_request`,
    /// `query_params`, ...). A missing key disables the artifacts that
    /// require it.
    pub classes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OperationBinding {
    pub fn arguments_in(&self, location: ParameterLocation) -> impl Iterator<Item = &HandlerArgument> {
        self.arguments.iter().filter(move |a| a.location == location)
    }
}

/// Framework-neutral shape of a binding, compared across targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicSurface {
    pub operation_id: String,
    pub http_method: HttpMethod,
    /// Route with framework constraint syntax stripped: `{id:[0-9]+}` → `{id}`
    pub route: String,
    pub parameters: Vec<(String, ParameterLocation)>,
    pub status_codes: BTreeSet<u16>,
    /// Sorted scheme names per alternative
    pub security: BTreeSet<Vec<String>>,
}

impl PublicSurface {
    /// The surface every binding of `contract` must have
    pub fn from_contract(contract: &OperationContract) -> Self {
        Self {
            operation_id: contract.operation_id.clone(),
            http_method: contract.http_method,
            route: normalize_route(&contract.route_template),
            parameters: contract
                .parameters
                .iter()
                .map(|p| (p.name.clone(), p.location))
                .collect(),
            status_codes: contract.status_codes().into_iter().collect(),
            security: contract.security.normalized(),
        }
    }

    pub fn from_binding(binding: &OperationBinding) -> Self {
        Self {
            operation_id: binding.operation_id.clone(),
            http_method: binding.http_method,
            route: normalize_route(&binding.route),
            parameters: binding
                .arguments
                .iter()
                .map(|a| (a.name.clone(), a.location))
                .collect(),
            status_codes: binding.responses.iter().map(|r| r.status_code).collect(),
            security: binding
                .guards
                .iter()
                .map(|g| {
                    let mut names = g.schemes.clone();
                    names.sort();
                    names
                })
                .collect(),
        }
    }
}

/// A rendered file, relative to the target's output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub target: TargetFramework,
    pub relative_path: PathBuf,
    pub contents: String,
}

/// Renders contracts into one framework's artifacts
pub trait TargetEmitter: Send + Sync {
    fn target(&self) -> TargetFramework;

    /// Label used in consistency findings
    fn name(&self) -> String {
        self.target().as_str().to_string()
    }

    /// Framework view of one contract
    fn bind(&self, contract: &OperationContract, ctx: &EmitContext<'_>) -> Result<OperationBinding>;

    /// Render every binding into artifacts
    fn render(
        &self,
        bindings: &[OperationBinding],
        ctx: &EmitContext<'_>,
        renderer: &TemplateRenderer,
    ) -> Result<Vec<Artifact>> {
        renderer.render_target(self.target(), bindings, ctx)
    }
}

/// Bind and verify the binding is coherent on its own: one response class
/// per status code and a return type naming every one of them.
///
/// Differences from the contract (argument order, status codes, guards)
/// are not errors here; they surface as consistency findings.
pub fn bind_checked(
    emitter: &dyn TargetEmitter,
    contract: &OperationContract,
    ctx: &EmitContext<'_>,
) -> Result<OperationBinding> {
    let binding = emitter.bind(contract, ctx)?;
    let target = emitter.name();
    let op = &contract.operation_id;

    let mut classes = BTreeSet::new();
    if let Some(duplicate) = binding
        .responses
        .iter()
        .find(|r| !classes.insert(r.class_name.as_str()))
    {
        return Err(Error::emit(format!(
            "{target}: {op}: response class {} is bound twice",
            duplicate.class_name
        )));
    }
    let members: BTreeSet<&str> = binding.return_type.split('|').map(str::trim).collect();
    if let Some(missing) = binding
        .responses
        .iter()
        .find(|r| !members.contains(r.class_name.as_str()))
    {
        return Err(Error::emit(format!(
            "{target}: {op}: return type does not include {}",
            missing.class_name
        )));
    }

    Ok(binding)
}

/// The three builtin emitters for the given targets, in target order
pub fn emitters_for(targets: &[TargetFramework]) -> Vec<Box<dyn TargetEmitter>> {
    let mut targets = targets.to_vec();
    targets.sort();
    targets.dedup();
    targets
        .into_iter()
        .map(|t| -> Box<dyn TargetEmitter> {
            match t {
                TargetFramework::Laravel => Box::new(LaravelEmitter),
                TargetFramework::Symfony => Box::new(SymfonyEmitter),
                TargetFramework::Slim => Box::new(SlimEmitter),
            }
        })
        .collect()
}

/// Response bindings shared by the emitters; `suffix` is the class suffix
pub(crate) fn response_bindings(
    contract: &OperationContract,
    mapper: &PhpTypeMapper<'_>,
    class_prefix: &str,
    suffix: &str,
) -> Vec<ResponseBinding> {
    contract
        .responses
        .variants()
        .iter()
        .map(|v| ResponseBinding {
            status_code: v.status_code,
            class_name: format!("{class_prefix}{}{suffix}", v.status_code),
            payload_type: v.payload_schema.as_ref().map(|s| mapper.declaration(s, false)),
            payload_doc: v.payload_schema.as_ref().map(|s| mapper.doc(s)),
            is_default: v.is_default,
            description: v.description.clone(),
        })
        .collect()
}

pub(crate) fn return_type(responses: &[ResponseBinding]) -> String {
    responses
        .iter()
        .map(|r| r.class_name.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{build_contracts, BuildOptions};
    use crate::description::ApiDescription;

    const DESCRIPTION: &str = r#"
info: { title: Petshop, namespace: Petshop }
securitySchemes:
  bearerAuth: { type: http, scheme: bearer }
  apiKey: { type: apiKey, in: header, name: api-key }
operations:
  - operationId: getPet
    method: get
    path: /pets/{id}
    parameters:
      - { name: id, in: path, schema: { type: integer } }
      - { name: fields, in: query, schema: { type: string } }
    responses: { "200": {} }
    security: [ { bearerAuth: [] }, { apiKey: [] } ]
"#;

    struct Reordering;

    impl TargetEmitter for Reordering {
        fn target(&self) -> TargetFramework {
            TargetFramework::Slim
        }

        fn bind(&self, contract: &OperationContract, ctx: &EmitContext<'_>) -> Result<OperationBinding> {
            let mut binding = SlimEmitter.bind(contract, ctx)?;
            binding.arguments.reverse();
            Ok(binding)
        }
    }

    struct Unguarded;

    impl TargetEmitter for Unguarded {
        fn target(&self) -> TargetFramework {
            TargetFramework::Laravel
        }

        fn bind(&self, contract: &OperationContract, ctx: &EmitContext<'_>) -> Result<OperationBinding> {
            let mut binding = LaravelEmitter.bind(contract, ctx)?;
            binding.guards.pop();
            Ok(binding)
        }
    }

    fn contracts() -> ContractSet {
        let description = ApiDescription::parse_content(DESCRIPTION).unwrap();
        build_contracts(&description, BuildOptions::default()).unwrap()
    }

    fn surfaces(emitter: &dyn TargetEmitter, set: &ContractSet) -> (String, Vec<PublicSurface>) {
        let ctx = EmitContext::new(set, "Petshop");
        let surfaces = set
            .contracts()
            .iter()
            .map(|c| PublicSurface::from_binding(&bind_checked(emitter, c, &ctx).unwrap()))
            .collect();
        (emitter.name(), surfaces)
    }

    #[test]
    fn builtin_emitters_match_the_contract() {
        let set = contracts();
        let ctx = EmitContext::new(&set, "Petshop");
        let contract = set.get("getPet").unwrap();
        for emitter in emitters_for(&TargetFramework::all().collect::<Vec<_>>()) {
            let binding = bind_checked(emitter.as_ref(), contract, &ctx).unwrap();
            assert_eq!(binding.guards.len(), 2);
            assert_eq!(binding.arguments.len(), 2);
            assert_eq!(PublicSurface::from_binding(&binding), PublicSurface::from_contract(contract));
        }
    }

    #[test]
    fn reordered_arguments_become_a_finding() {
        let set = contracts();
        let report = crate::consistency::validate_against(&set, &[surfaces(&Reordering, &set)]);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].field, crate::consistency::SurfaceField::Parameters);
        assert_eq!(report.findings[0].value_a, "[path:id, query:fields]");
    }

    #[test]
    fn missing_guard_becomes_a_finding() {
        let set = contracts();
        let report = crate::consistency::validate_against(&set, &[surfaces(&Unguarded, &set)]);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].field, crate::consistency::SurfaceField::Security);
    }

    struct DroppedReturnType;

    impl TargetEmitter for DroppedReturnType {
        fn target(&self) -> TargetFramework {
            TargetFramework::Symfony
        }

        fn bind(&self, contract: &OperationContract, ctx: &EmitContext<'_>) -> Result<OperationBinding> {
            let mut binding = SymfonyEmitter.bind(contract, ctx)?;
            binding.return_type = "mixed".to_string();
            Ok(binding)
        }
    }

    #[test]
    fn incoherent_return_type_is_rejected() {
        let set = contracts();
        let ctx = EmitContext::new(&set, "Petshop");
        let err = bind_checked(&DroppedReturnType, set.get("getPet").unwrap(), &ctx).unwrap_err();
        assert!(err.to_string().contains("return type does not include"));
    }

    #[test]
    fn surface_normalizes_route_constraints() {
        let set = contracts();
        let ctx = EmitContext::new(&set, "Petshop");
        let contract = set.get("getPet").unwrap();
        let slim = SlimEmitter.bind(contract, &ctx).unwrap();
        assert_eq!(slim.route, "/pets/{id:[0-9]+}");
        let laravel = LaravelEmitter.bind(contract, &ctx).unwrap();
        assert_eq!(
            PublicSurface::from_binding(&slim),
            PublicSurface::from_binding(&laravel)
        );
    }

    #[test]
    fn emitters_are_deduplicated() {
        let emitters = emitters_for(&[
            TargetFramework::Slim,
            TargetFramework::Laravel,
            TargetFramework::Slim,
        ]);
        let names: Vec<String> = emitters.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["laravel", "slim"]);
    }
}
