//! Slim emitter: PSR-15 request handlers behind a routing table, with one
//! PSR-15 middleware per security scheme.

use std::collections::BTreeMap;

use super::php::{handler_arguments, PhpTypeMapper};
use super::{response_bindings, return_type, EmitContext, GuardBinding, OperationBinding, RenderedRule, TargetEmitter};
use crate::contract::{OperationContract, ParameterLocation};
use crate::error::Result;
use crate::rules::{derive_rules, FieldRule, ValueType};
use crate::schema::{PrimitiveKind, SchemaModel, SchemaType, StringFormat};
use crate::security::SecurityObligation;
use crate::templates::TargetFramework;
use crate::utils::{php_string, to_lower_camel_case, to_upper_camel_case};

#[derive(Debug, Clone, Copy, Default)]
pub struct SlimEmitter;

impl SlimEmitter {
    pub fn model_namespace(namespace: &str) -> String {
        format!("{namespace}\\Model")
    }
}

impl TargetEmitter for SlimEmitter {
    fn target(&self) -> TargetFramework {
        TargetFramework::Slim
    }

    fn bind(&self, contract: &OperationContract, ctx: &EmitContext<'_>) -> Result<OperationBinding> {
        let schemas = ctx.contracts.schemas();
        let mapper = PhpTypeMapper::new(schemas, Self::model_namespace(ctx.namespace));
        let prefix = to_upper_camel_case(&contract.operation_id);

        let responses = response_bindings(contract, &mapper, &prefix, "Response");
        let guards = guards(&contract.security);
        let guard_attachment = (!guards.is_empty()).then(|| {
            let groups: Vec<&str> = guards.iter().map(|g| g.attachment.as_str()).collect();
            format!("[{}]", groups.join(", "))
        });
        let rules: Vec<RenderedRule> = derive_rules(contract, schemas)
            .into_iter()
            .map(|rule| {
                let expression = check_map(&rule);
                RenderedRule::new(rule, expression)
            })
            .collect();

        let mut classes = BTreeMap::new();
        classes.insert("handler".to_string(), format!("{prefix}Handler"));
        classes.insert("service".to_string(), format!("{prefix}ServiceInterface"));
        if !rules.is_empty() {
            classes.insert("validator".to_string(), format!("{prefix}Validator"));
        }
        if contract.has_parameters_in(ParameterLocation::Query) {
            classes.insert("query_params".to_string(), format!("{prefix}QueryParams"));
        }

        Ok(OperationBinding {
            target: self.target(),
            operation_id: contract.operation_id.clone(),
            http_method: contract.http_method,
            route: constrained_route(contract, schemas),
            route_name: contract.operation_id.clone(),
            handler_interface: format!("{prefix}ServiceInterface"),
            handler_method: to_lower_camel_case(&contract.operation_id),
            arguments: handler_arguments(&contract.parameters, &mapper),
            return_type: return_type(&responses),
            responses,
            guards,
            guard_attachment,
            rules,
            classes,
            summary: contract.summary.clone(),
            description: contract.description.clone(),
        })
    }
}

/// FastRoute placeholders carry a pattern for integer and uuid parameters
fn constrained_route(contract: &OperationContract, schemas: &SchemaModel) -> String {
    let mut route = contract.route_template.clone();
    for param in contract.parameters_in(ParameterLocation::Path) {
        let pattern = match schemas.resolve(&param.schema) {
            Some(SchemaType::Primitive(p)) if p.kind == PrimitiveKind::Integer => Some("[0-9]+"),
            Some(SchemaType::Primitive(p)) if p.format == Some(StringFormat::Uuid) => {
                Some("[0-9a-fA-F-]+")
            }
            _ => None,
        };
        if let Some(pattern) = pattern {
            route = route.replace(
                &format!("{{{}}}", param.name),
                &format!("{{{}:{}}}", param.name, pattern),
            );
        }
    }
    route
}

/// `['bearerAuth' => [], 'oauth' => ['write:pets']]`: middleware alias →
/// required scopes, all of which must pass
fn guards(security: &SecurityObligation) -> Vec<GuardBinding> {
    security
        .alternatives
        .iter()
        .map(|group| {
            let entries: Vec<String> = group
                .schemes
                .iter()
                .map(|s| {
                    let scopes: Vec<String> = s.required_scopes.iter().map(|x| php_string(x)).collect();
                    format!("{} => [{}]", php_string(&s.name), scopes.join(", "))
                })
                .collect();
            GuardBinding {
                schemes: group.names(),
                attachment: format!("[{}]", entries.join(", ")),
            }
        })
        .collect()
}

/// Check map consumed by the generated validator
fn check_map(rule: &FieldRule) -> String {
    let mut entries = vec![
        format!("'required' => {}", rule.is_required()),
        format!("'nullable' => {}", rule.is_nullable()),
    ];
    if let Some(t) = rule.value_type() {
        let name = match t {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
        };
        entries.push(format!("'type' => '{name}'"));
    }
    if let Some(format) = rule.format() {
        let name = match format {
            StringFormat::Uuid => "uuid",
            StringFormat::Date => "date",
            StringFormat::DateTime => "date-time",
            StringFormat::Email => "email",
            StringFormat::Uri => "uri",
        };
        entries.push(format!("'format' => '{name}'"));
    }
    if let Some(values) = rule.allow_list() {
        let values: Vec<String> = values.iter().map(|v| php_string(v)).collect();
        entries.push(format!("'in' => [{}]", values.join(", ")));
    }
    format!("[{}]", entries.join(", "))
}
