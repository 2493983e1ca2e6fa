//! Laravel emitter: `routes/api.php`, invokable controllers, form requests
//! and resources.

use std::collections::BTreeMap;

use super::php::{handler_arguments, PhpTypeMapper};
use super::{response_bindings, return_type, EmitContext, GuardBinding, OperationBinding, RenderedRule, TargetEmitter};
use crate::contract::{OperationContract, ParameterLocation};
use crate::error::Result;
use crate::rules::{derive_rules, Constraint, FieldRule, ValueType};
use crate::schema::StringFormat;
use crate::security::SecurityObligation;
use crate::templates::TargetFramework;
use crate::utils::{php_string, to_upper_camel_case};

#[derive(Debug, Clone, Copy, Default)]
pub struct LaravelEmitter;

impl LaravelEmitter {
    pub fn model_namespace(namespace: &str) -> String {
        format!("{namespace}\\Models")
    }
}

impl TargetEmitter for LaravelEmitter {
    fn target(&self) -> TargetFramework {
        TargetFramework::Laravel
    }

    fn bind(&self, contract: &OperationContract, ctx: &EmitContext<'_>) -> Result<OperationBinding> {
        let schemas = ctx.contracts.schemas();
        let mapper = PhpTypeMapper::new(schemas, Self::model_namespace(ctx.namespace));
        let prefix = to_upper_camel_case(&contract.operation_id);

        let responses = response_bindings(contract, &mapper, &prefix, "Resource");
        let guards = guards(&contract.security);
        let guard_attachment = (!guards.is_empty()).then(|| {
            let groups: Vec<&str> = guards.iter().map(|g| g.attachment.as_str()).collect();
            format!("security:{}", groups.join(","))
        });
        let rules: Vec<RenderedRule> = derive_rules(contract, schemas)
            .into_iter()
            .map(|rule| {
                let expression = rule_list(&rule);
                RenderedRule::new(rule, expression)
            })
            .collect();

        let mut classes = BTreeMap::new();
        classes.insert("controller".to_string(), format!("{prefix}Controller"));
        classes.insert("handler".to_string(), format!("{prefix}HandlerInterface"));
        if !rules.is_empty() {
            classes.insert("form_request".to_string(), format!("{prefix}FormRequest"));
        }
        if contract.has_parameters_in(ParameterLocation::Query) {
            classes.insert("query_params".to_string(), format!("{prefix}QueryParams"));
        }

        Ok(OperationBinding {
            target: self.target(),
            operation_id: contract.operation_id.clone(),
            http_method: contract.http_method,
            route: contract.route_template.clone(),
            route_name: format!("api.{}", contract.operation_id),
            handler_interface: format!("{prefix}HandlerInterface"),
            handler_method: "handle".to_string(),
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

/// `bearerAuth+oauth=write:pets;read:pets`: schemes joined by `+`, scopes
/// after `=`. Alternatives are separate middleware parameters.
fn guards(security: &SecurityObligation) -> Vec<GuardBinding> {
    security
        .alternatives
        .iter()
        .map(|group| GuardBinding {
            schemes: group.names(),
            attachment: group
                .schemes
                .iter()
                .map(|s| {
                    if s.required_scopes.is_empty() {
                        s.name.clone()
                    } else {
                        let scopes: Vec<&str> = s.required_scopes.iter().map(String::as_str).collect();
                        format!("{}={}", s.name, scopes.join(";"))
                    }
                })
                .collect::<Vec<_>>()
                .join("+"),
        })
        .collect()
}

fn rule_list(rule: &FieldRule) -> String {
    let items: Vec<String> = rule.constraints.iter().map(rule_item).collect();
    format!("[{}]", items.join(", "))
}

/// One entry of a rule array: a quoted rule string, or a `Rule::in` object
/// so allow-list values may contain commas
fn rule_item(constraint: &Constraint) -> String {
    let rule = match constraint {
        Constraint::Required => "required",
        Constraint::Sometimes => "sometimes",
        Constraint::Nullable => "nullable",
        Constraint::Type(t) => match t {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Number => "numeric",
            ValueType::Boolean => "boolean",
            ValueType::Array | ValueType::Object => "array",
        },
        Constraint::Format(f) => match f {
            StringFormat::Uuid => "uuid",
            StringFormat::Date => "date_format:Y-m-d",
            StringFormat::DateTime => "date",
            StringFormat::Email => "email",
            StringFormat::Uri => "url",
        },
        Constraint::AllowList(values) => {
            let values: Vec<String> = values.iter().map(|v| php_string(v)).collect();
            return format!("Rule::in([{}])", values.join(", "));
        }
    };
    php_string(rule)
}
