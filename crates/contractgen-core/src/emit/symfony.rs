//! Symfony emitter: attribute-routed controllers guarded by an `IsGranted`
//! expression, validator constraints and response classes.

use std::collections::BTreeMap;

use super::php::{handler_arguments, PhpTypeMapper};
use super::{response_bindings, return_type, EmitContext, GuardBinding, OperationBinding, RenderedRule, TargetEmitter};
use crate::contract::{OperationContract, ParameterLocation};
use crate::error::Result;
use crate::rules::{derive_rules, Constraint, FieldRule, ValueType};
use crate::schema::StringFormat;
use crate::security::{SecurityObligation, SecuritySchemeRef};
use crate::templates::TargetFramework;
use crate::utils::{php_string, to_upper_camel_case};

#[derive(Debug, Clone, Copy, Default)]
pub struct SymfonyEmitter;

impl SymfonyEmitter {
    pub fn model_namespace(namespace: &str) -> String {
        format!("{namespace}\\Model")
    }
}

impl TargetEmitter for SymfonyEmitter {
    fn target(&self) -> TargetFramework {
        TargetFramework::Symfony
    }

    fn bind(&self, contract: &OperationContract, ctx: &EmitContext<'_>) -> Result<OperationBinding> {
        let schemas = ctx.contracts.schemas();
        let mapper = PhpTypeMapper::new(schemas, Self::model_namespace(ctx.namespace));
        let prefix = to_upper_camel_case(&contract.operation_id);

        let responses = response_bindings(contract, &mapper, &prefix, "Response");
        let guards = guards(&contract.security);
        let guard_attachment = (!guards.is_empty()).then(|| {
            let multiple = guards.len() > 1;
            guards
                .iter()
                .map(|g| {
                    if multiple && g.schemes.len() > 1 {
                        format!("({})", g.attachment)
                    } else {
                        g.attachment.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" or ")
        });
        let rules: Vec<RenderedRule> = derive_rules(contract, schemas)
            .into_iter()
            .map(|rule| {
                let expression = constraint_list(&rule);
                RenderedRule::new(rule, expression)
            })
            .collect();

        let mut classes = BTreeMap::new();
        classes.insert("controller".to_string(), format!("{prefix}Controller"));
        classes.insert("handler".to_string(), format!("{prefix}HandlerInterface"));
        if !rules.is_empty() {
            classes.insert("constraints".to_string(), format!("{prefix}Constraints"));
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

fn is_granted(scheme: &SecuritySchemeRef) -> String {
    if scheme.required_scopes.is_empty() {
        format!("is_granted({})", php_string(&scheme.name))
    } else {
        let scopes: Vec<String> = scheme.required_scopes.iter().map(|s| php_string(s)).collect();
        format!(
            "is_granted({}, [{}])",
            php_string(&scheme.name),
            scopes.join(", ")
        )
    }
}

fn guards(security: &SecurityObligation) -> Vec<GuardBinding> {
    security
        .alternatives
        .iter()
        .map(|group| GuardBinding {
            schemes: group.names(),
            attachment: group
                .schemes
                .iter()
                .map(is_granted)
                .collect::<Vec<_>>()
                .join(" and "),
        })
        .collect()
}

/// `[new Assert\NotNull(), new Assert\Type('string')]`; presence itself is
/// carried by the rule's `required` flag in the constraints class.
/// Query and header values arrive as strings, so their scalar types are
/// checked by shape.
fn constraint_list(rule: &FieldRule) -> String {
    let textual = matches!(rule.location, ParameterLocation::Query | ParameterLocation::Header);
    let mut items = Vec::new();
    if !rule.is_nullable() && rule.value_type().is_some() {
        items.push("new Assert\\NotNull()".to_string());
    }
    for constraint in &rule.constraints {
        let item = match constraint {
            Constraint::Required | Constraint::Sometimes | Constraint::Nullable => continue,
            Constraint::Type(ValueType::Integer) if textual => {
                "new Assert\\Regex('/^-?\\d+$/')".to_string()
            }
            Constraint::Type(ValueType::Boolean) if textual => {
                "new Assert\\Choice(['true', 'false', '1', '0'])".to_string()
            }
            Constraint::Type(t) => format!(
                "new Assert\\Type('{}')",
                match t {
                    ValueType::String => "string",
                    ValueType::Integer => "integer",
                    ValueType::Number => "numeric",
                    ValueType::Boolean => "bool",
                    ValueType::Array | ValueType::Object => "array",
                }
            ),
            Constraint::Format(f) => match f {
                StringFormat::Uuid => "new Assert\\Uuid()".to_string(),
                StringFormat::Date => "new Assert\\Date()".to_string(),
                StringFormat::DateTime => {
                    "new Assert\\DateTime(format: \\DateTimeInterface::ATOM)".to_string()
                }
                StringFormat::Email => "new Assert\\Email()".to_string(),
                StringFormat::Uri => "new Assert\\Url()".to_string(),
            },
            Constraint::AllowList(values) => {
                let values: Vec<String> = values.iter().map(|v| php_string(v)).collect();
                format!("new Assert\\Choice([{}])", values.join(", "))
            }
        };
        items.push(item);
    }
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{build_contracts, BuildOptions};
    use crate::description::ApiDescription;

    #[test]
    fn expression_combines_groups() {
        let description = ApiDescription::parse_content(
            r#"
info: { title: Petstore }
securitySchemes:
  api_key: { type: apiKey, in: header, name: api_key }
  petstore_auth: { type: oauth2, scopes: { "write:pets": w } }
  basic: { type: http, scheme: basic }
operations:
  - operationId: addPet
    method: post
    path: /pets
    requestBody:
      schema:
        type: object
        required: [name]
        properties:
          - { name: name, schema: { type: string } }
          - { name: status, schema: { type: enum, values: [available, sold] } }
    responses: { "201": {} }
    security:
      - { petstore_auth: [ "write:pets" ], basic: [] }
      - { api_key: [] }
"#,
        )
        .unwrap();
        let set = build_contracts(&description, BuildOptions::default()).unwrap();
        let ctx = EmitContext::new(&set, "Petstore");
        let binding = SymfonyEmitter.bind(set.get("addPet").unwrap(), &ctx).unwrap();

        assert_eq!(
            binding.guard_attachment.as_deref(),
            Some("(is_granted('basic') and is_granted('petstore_auth', ['write:pets'])) or is_granted('api_key')")
        );
        assert_eq!(binding.arguments[0].name, "body");
        assert_eq!(binding.arguments[0].php_type, "array");
        assert_eq!(
            binding.rules[0].expression,
            "[new Assert\\NotNull(), new Assert\\Type('string')]"
        );
        assert_eq!(
            binding.rules[1].expression,
            "[new Assert\\NotNull(), new Assert\\Type('string'), new Assert\\Choice(['available', 'sold'])]"
        );
        assert_eq!(binding.classes["constraints"], "AddPetConstraints");
        assert!(!binding.classes.contains_key("query_params"));
    }

    #[test]
    fn query_scalars_are_checked_as_text() {
        let description = ApiDescription::parse_content(
            r#"
info: { title: Petstore }
operations:
  - operationId: findPets
    method: get
    path: /pets
    parameters:
      - { name: limit, in: query, schema: { type: integer } }
    responses: { "200": {} }
"#,
        )
        .unwrap();
        let set = build_contracts(&description, BuildOptions::default()).unwrap();
        let ctx = EmitContext::new(&set, "Petstore");
        let binding = SymfonyEmitter.bind(set.get("findPets").unwrap(), &ctx).unwrap();

        assert_eq!(binding.rules[0].expression, "[new Assert\\Regex('/^-?\\d+$/')]");
        assert_eq!(binding.classes["query_params"], "FindPetsQueryParams");
    }
}
