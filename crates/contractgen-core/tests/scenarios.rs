//! Scenario tests against the public contractgen-core API

use std::sync::Arc;

use contractgen_core::consistency::{self, SurfaceField};
use contractgen_core::contract::ParameterLocation;
use contractgen_core::emit::{
    emitters_for, EmitContext, LaravelEmitter, OperationBinding, SymfonyEmitter,
};
use contractgen_core::generate::{bind_targets, generate_from_description};
use contractgen_core::{
    build_contracts, ApiDescription, BuildOptions, Config, ContractSet, MemorySink,
    OperationContract, Result, SecuritySemantics, TargetEmitter, TargetFramework,
    TemplateRenderer,
};

const PETSHOP: &str = r#"
info: { title: Petshop, version: 2.1.0, namespace: Petshop }
schemas:
  Pet:
    type: object
    required: [id, name]
    properties:
      - { name: id, schema: { type: integer } }
      - { name: name, schema: { type: string } }
  NewPet:
    type: object
    required: [name]
    properties:
      - { name: name, schema: { type: string } }
  Error:
    type: object
    properties:
      - { name: message, schema: { type: string } }
securitySchemes:
  bearerAuth: { type: http, scheme: bearer }
  apiKey: { type: apiKey, in: header, name: X-API-Key }
security: [ { bearerAuth: [] } ]
operations:
  - operationId: findPets
    method: get
    path: /pets
    parameters:
      - { name: tag, in: query, schema: { type: string } }
      - { name: limit, in: query, schema: { type: integer }, default: 20 }
    responses:
      "200": { schema: { type: array, items: { $ref: Pet } } }
    security: []
  - operationId: updatePet
    method: put
    path: /pets/{id}
    parameters:
      - { name: X-Request-Id, in: header, schema: { type: string } }
      - { name: dryRun, in: query, schema: { type: boolean } }
      - { name: id, in: path, required: true, schema: { type: integer } }
    requestBody:
      schema: { $ref: NewPet }
    responses:
      "200": { schema: { $ref: Pet } }
    security:
      - { bearerAuth: [], apiKey: [] }
  - operationId: deletePet
    method: delete
    path: /pets/{id}
    parameters:
      - { name: id, in: path, required: true, schema: { type: integer } }
    responses:
      "204": { description: deleted }
      "404": { schema: { $ref: Error } }
  - operationId: adoptPet
    method: post
    path: /pets/{id}/adopt
    parameters:
      - { name: id, in: path, required: true, schema: { type: integer } }
    responses:
      "200": { schema: { $ref: Pet } }
    security:
      - { bearerAuth: [] }
      - { apiKey: [] }
"#;

fn description() -> ApiDescription {
    ApiDescription::parse_content(PETSHOP).unwrap()
}

fn contracts() -> ContractSet {
    build_contracts(&description(), BuildOptions::default()).unwrap()
}

fn contract<'a>(set: &'a ContractSet, id: &str) -> &'a OperationContract {
    set.get(id).unwrap_or_else(|| panic!("missing contract {id}"))
}

#[test]
fn delete_with_declared_not_found_and_default_security() {
    let set = contracts();
    let delete = contract(&set, "deletePet");

    assert_eq!(delete.status_codes(), vec![204, 401, 404, 500]);
    assert_eq!(delete.parameters.len(), 1);
    assert_eq!(delete.parameters[0].name, "id");
    assert_eq!(delete.parameters[0].location, ParameterLocation::Path);
    assert!(delete.parameters[0].required);
    assert_eq!(
        delete.security.normalized().into_iter().collect::<Vec<_>>(),
        vec![vec!["bearerAuth".to_string()]]
    );

    let default = delete.responses.default_variant().unwrap();
    assert_eq!(default.status_code, 500);
}

#[test]
fn public_listing_keeps_defaults_and_skips_auth_variants() {
    let set = contracts();
    let find = contract(&set, "findPets");

    assert!(find.security.is_public());
    assert!(!find.requires_authentication());
    assert_eq!(find.status_codes(), vec![200, 422, 500]);

    let limit = find
        .parameters
        .iter()
        .find(|p| p.name == "limit")
        .unwrap();
    assert_eq!(limit.location, ParameterLocation::Query);
    assert!(!limit.required);
    assert_eq!(limit.default, Some(serde_json::json!(20)));
}

#[test]
fn alternatives_are_ored_and_groups_are_anded() {
    let set = contracts();

    let adopt = contract(&set, "adoptPet");
    assert!(adopt.security.is_satisfied(|s| s.name == "apiKey"));
    assert!(adopt.security.is_satisfied(|s| s.name == "bearerAuth"));
    assert!(!adopt.security.is_satisfied(|_| false));

    let update = contract(&set, "updatePet");
    assert_eq!(update.security.alternatives.len(), 1);
    assert!(!update.security.is_satisfied(|s| s.name == "bearerAuth"));
    assert!(update.security.is_satisfied(|_| true));
}

#[test]
fn any_semantics_splits_combined_requirements() {
    let options = BuildOptions {
        security_semantics: SecuritySemantics::Any,
        ..BuildOptions::default()
    };
    let set = build_contracts(&description(), options).unwrap();
    let update = contract(&set, "updatePet");
    assert_eq!(update.security.alternatives.len(), 2);
    assert!(update.security.is_satisfied(|s| s.name == "apiKey"));
}

#[test]
fn parameters_bind_path_query_header_body() {
    let set = contracts();
    let update = contract(&set, "updatePet");
    let order: Vec<(&str, ParameterLocation)> = update
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.location))
        .collect();
    assert_eq!(
        order,
        vec![
            ("id", ParameterLocation::Path),
            ("dryRun", ParameterLocation::Query),
            ("X-Request-Id", ParameterLocation::Header),
            ("new_pet", ParameterLocation::Body),
        ]
    );
}

#[test]
fn builds_are_deterministic() {
    let first = contracts();
    let second = contracts();
    assert_eq!(first, second);

    let json = |set: &ContractSet| serde_json::to_string(set.contracts()).unwrap();
    assert_eq!(json(&first), json(&second));
}

#[test]
fn builtin_emitters_agree() -> Result<()> {
    let set = contracts();
    let ctx = EmitContext::new(&set, "Petshop");
    let emitters = emitters_for(&TargetFramework::all().collect::<Vec<_>>());

    let (bound, report) = bind_targets(&emitters, &ctx)?;
    assert_eq!(bound.len(), 3);
    assert!(report.is_clean(), "{:?}", report.findings);
    assert_eq!(report.emitters, vec!["laravel", "symfony", "slim"]);
    Ok(())
}

/// Binds like Symfony but hands arguments to the handler in reverse
struct ReversedArguments;

impl TargetEmitter for ReversedArguments {
    fn target(&self) -> TargetFramework {
        TargetFramework::Symfony
    }

    fn name(&self) -> String {
        "reversed".to_string()
    }

    fn bind(&self, contract: &OperationContract, ctx: &EmitContext<'_>) -> Result<OperationBinding> {
        let mut binding = SymfonyEmitter.bind(contract, ctx)?;
        binding.arguments.reverse();
        Ok(binding)
    }
}

fn laravel_then_reversed() -> Vec<Box<dyn TargetEmitter>> {
    vec![Box::new(LaravelEmitter), Box::new(ReversedArguments)]
}

#[test]
fn reordered_arguments_are_reported_once_per_operation() -> Result<()> {
    let set = contracts();
    let ctx = EmitContext::new(&set, "Petshop");

    let (_, report) = bind_targets(&laravel_then_reversed(), &ctx)?;

    // findPets and updatePet have more than one argument
    let ids: Vec<&str> = report
        .findings
        .iter()
        .map(|f| f.operation_id.as_str())
        .collect();
    assert_eq!(ids, vec!["findPets", "updatePet"]);
    assert!(report
        .findings
        .iter()
        .all(|f| f.field == SurfaceField::Parameters && f.emitter_b == "reversed"));
    Ok(())
}

#[test]
fn reordering_a_single_operation_yields_one_finding() -> Result<()> {
    let options = BuildOptions {
        include_operations: vec!["updatePet".into(), "deletePet".into()],
        ..BuildOptions::default()
    };
    let set = build_contracts(&description(), options)?;
    let ctx = EmitContext::new(&set, "Petshop");

    let (_, report) = bind_targets(&laravel_then_reversed(), &ctx)?;

    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.operation_id, "updatePet");
    assert_eq!(finding.field, SurfaceField::Parameters);
    assert_eq!(finding.emitter_a, "laravel");
    Ok(())
}

#[test]
fn reversed_baseline_is_caught_by_the_contract() -> Result<()> {
    let set = contracts();
    let ctx = EmitContext::new(&set, "Petshop");
    let emitters: Vec<Box<dyn TargetEmitter>> = vec![Box::new(ReversedArguments)];

    let (_, report) = bind_targets(&emitters, &ctx)?;

    assert_eq!(report.findings.len(), 2);
    assert!(report
        .findings
        .iter()
        .all(|f| f.emitter_a == consistency::CONTRACT && f.emitter_b == "reversed"));
    Ok(())
}

#[tokio::test]
async fn renders_every_target_into_memory() -> Result<()> {
    let description = description();
    let config = Config::new("petshop", "petshop.yaml", "out");
    let renderer = TemplateRenderer::embedded()?;
    let sink = Arc::new(MemorySink::new());

    let report = generate_from_description(&description, &config, &renderer, sink.clone()).await?;
    assert!(report.passed(true));
    assert_eq!(report.contracts, 4);

    let routes = sink.get("laravel/routes/api.php").unwrap();
    assert!(routes.contains("/pets/{id}/adopt"));
    assert!(routes.contains("security:bearerAuth,apiKey"));

    let handler = sink.get("slim/src/Handler/DeletePetHandler.php").unwrap();
    assert!(handler.contains("namespace Petshop\\Handler;"));

    assert!(sink.get("symfony/src/Controller/UpdatePetController.php").is_some());
    assert!(sink.get("symfony/src/Model/NewPet.php").is_some());
    Ok(())
}
