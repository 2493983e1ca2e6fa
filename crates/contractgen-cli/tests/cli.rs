//! End-to-end tests for the contractgen CLI

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Output};

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn contractgen(args: &[&str]) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_contractgen"))
        .args(args)
        .env_remove("CONTRACTGEN_TEMPLATE_DIR")
        .output()
        .context("Failed to run contractgen")
}

#[test]
fn contracts_prints_canonical_json() -> Result<()> {
    let output = contractgen(&["contracts", "--input", &fixture("petstore.yaml")])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let contracts: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let ids: Vec<&str> = contracts
        .as_array()
        .context("expected a list")?
        .iter()
        .filter_map(|c| c["operation_id"].as_str())
        .collect();
    assert_eq!(ids, vec!["findPets", "addPet", "getPet", "deletePet"]);

    let delete = &contracts[3];
    let statuses: Vec<u64> = delete["responses"]
        .as_array()
        .context("expected variants")?
        .iter()
        .filter_map(|v| v["status_code"].as_u64())
        .collect();
    assert_eq!(statuses, vec![204, 401, 404, 500]);
    assert_eq!(delete["tags"], serde_json::json!(["pets"]));
    Ok(())
}

#[test]
fn generate_writes_every_target_and_a_clean_report() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out");
    let report = dir.path().join("report.json");

    let output = contractgen(&[
        "generate",
        "--input",
        &fixture("petstore.yaml"),
        "--output-dir",
        &out.to_string_lossy(),
        "--report",
        &report.to_string_lossy(),
    ])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    for path in [
        "laravel/routes/api.php",
        "laravel/app/Http/Controllers/AddPetController.php",
        "laravel/app/Http/Middleware/EnforceSecurity.php",
        "symfony/src/Controller/DeletePetController.php",
        "symfony/src/Model/PetStatus.php",
        "slim/config/routes.php",
        "slim/src/Handler/FindPetsHandler.php",
        "slim/src/Middleware/ApiKeyMiddleware.php",
    ] {
        assert!(out.join(path).is_file(), "missing {path}");
    }

    let routes = std::fs::read_to_string(out.join("laravel/routes/api.php"))?;
    assert!(routes.contains("->middleware('security:bearerAuth,apiKey')"));

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(report)?)?;
    assert_eq!(report["findings"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[test]
fn check_fails_on_contract_errors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("broken.yaml");
    std::fs::write(
        &input,
        r#"
info: { title: Broken }
operations:
  - operationId: getPet
    method: get
    path: /pets/{id}
    responses: { "404": {} }
  - operationId: getPet
    method: get
    path: /pets
    responses: { "200": {} }
"#,
    )?;

    let output = contractgen(&["check", "--input", &input.to_string_lossy()])?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate operationId 'getPet'"), "{stderr}");
    Ok(())
}

#[test]
fn check_passes_for_a_consistent_description() -> Result<()> {
    let output = contractgen(&[
        "check",
        "--input",
        &fixture("petstore.yaml"),
        "--target",
        "laravel,slim",
    ])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("4 contract(s), 2 target(s)"));
    assert!(stdout.contains("targets are consistent (laravel, slim)"));
    Ok(())
}

#[test]
fn input_is_required_without_config() -> Result<()> {
    let output = contractgen(&["contracts"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--input is required"));
    Ok(())
}
