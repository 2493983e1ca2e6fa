//! Manifest format for target templates.
//!
//! Every target ships a `manifest.yaml` listing the files to render. A file
//! is rendered once, or once per operation, response variant, security
//! scheme or model.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::templates::TargetFramework;

/// The root manifest structure for a target's templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateManifest {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: String,

    pub target: TargetFramework,

    /// Files to generate, rendered in this order
    pub files: Vec<TemplateFile>,
}

/// What a file is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForEach {
    Operation,
    Response,
    Scheme,
    Model,
}

/// Describes a single file to be generated from a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFile {
    /// Template name, e.g. `laravel/controller.php.tera`
    pub source: String,

    /// Destination relative to the target directory; itself a template
    /// (`app/Http/Controllers/{{ op.classes.controller }}.php`)
    pub destination: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_each: Option<ForEach>,

    /// Class key an operation binding must define for the file to be
    /// rendered for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,

    /// Extra values exposed to the template as `file`
    #[serde(default)]
    pub context: serde_json::Value,
}

impl TemplateManifest {
    pub fn parse(content: &str) -> crate::Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| crate::Error::template(format!("Invalid template manifest: {e}")))
    }

    /// Load `manifest.yaml` from a directory
    pub async fn load_from_dir(template_dir: &Path) -> crate::Result<Self> {
        let manifest_path = template_dir.join("manifest.yaml");
        log::debug!("reading manifest {}", manifest_path.display());
        let content = fs::read_to_string(&manifest_path).await.map_err(|e| {
            crate::Error::template(format!(
                "Failed to read template manifest at {}: {}",
                manifest_path.display(),
                e
            ))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            crate::Error::template(format!(
                "Invalid YAML in template manifest at {}: {}",
                manifest_path.display(),
                e
            ))
        })
    }

    /// Template names the manifest refers to
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.source.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"
name: laravel
target: laravel
files:
  - source: laravel/routes.php.tera
    destination: routes/api.php
  - source: laravel/form_request.php.tera
    destination: "app/Http/Requests/{{ op.classes.form_request }}.php"
    for_each: operation
    requires: form_request
  - source: common/query_params.php.tera
    destination: "app/Http/Requests/{{ op.classes.query_params }}.php"
    for_each: operation
    requires: query_params
    context: { namespace: Http\Requests }
"#;

    #[test]
    fn parses_manifest() {
        let manifest = TemplateManifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.target, TargetFramework::Laravel);
        assert_eq!(manifest.files.len(), 3);
        assert_eq!(manifest.files[0].for_each, None);
        assert_eq!(manifest.files[1].for_each, Some(ForEach::Operation));
        assert_eq!(manifest.files[1].requires.as_deref(), Some("form_request"));
        assert_eq!(manifest.files[2].context["namespace"], "Http\\Requests");
    }

    #[test]
    fn rejects_unknown_for_each() {
        let err = TemplateManifest::parse(
            "name: x\ntarget: slim\nfiles:\n  - { source: a, destination: b, for_each: endpoint }\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid template manifest"));
    }

    #[tokio::test]
    async fn loads_from_dir() -> crate::Result<()> {
        let dir = tempdir()?;
        tokio::fs::write(dir.path().join("manifest.yaml"), MANIFEST).await?;
        let manifest = TemplateManifest::load_from_dir(dir.path()).await?;
        assert_eq!(manifest.name, "laravel");

        let empty = tempdir()?;
        assert!(TemplateManifest::load_from_dir(empty.path()).await.is_err());
        Ok(())
    }
}
