//! Template rendering.
//!
//! Every target's templates and manifest are compiled into the library.
//! A template directory can override any of them: `<dir>/<target>/<file>`
//! replaces the embedded file of the same name, and `<dir>/common/` does the
//! same for shared templates. The directory is looked up in this order:
//!
//! 1. an explicit path (`--template-dir`)
//! 2. the `CONTRACTGEN_TEMPLATE_DIR` environment variable
//! 3. `~/.contractgen/templates/`

mod kind;

pub use kind::*;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tera::{Context, Tera};

use crate::emit::php::{model_bindings, scheme_bindings, PhpTypeMapper};
use crate::emit::{
    Artifact, EmitContext, LaravelEmitter, OperationBinding, SlimEmitter, SymfonyEmitter,
};
use crate::error::{Error, Result};
use crate::manifest::{ForEach, TemplateFile, TemplateManifest};
use crate::utils::{to_lower_camel_case, to_snake_case, to_upper_camel_case};

pub const TEMPLATE_DIR_ENV: &str = "CONTRACTGEN_TEMPLATE_DIR";

macro_rules! embedded {
    ($($name:literal),* $(,)?) => {
        &[$(($name, include_str!(concat!("../../templates/", $name)))),*]
    };
}

/// Templates and manifests shipped with the library
const EMBEDDED: &[(&str, &str)] = embedded![
    "common/model.php.tera",
    "common/query_params.php.tera",
    "laravel/manifest.yaml",
    "laravel/routes.php.tera",
    "laravel/controller.php.tera",
    "laravel/handler.php.tera",
    "laravel/form_request.php.tera",
    "laravel/resource.php.tera",
    "laravel/security.php.tera",
    "laravel/middleware.php.tera",
    "symfony/manifest.yaml",
    "symfony/controller.php.tera",
    "symfony/handler.php.tera",
    "symfony/constraints.php.tera",
    "symfony/response.php.tera",
    "symfony/security.php.tera",
    "slim/manifest.yaml",
    "slim/routes.php.tera",
    "slim/handler.php.tera",
    "slim/service.php.tera",
    "slim/validator.php.tera",
    "slim/response.php.tera",
    "slim/middleware.php.tera",
    "slim/security_guard.php.tera",
];

const MANIFEST_FILE: &str = "manifest.yaml";

/// Renders bindings into artifacts with tera
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    tera: Tera,
    manifests: BTreeMap<TargetFramework, TemplateManifest>,
    template_dir: Option<PathBuf>,
}

impl TemplateRenderer {
    /// A renderer using only the embedded templates
    pub fn embedded() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        register_filters(&mut tera);

        let mut manifests = BTreeMap::new();
        let mut templates = Vec::new();
        for (name, content) in EMBEDDED {
            if name.ends_with(MANIFEST_FILE) {
                let manifest = TemplateManifest::parse(content)?;
                manifests.insert(manifest.target, manifest);
            } else {
                templates.push((*name, *content));
            }
        }
        tera.add_raw_templates(templates)?;

        Ok(Self {
            tera,
            manifests,
            template_dir: None,
        })
    }

    /// Embedded templates with overrides from the discovered template
    /// directory, if any
    pub async fn new(template_dir: Option<PathBuf>) -> Result<Self> {
        let mut renderer = Self::embedded()?;
        if let Some(dir) = Self::discover_dir(template_dir)? {
            renderer.apply_overrides(&dir).await?;
            renderer.template_dir = Some(dir);
        }
        Ok(renderer)
    }

    /// Resolve the override directory.
    ///
    /// An explicit directory must exist; the environment and home
    /// locations are used only when present.
    pub fn discover_dir(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
        if let Some(dir) = explicit {
            if !dir.is_dir() {
                return Err(Error::template(format!(
                    "Template directory not found: {}",
                    dir.display()
                )));
            }
            return Ok(Some(dir));
        }
        if let Ok(dir) = std::env::var(TEMPLATE_DIR_ENV) {
            let dir = PathBuf::from(dir);
            if dir.is_dir() {
                return Ok(Some(dir));
            }
            log::warn!(
                "{TEMPLATE_DIR_ENV} points to {} which is not a directory",
                dir.display()
            );
        }
        Ok(dirs::home_dir()
            .map(|home| home.join(".contractgen").join("templates"))
            .filter(|dir| dir.is_dir()))
    }

    async fn apply_overrides(&mut self, dir: &Path) -> Result<()> {
        let subdirs = std::iter::once("common").chain(TargetFramework::all().map(|t| t.as_str()));
        for sub in subdirs {
            let path = dir.join(sub);
            if !path.is_dir() {
                continue;
            }
            let mut entries = tokio::fs::read_dir(&path).await?;
            let mut overrides = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                let file_name = entry.file_name().to_string_lossy().into_owned();
                if !entry.file_type().await?.is_file() {
                    continue;
                }
                if file_name == MANIFEST_FILE {
                    let manifest = TemplateManifest::load_from_dir(&path).await?;
                    log::info!("using manifest override for {}", manifest.target);
                    self.manifests.insert(manifest.target, manifest);
                } else if file_name.ends_with(".tera") {
                    let content = tokio::fs::read_to_string(entry.path()).await?;
                    overrides.push((format!("{sub}/{file_name}"), content));
                }
            }
            overrides.sort();
            for (name, content) in overrides {
                log::info!("template override: {name}");
                self.tera.add_raw_template(&name, &content)?;
            }
        }
        Ok(())
    }

    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }

    pub fn manifest(&self, target: TargetFramework) -> Result<&TemplateManifest> {
        self.manifests
            .get(&target)
            .ok_or_else(|| Error::template(format!("No manifest for target {target}")))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render every manifest file of `target`
    pub fn render_target(
        &self,
        target: TargetFramework,
        bindings: &[OperationBinding],
        ctx: &EmitContext<'_>,
    ) -> Result<Vec<Artifact>> {
        let manifest = self.manifest(target)?;
        let model_namespace = match target {
            TargetFramework::Laravel => LaravelEmitter::model_namespace(ctx.namespace),
            TargetFramework::Symfony => SymfonyEmitter::model_namespace(ctx.namespace),
            TargetFramework::Slim => SlimEmitter::model_namespace(ctx.namespace),
        };
        let mapper = PhpTypeMapper::new(ctx.contracts.schemas(), model_namespace.clone());
        let models = model_bindings(ctx.contracts.schemas(), &mapper);
        let schemes = scheme_bindings(ctx.contracts);

        let mut base = Context::new();
        base.insert("namespace", ctx.namespace);
        base.insert("model_namespace", &model_namespace);
        base.insert("title", ctx.title);
        base.insert("version", ctx.version);
        base.insert("target", &target);
        base.insert("operations", bindings);
        base.insert("schemes", &schemes);
        base.insert("models", &models);

        let mut artifacts = Vec::new();
        for file in &manifest.files {
            let mut file_ctx = base.clone();
            file_ctx.insert("file", &file.context);
            match file.for_each {
                None => artifacts.push(self.render_file(target, file, &file_ctx)?),
                Some(ForEach::Operation) => {
                    for op in bindings.iter().filter(|op| requirement_met(file, op)) {
                        let mut item = file_ctx.clone();
                        item.insert("op", op);
                        artifacts.push(self.render_file(target, file, &item)?);
                    }
                }
                Some(ForEach::Response) => {
                    for op in bindings.iter().filter(|op| requirement_met(file, op)) {
                        for response in &op.responses {
                            let mut item = file_ctx.clone();
                            item.insert("op", op);
                            item.insert("response", response);
                            artifacts.push(self.render_file(target, file, &item)?);
                        }
                    }
                }
                Some(ForEach::Scheme) => {
                    artifacts.extend(self.render_each(target, file, &file_ctx, "scheme", &schemes)?)
                }
                Some(ForEach::Model) => {
                    artifacts.extend(self.render_each(target, file, &file_ctx, "model", &models)?)
                }
            }
        }
        log::debug!("{target}: rendered {} artifact(s)", artifacts.len());
        Ok(artifacts)
    }

    fn render_each<T: Serialize>(
        &self,
        target: TargetFramework,
        file: &TemplateFile,
        context: &Context,
        key: &str,
        items: &[T],
    ) -> Result<Vec<Artifact>> {
        items
            .iter()
            .map(|value| {
                let mut item = context.clone();
                item.insert(key, value);
                self.render_file(target, file, &item)
            })
            .collect()
    }

    fn render_file(
        &self,
        target: TargetFramework,
        file: &TemplateFile,
        context: &Context,
    ) -> Result<Artifact> {
        let destination = Tera::one_off(&file.destination, context, false).map_err(|e| {
            Error::template(format!(
                "Failed to render destination '{}': {}",
                file.destination, e
            ))
        })?;
        let contents = self.tera.render(&file.source, context).map_err(|e| {
            log::error!("template rendering failed for '{}': {:?}", file.source, e);
            Error::template(format!(
                "Failed to render template '{}': {}",
                file.source,
                error_chain(&e)
            ))
        })?;
        Ok(Artifact {
            target,
            relative_path: PathBuf::from(destination.trim()),
            contents,
        })
    }
}

fn requirement_met(file: &TemplateFile, op: &OperationBinding) -> bool {
    file.requires
        .as_ref()
        .map_or(true, |key| op.classes.contains_key(key))
}

/// Tera hides the root cause behind its own message
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn string_filter(
    f: fn(&str) -> String,
) -> impl Fn(&JsonValue, &HashMap<String, JsonValue>) -> tera::Result<JsonValue> + Sync + Send {
    move |value, _| match value.as_str() {
        Some(s) => Ok(json!(f(s))),
        None => Err(tera::Error::msg("expected a string")),
    }
}

fn register_filters(tera: &mut Tera) {
    tera.register_filter("upper_camel", string_filter(to_upper_camel_case));
    tera.register_filter("lower_camel", string_filter(to_lower_camel_case));
    tera.register_filter("snake", string_filter(to_snake_case));
}
