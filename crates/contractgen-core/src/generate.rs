//! Generation pipeline.
//!
//! description → contracts → per-target bindings → consistency report →
//! artifacts → sink. Contract violations abort before anything is rendered;
//! consistency findings, including a binding that strays from its contract,
//! do not abort, they mark the report failed.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::consistency::{self, ConsistencyReport};
use crate::contract::{build_contracts, ContractSet};
use crate::description::ApiDescription;
use crate::emit::{
    bind_checked, emitters_for, Artifact, EmitContext, OperationBinding, PublicSurface,
    TargetEmitter,
};
use crate::error::{Error, Result};
use crate::sink::{artifact_path, ArtifactSink};
use crate::templates::{TargetFramework, TemplateRenderer};

/// Every binding of one target, in contract order
#[derive(Debug, Clone, Serialize)]
pub struct TargetBindings {
    pub target: TargetFramework,
    pub emitter: String,
    pub bindings: Vec<OperationBinding>,
}

/// Bind every contract for every emitter and compare the public surfaces
/// with the contracts and with each other
pub fn bind_targets(
    emitters: &[Box<dyn TargetEmitter>],
    ctx: &EmitContext<'_>,
) -> Result<(Vec<TargetBindings>, ConsistencyReport)> {
    let bound = emitters
        .par_iter()
        .map(|emitter| {
            let bindings = ctx
                .contracts
                .contracts()
                .iter()
                .map(|contract| bind_checked(emitter.as_ref(), contract, ctx))
                .collect::<Result<Vec<_>>>()?;
            log::debug!("{}: bound {} operation(s)", emitter.name(), bindings.len());
            Ok(TargetBindings {
                target: emitter.target(),
                emitter: emitter.name(),
                bindings,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let surfaces: Vec<(String, Vec<PublicSurface>)> = bound
        .iter()
        .map(|t| {
            let surfaces = t.bindings.iter().map(PublicSurface::from_binding).collect();
            (t.emitter.clone(), surfaces)
        })
        .collect();
    let report = consistency::validate_against(ctx.contracts, &surfaces);
    Ok((bound, report))
}

/// Files written for one target
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutput {
    pub target: TargetFramework,
    /// Paths relative to the sink root
    pub artifacts: Vec<PathBuf>,
}

/// Summary of one generation run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub contracts: usize,
    pub targets: Vec<TargetOutput>,
    pub consistency: ConsistencyReport,
}

impl GenerationReport {
    /// Whether the run passes under `fail_on_inconsistency`
    pub fn passed(&self, fail_on_inconsistency: bool) -> bool {
        !fail_on_inconsistency || self.consistency.is_clean()
    }
}

/// Main entry point: load the description and templates named by
/// `config`, then generate into `sink`
pub async fn generate(config: &Config, sink: Arc<dyn ArtifactSink>) -> Result<GenerationReport> {
    config.validate()?;

    // 1. Load the description
    log::info!("{}: loading {}", config.project_name, config.input_path);
    let description = ApiDescription::from_file_or_url(&config.input_path).await?;

    // 2. Templates, with overrides if a directory is configured or discovered
    let renderer = TemplateRenderer::new(config.template_dir.as_ref().map(PathBuf::from)).await?;
    if let Some(dir) = renderer.template_dir() {
        log::info!("using template overrides from {}", dir.display());
    }

    // 3. Build, bind, render, write
    generate_from_description(&description, config, &renderer, sink).await
}

/// Generate from an already loaded description
pub async fn generate_from_description(
    description: &ApiDescription,
    config: &Config,
    renderer: &TemplateRenderer,
    sink: Arc<dyn ArtifactSink>,
) -> Result<GenerationReport> {
    let emitters = emitters_for(&config.targets);
    generate_with_emitters(description, config, &emitters, renderer, sink).await
}

/// Generate with an explicit emitter list; the first one is the baseline
pub async fn generate_with_emitters(
    description: &ApiDescription,
    config: &Config,
    emitters: &[Box<dyn TargetEmitter>],
    renderer: &TemplateRenderer,
    sink: Arc<dyn ArtifactSink>,
) -> Result<GenerationReport> {
    let contracts = build_contracts(description, config.build_options())?;
    log::info!("built {} contract(s)", contracts.len());

    let namespace = config
        .namespace
        .clone()
        .unwrap_or_else(|| description.namespace());
    let ctx = EmitContext::new(&contracts, &namespace)
        .with_info(&description.info.title, &description.info.version);

    let (bound, consistency) = bind_targets(emitters, &ctx)?;
    if !consistency.is_clean() {
        log::warn!(
            "{} consistency finding(s) across targets",
            consistency.findings.len()
        );
    }

    let rendered = render_targets(emitters, &bound, &ctx, renderer)?;
    let targets = write_targets(rendered, sink).await?;

    Ok(GenerationReport {
        contracts: contracts.len(),
        targets,
        consistency,
    })
}

/// Bind and compare without rendering or writing
pub fn check(
    description: &ApiDescription,
    config: &Config,
) -> Result<(ContractSet, Vec<TargetBindings>, ConsistencyReport)> {
    let contracts = build_contracts(description, config.build_options())?;
    let namespace = config
        .namespace
        .clone()
        .unwrap_or_else(|| description.namespace());
    let emitters = emitters_for(&config.targets);
    let ctx = EmitContext::new(&contracts, &namespace);
    let (bound, report) = bind_targets(&emitters, &ctx)?;
    Ok((contracts, bound, report))
}

fn render_targets(
    emitters: &[Box<dyn TargetEmitter>],
    bound: &[TargetBindings],
    ctx: &EmitContext<'_>,
    renderer: &TemplateRenderer,
) -> Result<Vec<(TargetFramework, Vec<Artifact>)>> {
    emitters
        .par_iter()
        .zip(bound.par_iter())
        .map(|(emitter, target)| {
            let artifacts = emitter.render(&target.bindings, ctx, renderer)?;
            log::info!("{}: rendered {} file(s)", emitter.name(), artifacts.len());
            Ok((emitter.target(), artifacts))
        })
        .collect()
}

/// One blocking writer per target; targets are written concurrently
async fn write_targets(
    rendered: Vec<(TargetFramework, Vec<Artifact>)>,
    sink: Arc<dyn ArtifactSink>,
) -> Result<Vec<TargetOutput>> {
    let writers = rendered.into_iter().map(|(target, artifacts)| {
        let sink = Arc::clone(&sink);
        tokio::task::spawn_blocking(move || -> Result<TargetOutput> {
            let mut written = Vec::with_capacity(artifacts.len());
            for artifact in &artifacts {
                sink.write(artifact)?;
                written.push(artifact_path(artifact)?);
            }
            Ok(TargetOutput {
                target,
                artifacts: written,
            })
        })
    });

    try_join_all(writers)
        .await
        .map_err(|e| Error::emit(format!("artifact writer failed: {e}")))?
        .into_iter()
        .collect()
}
