//! contractgen core library
//!
//! This library turns a normalized API description into canonical operation
//! contracts and emits PHP server scaffolding for Laravel, Symfony and Slim
//! from the same contracts, checking that the targets agree.

pub mod config;
pub mod consistency;
pub mod contract;
pub mod description;
pub mod emit;
pub mod error;
pub mod generate;
pub mod manifest;
pub mod responses;
pub mod rules;
pub mod schema;
pub mod security;
pub mod sink;
pub mod templates;
pub mod utils;

pub use crate::{
    config::Config,
    consistency::{ConsistencyReport, InconsistencyFinding},
    contract::{build_contracts, BuildOptions, ContractSet, OperationContract},
    description::ApiDescription,
    emit::{Artifact, OperationBinding, PublicSurface, TargetEmitter},
    error::{ContractError, ContractViolations, Error, Result},
    generate::{generate, GenerationReport},
    security::SecuritySemantics,
    sink::{ArtifactSink, DirectorySink, MemorySink},
    templates::{TargetFramework, TemplateRenderer},
};
