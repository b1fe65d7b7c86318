//! Renders the Interface Model into SDK source files.
//!
//! Each target dialect implements [`Emitter`]. Emitters are pure functions of
//! the model and an [`EmitContext`]; validation and writing happen in
//! [`crate::output`].

pub mod golang;
pub mod php;
pub mod tags;
pub mod writer;

use std::path::PathBuf;

use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::model::{ResourceModel, SharedModel};
use crate::resolve::SdkTarget;

pub use golang::GoEmitter;
pub use php::PhpEmitter;

/// Name written into every generated-file header.
pub const GENERATOR_NAME: &str = "sdkgen";

/// Target language of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Go,
    Php,
}

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
    pub dialect: Dialect,
}

/// Naming and path options shared by every emitter call of a run.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    pub target: &'a SdkTarget,
    pub config: &'a GeneratorConfig,
    /// The project's shared base model, when the base file exists.
    pub shared: Option<&'a SharedModel>,
}

/// Renders one dialect.
pub trait Emitter {
    fn dialect(&self) -> Dialect;

    /// Type and client files for one resource.
    fn emit_resource(&self, resource: &ResourceModel, ctx: &EmitContext<'_>) -> Vec<GeneratedFile>;

    /// Files derived from the project-wide shared base file.
    fn emit_shared(&self, shared: &SharedModel, ctx: &EmitContext<'_>) -> Vec<GeneratedFile>;

    /// The aggregator exposing every resource's service.
    fn emit_factory(&self, resources: &[ResourceModel], ctx: &EmitContext<'_>) -> Vec<GeneratedFile>;
}
