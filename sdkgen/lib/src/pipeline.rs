//! End-to-end generation: walk, extract, emit, validate, write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::GeneratorConfig;
use crate::emit::{EmitContext, Emitter, GeneratedFile, GoEmitter, PhpEmitter};
use crate::error::SdkGenError;
use crate::extract::Extractor;
use crate::model::{ResourceModel, SharedModel};
use crate::output;
use crate::resolve::{DistributionMode, ProjectLayout, SdkTarget};
use crate::walker::SourceWalker;

/// What a single `generate` run should do.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// Explicit type files. Relative paths that do not exist from the
    /// working directory are looked up under the project root.
    pub inputs: Vec<PathBuf>,
    /// Process every eligible type file under the typespec directory.
    pub all: bool,
    /// Go output directory; defaults to the mode's SDK directory.
    pub go_out: Option<PathBuf>,
    /// PHP output directory. No PHP is produced without one.
    pub php_out: Option<PathBuf>,
    pub no_go: bool,
    pub dry_run: bool,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateSummary {
    pub mode: DistributionMode,
    /// Resource names in processing order.
    pub resources: Vec<String>,
    /// Files written, or planned on a dry run.
    pub files: Vec<PathBuf>,
    pub dry_run: bool,
}

/// Drives generation for one Go project.
#[derive(Debug, Clone)]
pub struct SdkGenerator {
    root: PathBuf,
    config: GeneratorConfig,
    mode: DistributionMode,
}

impl SdkGenerator {
    pub fn new(root: impl Into<PathBuf>, config: GeneratorConfig, mode: DistributionMode) -> Self {
        Self {
            root: root.into(),
            config,
            mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Generates the SDK for the requested type files.
    ///
    /// Every input is extracted and every file rendered and validated before
    /// the first byte is written, so a failing run leaves the output
    /// directories untouched.
    ///
    /// ## Errors
    /// Returns the first error raised by discovery, extraction, emission
    /// or writing. Requesting neither inputs nor `all` is a `Config` error.
    #[instrument(skip(self, request), fields(root = %self.root.display(), mode = %self.mode))]
    pub fn run(&self, request: &GenerateRequest) -> Result<GenerateSummary, SdkGenError> {
        let layout = ProjectLayout::discover(&self.root, &self.config, self.mode)?;
        let target = SdkTarget::resolve(&layout, &self.config, self.mode)?;
        let extractor = Extractor::new(&layout, &self.config);

        let shared = self.extract_shared(&extractor)?;
        let inputs = self.select_inputs(request)?;

        let mut resources = Vec::with_capacity(inputs.len());
        for input in &inputs {
            resources.push(extractor.extract_resource(input, shared.as_ref())?);
        }
        check_output_packages(&resources)?;

        let ctx = EmitContext {
            target: &target,
            config: &self.config,
            shared: shared.as_ref(),
        };

        let mut emitters: Vec<Box<dyn Emitter>> = Vec::new();
        if !request.no_go {
            let out = request.go_out.clone().unwrap_or_else(|| target.output_dir.clone());
            emitters.push(Box::new(GoEmitter::new(out)));
        }
        if let Some(out) = &request.php_out {
            emitters.push(Box::new(PhpEmitter::new(out)));
        }

        let files = render(&emitters, &resources, shared.as_ref(), &ctx);
        let written = output::write_all(&files, request.dry_run)?;

        info!(
            resources = resources.len(),
            files = written.len(),
            dry_run = request.dry_run,
            "generation finished"
        );
        Ok(GenerateSummary {
            mode: self.mode,
            resources: resources.into_iter().map(|r| r.resource).collect(),
            files: written,
            dry_run: request.dry_run,
        })
    }

    /// Extracts one type file and its route file without emitting anything.
    ///
    /// ## Errors
    /// Returns the same extraction errors as [`Self::run`].
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn inspect(&self, path: &Path) -> Result<ResourceModel, SdkGenError> {
        let layout = ProjectLayout::discover(&self.root, &self.config, DistributionMode::Local)?;
        let extractor = Extractor::new(&layout, &self.config);
        let shared = self.extract_shared(&extractor)?;
        extractor.extract_resource(&self.locate(path), shared.as_ref())
    }

    fn extract_shared(&self, extractor: &Extractor<'_>) -> Result<Option<SharedModel>, SdkGenError> {
        let base = self.config.base_path(&self.root);
        if !base.is_file() {
            debug!(base = %base.display(), "no shared base file");
            return Ok(None);
        }
        extractor.extract_shared(&base).map(Some)
    }

    fn select_inputs(&self, request: &GenerateRequest) -> Result<Vec<PathBuf>, SdkGenError> {
        let walker = SourceWalker::new(&self.config);

        if request.all {
            return walker.eligible_files(&self.config.typespec_root(&self.root));
        }
        if request.inputs.is_empty() {
            return Err(SdkGenError::Config(
                "no type files given (pass paths or select all files)".into(),
            ));
        }

        let mut inputs = Vec::with_capacity(request.inputs.len());
        for input in &request.inputs {
            let path = self.locate(input);
            if !walker.is_eligible(&path) {
                return Err(SdkGenError::validation(
                    &path,
                    0,
                    "not an eligible type file",
                ));
            }
            if !path.is_file() {
                return Err(SdkGenError::io(
                    &path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "type file not found"),
                ));
            }
            inputs.push(path);
        }
        inputs.sort();
        inputs.dedup();
        Ok(inputs)
    }

    fn locate(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Two type files that flatten to the same Go package would overwrite
/// each other's output.
fn check_output_packages(resources: &[ResourceModel]) -> Result<(), SdkGenError> {
    let mut seen: BTreeMap<String, &Path> = BTreeMap::new();
    for resource in resources {
        let package = resource.output_package();
        if let Some(first) = seen.insert(package.clone(), &resource.source) {
            return Err(SdkGenError::validation(
                &resource.source,
                0,
                format!(
                    "output package `{package}` is also produced by `{}`",
                    first.display()
                ),
            ));
        }
    }
    Ok(())
}

fn render(
    emitters: &[Box<dyn Emitter>],
    resources: &[ResourceModel],
    shared: Option<&SharedModel>,
    ctx: &EmitContext<'_>,
) -> Vec<GeneratedFile> {
    let mut files = Vec::new();
    for emitter in emitters {
        if let Some(shared) = shared {
            files.extend(emitter.emit_shared(shared, ctx));
        }
        for resource in resources {
            files.extend(emitter.emit_resource(resource, ctx));
        }
        files.extend(emitter.emit_factory(resources, ctx));
        debug!(dialect = ?emitter.dialect(), total = files.len(), "rendered dialect");
    }
    files
}
