//! Cross-reference resolution: import classification and SDK path layout.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use git2::Repository;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::GeneratorConfig;
use crate::error::SdkGenError;
use crate::file::syntax::ImportSpec;
use crate::model::{ImportBinding, ImportClass, SourcePos};

/// Extracts the repository path from scp-style and URL-style git remotes.
static REMOTE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.-]*://)?(?:[^@/]+@)?[^/:]+(?::\d+)?[:/](?P<path>.+?)(?:\.git)?/?$")
        .expect("Invalid remote URL regex")
});

/// Where generated SDK code is published and how it is imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMode {
    /// Inside the project's own module.
    #[default]
    Local,
    /// In the shared SDK repository, under the project's remote path.
    Publish,
    /// In the shared SDK repository, under the module base name.
    Legacy,
}

impl FromStr for DistributionMode {
    type Err = SdkGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "publish" => Ok(Self::Publish),
            "legacy" => Ok(Self::Legacy),
            other => Err(SdkGenError::Config(format!(
                "unknown distribution mode `{other}` (expected local, publish or legacy)"
            ))),
        }
    }
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Publish => "publish",
            Self::Legacy => "legacy",
        })
    }
}

/// Facts about the Go project being generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    /// Module path from `go.mod`.
    pub module: String,
    /// Last segment of the module path.
    pub base_name: String,
    /// Repository path from the git remote (publish mode only).
    pub project_path: Option<String>,
    /// Import path of the typespec package.
    pub typespec_import: String,
}

impl ProjectLayout {
    /// Reads `go.mod` and, in publish mode, the git remote.
    ///
    /// ## Errors
    /// Returns `Io` when `go.mod` is missing, `Config` when it has no module
    /// line or the remote URL is unusable, and `Git` when the remote cannot be read.
    #[instrument(skip(root, config), fields(root = %root.display()))]
    pub fn discover(
        root: &Path,
        config: &GeneratorConfig,
        mode: DistributionMode,
    ) -> Result<Self, SdkGenError> {
        let go_mod = root.join("go.mod");
        let text = std::fs::read_to_string(&go_mod).map_err(|source| SdkGenError::io(&go_mod, source))?;
        let module = module_name(&text).ok_or_else(|| {
            SdkGenError::Config(format!("`{}` has no module directive", go_mod.display()))
        })?;

        let project_path = match mode {
            DistributionMode::Publish => Some(remote_project_path(root, &config.remote)?),
            DistributionMode::Local | DistributionMode::Legacy => None,
        };

        let layout = Self::from_parts(root, &module, project_path, config);
        debug!(module = %layout.module, base = %layout.base_name, "discovered project layout");
        Ok(layout)
    }

    pub fn from_parts(
        root: &Path,
        module: &str,
        project_path: Option<String>,
        config: &GeneratorConfig,
    ) -> Self {
        let typespec_dir = config
            .typespec_dir
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        Self {
            root: root.to_path_buf(),
            module: module.to_string(),
            base_name: module.rsplit('/').next().unwrap_or(module).to_string(),
            project_path,
            typespec_import: format!("{module}/{typespec_dir}"),
        }
    }

    /// Classifies an import path relative to this module.
    ///
    /// Only the typespec package itself is shared; its sub-packages hold other
    /// resources and count as internal.
    pub fn classify_import(&self, path: &str) -> ImportClass {
        let under = |prefix: &str| path == prefix || path.starts_with(&format!("{prefix}/"));

        if path == self.typespec_import {
            ImportClass::InternalTypespec
        } else if under(&self.module) {
            ImportClass::InternalOther
        } else {
            ImportClass::External
        }
    }

    /// Classifies every import of a type file.
    ///
    /// ## Errors
    /// Returns `Resolution` for the first import that reaches into a
    /// non-typespec package of this module.
    pub fn bind_imports(
        &self,
        path: &Path,
        imports: &[ImportSpec],
    ) -> Result<Vec<ImportBinding>, SdkGenError> {
        imports
            .iter()
            .map(|spec| {
                let class = self.classify_import(&spec.path);
                if class == ImportClass::InternalOther {
                    return Err(SdkGenError::Resolution {
                        path: path.to_path_buf(),
                        line: spec.line,
                        import: spec.path.clone(),
                    });
                }

                Ok(ImportBinding {
                    alias: spec.local_name().to_string(),
                    path: spec.path.clone(),
                    class,
                    pos: SourcePos {
                        path: path.to_path_buf(),
                        line: spec.line,
                    },
                })
            })
            .collect()
    }
}

/// Import prefix and output directory of the generated SDK for one mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdkTarget {
    pub mode: DistributionMode,
    /// Go import path of the SDK root package.
    pub import_prefix: String,
    /// Directory the Go SDK is written to.
    pub output_dir: PathBuf,
    /// Package name of the SDK root (the factory file).
    pub root_package: String,
    /// Package name of the emitted base spec.
    pub shared_package: String,
}

impl SdkTarget {
    /// Resolves the target for a mode.
    ///
    /// ## Errors
    /// Returns `Config` when publish or legacy mode lacks `publish_root` or
    /// `publish_dir`, or publish mode lacks a project path.
    pub fn resolve(
        layout: &ProjectLayout,
        config: &GeneratorConfig,
        mode: DistributionMode,
    ) -> Result<Self, SdkGenError> {
        let base = layout.base_name.replace('-', "");

        let (import_prefix, output_dir, root_package) = match mode {
            DistributionMode::Local => (
                format!("{}/sdk/{base}", layout.module),
                layout.root.join("sdk").join(&base),
                base.clone(),
            ),
            DistributionMode::Publish => {
                let project = layout.project_path.as_deref().ok_or_else(|| {
                    SdkGenError::Config("publish mode needs the project's git remote path".into())
                })?;
                let project = project.replace('-', "");
                let (root, dir) = publish_settings(config, mode)?;
                let package = project.rsplit('/').next().unwrap_or(&project).to_string();
                (format!("{root}/{project}"), dir.join(&project), package)
            }
            DistributionMode::Legacy => {
                let (root, dir) = publish_settings(config, mode)?;
                (format!("{root}/{base}"), dir.join(&base), base.clone())
            }
        };

        Ok(Self {
            mode,
            import_prefix,
            output_dir,
            root_package,
            shared_package: config.shared_package.clone(),
        })
    }

    /// Import path of the emitted base spec package.
    pub fn shared_import(&self) -> String {
        format!("{}/{}", self.import_prefix, self.shared_package)
    }

    /// Import path of one resource's generated package.
    pub fn resource_import(&self, package: &str) -> String {
        format!("{}/{package}", self.import_prefix)
    }
}

fn publish_settings(
    config: &GeneratorConfig,
    mode: DistributionMode,
) -> Result<(String, PathBuf), SdkGenError> {
    let root = config
        .publish_root
        .as_deref()
        .map(|r| r.trim_end_matches('/').to_string())
        .ok_or_else(|| SdkGenError::Config(format!("{mode} mode needs `publish_root`")))?;
    let dir = config
        .publish_dir
        .clone()
        .ok_or_else(|| SdkGenError::Config(format!("{mode} mode needs `publish_dir`")))?;
    Ok((root, dir))
}

/// The `module` directive of a `go.mod` file.
///
/// ```
/// use sdkgen_lib::resolve::module_name;
/// assert_eq!(
///     module_name("// header\nmodule example.com/shop // main\n\ngo 1.21\n").as_deref(),
///     Some("example.com/shop")
/// );
/// ```
pub fn module_name(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.split("//").next().unwrap_or_default().trim();
        let name = rest.trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Repository path (`group/project`) of a remote URL.
///
/// ```
/// use sdkgen_lib::resolve::remote_path;
/// assert_eq!(remote_path("git@github.com:acme/shop-api.git").as_deref(), Some("acme/shop-api"));
/// assert_eq!(remote_path("https://gitlab.example.com/team/shop.git").as_deref(), Some("team/shop"));
/// ```
pub fn remote_path(url: &str) -> Option<String> {
    REMOTE_PATH_RE
        .captures(url.trim())
        .and_then(|caps| caps.name("path"))
        .map(|m| m.as_str().to_string())
}

fn remote_project_path(root: &Path, remote: &str) -> Result<String, SdkGenError> {
    let git_err = |source| SdkGenError::Git {
        path: root.to_path_buf(),
        source,
    };
    let repo = Repository::discover(root).map_err(git_err)?;
    let remote = repo.find_remote(remote).map_err(git_err)?;
    let url = remote
        .url()
        .ok_or_else(|| SdkGenError::Config("remote URL is not valid UTF-8".into()))?;

    remote_path(url)
        .ok_or_else(|| SdkGenError::Config(format!("cannot derive a project path from remote `{url}`")))
}
