use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::SdkGenError;

/// Name of the optional project-level configuration file.
pub const CONFIG_FILE: &str = "sdkgen.toml";

/// Settings for one generation run.
///
/// Every key is optional in `sdkgen.toml`; missing keys take the defaults
/// of the conventional `api/typespec` + `api/rest` project layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub typespec_dir: PathBuf,
    pub rest_dir: PathBuf,
    /// Project-wide shared type file, relative to `typespec_dir`.
    pub base_file: String,
    pub exclude_files: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub test_suffix: String,
    /// Package name of the emitted base spec.
    pub shared_package: String,
    /// Import root of the shared SDK repository (publish and legacy modes).
    pub publish_root: Option<String>,
    /// Local checkout of the shared SDK repository (publish and legacy modes).
    pub publish_dir: Option<PathBuf>,
    pub remote: String,
    pub whitelist: Whitelist,
    pub go: GoOptions,
    pub php: PhpOptions,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            typespec_dir: PathBuf::from("api/typespec"),
            rest_dir: PathBuf::from("api/rest"),
            base_file: "base.go".to_string(),
            exclude_files: ["base.go", "readme.md", "rest", "api.go", "router.go"]
                .into_iter()
                .map(String::from)
                .collect(),
            exclude_dirs: Vec::new(),
            test_suffix: "_test.go".to_string(),
            shared_package: "basespec".to_string(),
            publish_root: None,
            publish_dir: None,
            remote: "origin".to_string(),
            whitelist: Whitelist::default(),
            go: GoOptions::default(),
            php: PhpOptions::default(),
        }
    }
}

/// Package aliases API fields may reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Whitelist {
    pub orm_aliases: Vec<String>,
    pub time_aliases: Vec<String>,
}

impl Default for Whitelist {
    fn default() -> Self {
        Self {
            orm_aliases: vec!["orm".to_string()],
            time_aliases: vec!["time".to_string()],
        }
    }
}

impl Whitelist {
    /// ORM and time references are carried as strings on the wire.
    pub fn widens_to_string(&self, alias: &str) -> bool {
        self.orm_aliases.iter().chain(&self.time_aliases).any(|a| a == alias)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoOptions {
    /// Runtime HTTP client package the generated services embed.
    pub client_import: String,
    /// Query-string encoder used by GET methods.
    pub query_import: String,
}

impl Default for GoOptions {
    fn default() -> Self {
        Self {
            client_import: "github.com/go-season/common/client".to_string(),
            query_import: "github.com/google/go-querystring/query".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhpOptions {
    pub namespace: String,
    /// Fully-qualified base class of the generated client factory.
    pub client_base: String,
}

impl Default for PhpOptions {
    fn default() -> Self {
        Self {
            namespace: "App\\SDK".to_string(),
            client_base: "BundleLib\\GuzzleBundle\\Client".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Loads configuration for a project.
    ///
    /// An explicit path must exist; otherwise `<root>/sdkgen.toml` is read
    /// when present and defaults are used when it is not.
    ///
    /// ## Errors
    /// Returns `Io` or `Toml` when the file cannot be read or parsed.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, SdkGenError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE);
                if !candidate.is_file() {
                    debug!(root = %root.display(), "no {CONFIG_FILE}, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| SdkGenError::io(&path, source))?;
        let config = toml::from_str(&text).map_err(|source| SdkGenError::Toml {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Absolute directory holding the type files.
    pub fn typespec_root(&self, root: &Path) -> PathBuf {
        root.join(&self.typespec_dir)
    }

    pub fn base_path(&self, root: &Path) -> PathBuf {
        self.typespec_root(root).join(&self.base_file)
    }
}
