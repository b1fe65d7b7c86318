use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::SdkGenError;

/// Suffix carried by every type-file package directory (`widget` -> `widgettype`).
pub const TYPE_PACKAGE_SUFFIX: &str = "type";

/// Finds the type files a run should process.
#[derive(Debug, Clone)]
pub struct SourceWalker {
    exclude_files: Vec<String>,
    exclude_dirs: Vec<String>,
    test_suffix: String,
}

impl SourceWalker {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            exclude_files: config.exclude_files.clone(),
            exclude_dirs: config.exclude_dirs.clone(),
            test_suffix: config.test_suffix.clone(),
        }
    }

    /// Lists eligible `.go` files under `root`, sorted by path.
    ///
    /// ## Errors
    /// Returns `Walk` if the directory cannot be traversed.
    pub fn eligible_files(&self, root: &Path) -> Result<Vec<PathBuf>, SdkGenError> {
        let excluded_dirs = self.exclude_dirs.clone();
        let walker = WalkBuilder::new(root)
            .standard_filters(true)
            .hidden(false)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir
                    && entry.depth() > 0
                    && excluded_dirs
                        .iter()
                        .any(|dir| entry.file_name().to_string_lossy() == dir.as_str()))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
            if is_file && self.is_eligible(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        debug!(root = %root.display(), count = files.len(), "collected type files");
        Ok(files)
    }

    /// Whether a single file passes the denylist and suffix rules.
    pub fn is_eligible(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };

        name.ends_with(".go")
            && !name.ends_with(self.test_suffix.as_str())
            && !self
                .exclude_files
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(&name))
    }
}

/// Maps type files to route files and back.
///
/// `<typespec>/<pkg>type/<file>.go` pairs with `<rest>/<pkg>/<file>.go`.
#[derive(Debug, Clone)]
pub struct PathConvention {
    typespec_segment: String,
    rest_segment: String,
}

impl PathConvention {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            typespec_segment: last_segment(&config.typespec_dir, "typespec"),
            rest_segment: last_segment(&config.rest_dir, "rest"),
        }
    }

    /// The route file that binds the types declared in `type_path`.
    ///
    /// ## Errors
    /// Returns `Validation` if the path does not follow the layout convention.
    pub fn route_path_for(&self, type_path: &Path) -> Result<PathBuf, SdkGenError> {
        let (base, segment, package, file) = split(type_path)?;
        let stripped = package.strip_suffix(TYPE_PACKAGE_SUFFIX).filter(|p| !p.is_empty());

        match stripped {
            Some(stripped) if segment == self.typespec_segment => Ok(base
                .join(&self.rest_segment)
                .join(stripped)
                .join(file)),
            _ => Err(SdkGenError::validation(
                type_path,
                0,
                format!(
                    "type files must live in `{}/<name>{TYPE_PACKAGE_SUFFIX}/`",
                    self.typespec_segment
                ),
            )),
        }
    }

    /// The type file declaring the contracts of `route_path`.
    ///
    /// ## Errors
    /// Returns `Validation` if the path does not follow the layout convention.
    pub fn type_path_for(&self, route_path: &Path) -> Result<PathBuf, SdkGenError> {
        let (base, segment, package, file) = split(route_path)?;
        if segment != self.rest_segment {
            return Err(SdkGenError::validation(
                route_path,
                0,
                format!("route files must live in `{}/<name>/`", self.rest_segment),
            ));
        }

        Ok(base
            .join(&self.typespec_segment)
            .join(format!("{package}{TYPE_PACKAGE_SUFFIX}"))
            .join(file))
    }
}

fn split(path: &Path) -> Result<(PathBuf, String, String, String), SdkGenError> {
    let name = |p: Option<&Path>| {
        p.and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    };

    let file = name(Some(path));
    let package_dir = path.parent();
    let package = name(package_dir);
    let segment_dir = package_dir.and_then(Path::parent);
    let segment = name(segment_dir);
    let base = segment_dir.and_then(Path::parent);

    match (file, package, segment, base) {
        (Some(file), Some(package), Some(segment), Some(base)) => {
            Ok((base.to_path_buf(), segment, package, file))
        }
        _ => Err(SdkGenError::validation(
            path,
            0,
            "path is too short to contain a package directory",
        )),
    }
}

fn last_segment(dir: &Path, fallback: &str) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convention() -> PathConvention {
        PathConvention::new(&GeneratorConfig::default())
    }

    #[test]
    fn maps_type_file_to_route_file() {
        let route = convention()
            .route_path_for(Path::new("/srv/shop/api/typespec/widgettype/widget.go"))
            .expect("conventional path");
        assert_eq!(route, PathBuf::from("/srv/shop/api/rest/widget/widget.go"));
    }

    #[test]
    fn maps_route_file_to_type_file() {
        let typ = convention()
            .type_path_for(Path::new("api/rest/user/user_info.go"))
            .expect("conventional path");
        assert_eq!(typ, PathBuf::from("api/typespec/usertype/user_info.go"));
    }

    #[test]
    fn ignores_rest_segments_higher_up_the_tree() {
        let route = convention()
            .route_path_for(Path::new("/home/rest/api/typespec/ordertype/order.go"))
            .expect("conventional path");
        assert_eq!(route, PathBuf::from("/home/rest/api/rest/order/order.go"));
    }

    #[test]
    fn rejects_unconventional_type_paths() {
        assert!(convention()
            .route_path_for(Path::new("api/typespec/widget/widget.go"))
            .is_err());
        assert!(convention()
            .route_path_for(Path::new("api/models/widgettype/widget.go"))
            .is_err());
    }

    #[test]
    fn walks_only_eligible_files() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let root = dir.path();
        let write = |rel: &str| {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(path, "package x\n").expect("write");
        };

        write("base.go");
        write("readme.md");
        write("widgettype/widget.go");
        write("widgettype/widget_test.go");
        write("ordertype/order.go");
        write("vendor/lib.go");

        let mut config = GeneratorConfig::default();
        config.exclude_dirs.push("vendor".into());

        let files = SourceWalker::new(&config)
            .eligible_files(root)
            .expect("walk");
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).expect("under root").to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("ordertype/order.go"),
                PathBuf::from("widgettype/widget.go"),
            ]
        );
    }
}
