//! Builds the Interface Model from a type file and its route file.

pub mod constants;
pub mod fields;
pub mod pairing;
pub mod routes;

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, instrument};

use crate::cache::FieldCache;
use crate::config::GeneratorConfig;
use crate::error::SdkGenError;
use crate::file::go_file::GoFile;
use crate::file::syntax::TypeExpr;
use crate::model::{
    ActionPair, ConstantGroup, ImportBinding, ResourceModel, RouteBinding, SharedModel,
    SourcePos, TypeBody, TypeCategory, TypeDecl,
};
use crate::naming::upper_camel;
use crate::resolve::ProjectLayout;
use crate::walker::PathConvention;

use self::constants::{constant_groups, resolve_constant_types};
use self::fields::FieldResolver;
use self::pairing::pair_types;
use self::routes::route_bindings;

/// Everything recovered from one type file, before pairing.
#[derive(Debug, Clone)]
pub struct TypeFileExtract {
    /// Package clause of the file.
    pub package: String,
    pub imports: Vec<ImportBinding>,
    pub constants: Vec<ConstantGroup>,
    pub types: Vec<TypeDecl>,
    pub cache: FieldCache,
}

/// Runs extraction against one project.
pub struct Extractor<'a> {
    layout: &'a ProjectLayout,
    config: &'a GeneratorConfig,
    convention: PathConvention,
}

impl<'a> Extractor<'a> {
    pub fn new(layout: &'a ProjectLayout, config: &'a GeneratorConfig) -> Self {
        Self {
            layout,
            config,
            convention: PathConvention::new(config),
        }
    }

    /// Extracts constants and type declarations from a parsed type file.
    ///
    /// Package-qualified references to the shared base are settled against
    /// `shared` once every declaration in the file has been visited.
    ///
    /// ## Errors
    /// Returns `Resolution` for forbidden imports or field packages and
    /// `Validation` for unsupported declarations or unknown references.
    #[instrument(skip_all, fields(path = %file.path.display()))]
    pub fn extract_type_file(
        &self,
        file: &GoFile,
        shared: Option<&SharedModel>,
    ) -> Result<TypeFileExtract, SdkGenError> {
        let path = file.path.as_path();
        let package = file
            .package_name()
            .ok_or_else(|| SdkGenError::validation(path, 1, "missing package clause"))?;

        let imports = self.layout.bind_imports(path, &file.imports())?;
        let mut constants = constant_groups(path, &file.const_blocks())?;
        resolve_constant_types(&mut constants, &imports, &self.config.whitelist)?;
        let specs = file.type_specs()?;
        let declared: BTreeSet<String> = specs.iter().map(|spec| spec.name.clone()).collect();

        let mut cache = FieldCache::new();
        let mut types = Vec::with_capacity(specs.len());

        for spec in &specs {
            let category = TypeCategory::of(&spec.name);
            let body = match &spec.ty {
                TypeExpr::Struct(fields) => {
                    let shapes = FieldResolver::new(
                        path,
                        &imports,
                        &self.config.whitelist,
                        &declared,
                        &mut cache,
                    )
                    .fields(fields)?;
                    cache.resolve(&spec.name, &shapes);
                    TypeBody::Struct(shapes)
                }
                TypeExpr::Ident(underlying) if category == TypeCategory::General => {
                    cache.resolve(&spec.name, &[]);
                    TypeBody::Scalar(underlying.clone())
                }
                TypeExpr::Ident(_) => {
                    return Err(SdkGenError::validation(
                        path,
                        spec.line,
                        format!("`{}` must be a struct", spec.name),
                    ));
                }
                TypeExpr::Array(_) | TypeExpr::Map { .. } => {
                    return Err(SdkGenError::validation(
                        path,
                        spec.line,
                        format!("{} type not supported: `{}`", spec.ty.form(), spec.name),
                    ));
                }
                other => {
                    return Err(SdkGenError::validation(
                        path,
                        spec.line,
                        format!("top-level {} type not supported: `{}`", other.form(), spec.name),
                    ));
                }
            };

            types.push(TypeDecl {
                name: spec.name.clone(),
                category,
                body,
                pos: SourcePos {
                    path: path.to_path_buf(),
                    line: spec.line,
                },
            });
        }

        let unresolved = cache.resolve_pending(shared.map(|model| &model.cache));
        if let Some((name, line)) = unresolved.into_iter().next() {
            let place = if name.contains('.') {
                "in the shared base file"
            } else {
                "in this file"
            };
            return Err(SdkGenError::validation(
                path,
                line,
                format!("`{name}` is not declared {place}"),
            ));
        }

        debug!(
            package = %package,
            constants = constants.len(),
            types = types.len(),
            "extracted type file"
        );

        Ok(TypeFileExtract {
            package,
            imports,
            constants,
            types,
            cache,
        })
    }

    /// Extracts route bindings from a parsed route file.
    ///
    /// ## Errors
    /// Returns `Validation` for malformed route annotations.
    #[instrument(skip_all, fields(path = %file.path.display()))]
    pub fn extract_route_file(&self, file: &GoFile) -> Result<Vec<RouteBinding>, SdkGenError> {
        route_bindings(&file.path, &file.functions())
    }

    /// Extracts the project-wide shared base file.
    ///
    /// ## Errors
    /// Returns the same errors as [`Self::extract_type_file`] plus `Parse`/`Io`.
    pub fn extract_shared(&self, path: &Path) -> Result<SharedModel, SdkGenError> {
        let file = GoFile::parse(path)?;
        let extract = self.extract_type_file(&file, None)?;

        Ok(SharedModel {
            source: path.to_path_buf(),
            constants: extract.constants,
            types: extract.types,
            cache: extract.cache,
        })
    }

    /// Builds the complete Interface Model of one resource.
    ///
    /// The route file is located by path convention; a missing route file
    /// simply yields no client methods.
    ///
    /// ## Errors
    /// Fails on the first parse, validation, resolution or pairing error.
    #[instrument(skip_all, fields(path = %type_path.display()))]
    pub fn extract_resource(
        &self,
        type_path: &Path,
        shared: Option<&SharedModel>,
    ) -> Result<ResourceModel, SdkGenError> {
        let file = GoFile::parse(type_path)?;
        let extract = self.extract_type_file(&file, shared)?;

        let route_path = self.convention.route_path_for(type_path)?;
        let routes = if route_path.is_file() {
            self.extract_route_file(&GoFile::parse(&route_path)?)?
        } else {
            debug!(route_path = %route_path.display(), "no route file");
            Vec::new()
        };

        let pairing = pair_types(extract.types, routes)?;
        let file_stem = type_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let resource = resource_name(&file_stem, &pairing.general, &pairing.pairs);

        Ok(ResourceModel {
            source: type_path.to_path_buf(),
            package: extract.package,
            resource,
            file_stem,
            imports: extract.imports,
            constants: extract.constants,
            general: pairing.general,
            pairs: pairing.pairs,
            cache: extract.cache,
        })
    }
}

/// UpperCamel file stem, unless a general type spells it with other casing.
fn resource_name(file_stem: &str, general: &[TypeDecl], pairs: &[ActionPair]) -> String {
    let squashed = file_stem.replace(['_', '-'], "").to_lowercase();

    general
        .iter()
        .chain(pairs.iter().filter_map(|pair| pair.shared.as_ref()))
        .find(|decl| decl.name.to_lowercase() == squashed)
        .map(|decl| decl.name.clone())
        .unwrap_or_else(|| upper_camel(file_stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementType, FieldKind};

    fn layout() -> ProjectLayout {
        ProjectLayout::from_parts(
            Path::new("/srv/shop"),
            "example.com/shop",
            None,
            &GeneratorConfig::default(),
        )
    }

    fn extract(source: &str) -> Result<TypeFileExtract, SdkGenError> {
        let config = GeneratorConfig::default();
        let layout = layout();
        let file = GoFile::from_source("api/typespec/widgettype/widget.go", source.to_string())?;
        Extractor::new(&layout, &config).extract_type_file(&file, None)
    }

    #[test]
    fn forward_references_resolve_within_the_file() -> Result<(), SdkGenError> {
        let extract = extract(
            "package widgettype\n\ntype ListWidgetResponse struct {\n\tItems []Widget `json:\"items\"`\n}\n\ntype Widget struct {\n\tID int64\n}\n",
        )?;

        let items = &extract.types[0].fields()[0];
        assert_eq!(items.kind, FieldKind::Array);
        assert_eq!(items.element, ElementType::Declared("Widget".into()));
        assert!(extract.cache.pending().is_empty());
        assert_eq!(extract.cache.fields("Widget").map(|f| f.len()), Some(1));
        Ok(())
    }

    #[test]
    fn top_level_collections_are_rejected() {
        let err = extract("package w\n\ntype IDs []int64\n").expect_err("array alias");
        assert_eq!(err.to_string(), "api/typespec/widgettype/widget.go:3: array type not supported: `IDs`");

        let err = extract("package w\n\ntype Index map[string]int\n").expect_err("map alias");
        assert!(err.to_string().ends_with("map type not supported: `Index`"));
    }

    #[test]
    fn named_scalars_are_general_types() -> Result<(), SdkGenError> {
        let extract = extract("package w\n\ntype Status int\n\nconst (\n\tActive Status = iota\n\tRetired\n)\n")?;
        assert_eq!(extract.types[0].body, TypeBody::Scalar("int".into()));
        assert_eq!(extract.constants[0].ty.as_deref(), Some("Status"));
        Ok(())
    }

    #[test]
    fn shared_references_need_the_base_file() {
        let err = extract(
            "package w\n\nimport \"example.com/shop/api/typespec\"\n\ntype A struct {\n\tPage typespec.Pagination\n}\n",
        )
        .expect_err("no base model");
        assert!(err.to_string().contains("`typespec.Pagination` is not declared in the shared base file"));
    }

    #[test]
    fn resource_name_prefers_declared_casing() {
        let decl = TypeDecl {
            name: "UserInfo".into(),
            category: TypeCategory::General,
            body: TypeBody::Struct(Vec::new()),
            pos: SourcePos {
                path: "x.go".into(),
                line: 1,
            },
        };
        assert_eq!(resource_name("userinfo", std::slice::from_ref(&decl), &[]), "UserInfo");
        assert_eq!(resource_name("order_item", &[decl], &[]), "OrderItem");
    }
}
