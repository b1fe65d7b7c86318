use std::collections::BTreeSet;
use std::path::Path;

use crate::cache::FieldCache;
use crate::config::Whitelist;
use crate::error::SdkGenError;
use crate::file::syntax::{FieldDecl, TypeExpr};
use crate::model::{ElementType, FieldKind, FieldShape, ImportBinding, ImportClass};

/// Resolves struct fields of one type file into [`FieldShape`]s.
///
/// Declared-type references are registered in the file's [`FieldCache`] as
/// they are met, so a later declaration settles an earlier `Pending` entry.
pub struct FieldResolver<'a> {
    path: &'a Path,
    imports: &'a [ImportBinding],
    whitelist: &'a Whitelist,
    /// Every type name declared in the file.
    declared: &'a BTreeSet<String>,
    cache: &'a mut FieldCache,
}

impl<'a> FieldResolver<'a> {
    pub fn new(
        path: &'a Path,
        imports: &'a [ImportBinding],
        whitelist: &'a Whitelist,
        declared: &'a BTreeSet<String>,
        cache: &'a mut FieldCache,
    ) -> Self {
        Self {
            path,
            imports,
            whitelist,
            declared,
            cache,
        }
    }

    /// Resolves a struct body in field order.
    ///
    /// ## Errors
    /// Returns `Validation` for unsupported shapes and `Resolution` for
    /// fields typed from a package outside the whitelist.
    pub fn fields(&mut self, decls: &[FieldDecl]) -> Result<Vec<FieldShape>, SdkGenError> {
        decls.iter().map(|decl| self.field(decl)).collect()
    }

    fn field(&mut self, decl: &FieldDecl) -> Result<FieldShape, SdkGenError> {
        let (kind, element, map_key) = self.dispatch(&decl.ty, decl.line)?;

        Ok(FieldShape {
            name: decl.name.clone().unwrap_or_default(),
            kind,
            element,
            map_key,
            annotation: decl.tag.clone(),
            comment: decl.comment.clone(),
            line: decl.line,
        })
    }

    fn dispatch(
        &mut self,
        ty: &TypeExpr,
        line: usize,
    ) -> Result<(FieldKind, ElementType, Option<String>), SdkGenError> {
        match ty {
            TypeExpr::Ident(name) => Ok((FieldKind::Identifier, self.ident(name, line), None)),
            TypeExpr::Selector { package, name } => {
                Ok((FieldKind::Identifier, self.selector(package, name, line)?, None))
            }
            TypeExpr::Array(element) => match element.as_ref() {
                TypeExpr::Map { key, value } => {
                    let key = self.map_key(key, line)?;
                    Ok((FieldKind::ArrayOfMap, self.element(value, line)?, Some(key)))
                }
                other => Ok((FieldKind::Array, self.element(other, line)?, None)),
            },
            TypeExpr::Map { key, value } => {
                let key = self.map_key(key, line)?;
                match value.as_ref() {
                    TypeExpr::Array(inner) => {
                        Ok((FieldKind::MapOfArray, self.element(inner, line)?, Some(key)))
                    }
                    other => Ok((FieldKind::Map, self.element(other, line)?, Some(key))),
                }
            }
            TypeExpr::Struct(fields) => Ok((
                FieldKind::Struct,
                ElementType::Nested(self.fields(fields)?),
                None,
            )),
            TypeExpr::Pointer(inner) => {
                let (kind, element, _) = self.dispatch(inner, line)?;
                match kind {
                    FieldKind::Identifier | FieldKind::Struct => {
                        Ok((FieldKind::Pointer, element, None))
                    }
                    _ => Err(SdkGenError::validation(
                        self.path,
                        line,
                        format!("pointer to {} fields are not supported", inner.form()),
                    )),
                }
            }
            TypeExpr::Interface => Ok((FieldKind::Interface, ElementType::Any, None)),
        }
    }

    /// Element of an array or map value.
    ///
    /// Pointer elements collapse to their target, so the SDK spells
    /// `[]*Item` as `[]Item`.
    fn element(&mut self, ty: &TypeExpr, line: usize) -> Result<ElementType, SdkGenError> {
        match ty {
            TypeExpr::Ident(name) => Ok(self.ident(name, line)),
            TypeExpr::Selector { package, name } => self.selector(package, name, line),
            TypeExpr::Struct(fields) => Ok(ElementType::Nested(self.fields(fields)?)),
            TypeExpr::Pointer(inner) => self.element(inner, line),
            TypeExpr::Interface => Ok(ElementType::Any),
            TypeExpr::Array(_) | TypeExpr::Map { .. } => Err(SdkGenError::validation(
                self.path,
                line,
                format!("{} elements nested this deeply are not supported", ty.form()),
            )),
        }
    }

    fn map_key(&self, key: &TypeExpr, line: usize) -> Result<String, SdkGenError> {
        match key {
            TypeExpr::Ident(name) => Ok(name.clone()),
            other => Err(SdkGenError::validation(
                self.path,
                line,
                format!("map keys must be plain identifiers, found {}", other.form()),
            )),
        }
    }

    fn ident(&mut self, name: &str, line: usize) -> ElementType {
        if self.declared.contains(name) {
            self.cache.reference(name, line);
            ElementType::Declared(name.to_string())
        } else {
            ElementType::Builtin(name.to_string())
        }
    }

    fn selector(&mut self, package: &str, name: &str, line: usize) -> Result<ElementType, SdkGenError> {
        let binding = self.imports.iter().find(|binding| binding.alias == package);

        match binding {
            Some(binding) if binding.class == ImportClass::InternalTypespec => {
                self.cache.reference(&format!("{package}.{name}"), line);
                Ok(ElementType::Shared {
                    alias: package.to_string(),
                    name: name.to_string(),
                })
            }
            Some(_) if self.whitelist.widens_to_string(package) => {
                Ok(ElementType::Builtin("string".to_string()))
            }
            Some(binding) => Err(SdkGenError::Resolution {
                path: self.path.to_path_buf(),
                line,
                import: binding.path.clone(),
            }),
            None => Err(SdkGenError::Resolution {
                path: self.path.to_path_buf(),
                line,
                import: package.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourcePos;

    fn binding(alias: &str, path: &str, class: ImportClass) -> ImportBinding {
        ImportBinding {
            alias: alias.into(),
            path: path.into(),
            class,
            pos: SourcePos {
                path: "w.go".into(),
                line: 3,
            },
        }
    }

    fn field(name: &str, ty: TypeExpr) -> FieldDecl {
        FieldDecl {
            name: Some(name.into()),
            ty,
            tag: None,
            comment: None,
            line: 10,
        }
    }

    fn ident(name: &str) -> Box<TypeExpr> {
        Box::new(TypeExpr::Ident(name.into()))
    }

    struct Fixture {
        imports: Vec<ImportBinding>,
        whitelist: Whitelist,
        declared: BTreeSet<String>,
        cache: FieldCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                imports: vec![
                    binding("typespec", "example.com/shop/api/typespec", ImportClass::InternalTypespec),
                    binding("time", "time", ImportClass::External),
                    binding("decimal", "github.com/shopspring/decimal", ImportClass::External),
                ],
                whitelist: Whitelist::default(),
                declared: ["Item".to_string()].into_iter().collect(),
                cache: FieldCache::new(),
            }
        }

        fn resolve(&mut self, decls: &[FieldDecl]) -> Result<Vec<FieldShape>, SdkGenError> {
            FieldResolver::new(
                Path::new("w.go"),
                &self.imports,
                &self.whitelist,
                &self.declared,
                &mut self.cache,
            )
            .fields(decls)
        }
    }

    #[test]
    fn identifiers_split_into_builtin_and_declared() -> Result<(), SdkGenError> {
        let mut fx = Fixture::new();
        let shapes = fx.resolve(&[
            field("Count", TypeExpr::Ident("int".into())),
            field("Item", TypeExpr::Ident("Item".into())),
        ])?;

        assert_eq!(shapes[0].element, ElementType::Builtin("int".into()));
        assert_eq!(shapes[1].element, ElementType::Declared("Item".into()));
        assert_eq!(fx.cache.pending(), vec![("Item".to_string(), 10)]);
        Ok(())
    }

    #[test]
    fn whitelisted_selectors_resolve() -> Result<(), SdkGenError> {
        let mut fx = Fixture::new();
        let shapes = fx.resolve(&[
            field(
                "Page",
                TypeExpr::Selector {
                    package: "typespec".into(),
                    name: "Pagination".into(),
                },
            ),
            field(
                "CreatedAt",
                TypeExpr::Selector {
                    package: "time".into(),
                    name: "Time".into(),
                },
            ),
        ])?;

        assert_eq!(
            shapes[0].element,
            ElementType::Shared {
                alias: "typespec".into(),
                name: "Pagination".into()
            }
        );
        assert_eq!(shapes[1].element, ElementType::Builtin("string".into()));
        Ok(())
    }

    #[test]
    fn other_packages_are_resolution_errors() {
        let mut fx = Fixture::new();
        let err = fx
            .resolve(&[field(
                "Price",
                TypeExpr::Selector {
                    package: "decimal".into(),
                    name: "Decimal".into(),
                },
            )])
            .expect_err("decimal is not whitelisted");
        match err {
            SdkGenError::Resolution { line, import, .. } => {
                assert_eq!(line, 10);
                assert_eq!(import, "github.com/shopspring/decimal");
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
    }

    #[test]
    fn collection_forms() -> Result<(), SdkGenError> {
        let mut fx = Fixture::new();
        let shapes = fx.resolve(&[
            field("Tags", TypeExpr::Array(ident("string"))),
            field(
                "Counts",
                TypeExpr::Map {
                    key: ident("string"),
                    value: ident("int"),
                },
            ),
            field(
                "Rows",
                TypeExpr::Array(Box::new(TypeExpr::Map {
                    key: ident("string"),
                    value: ident("Item"),
                })),
            ),
            field(
                "Groups",
                TypeExpr::Map {
                    key: ident("int64"),
                    value: Box::new(TypeExpr::Array(ident("Item"))),
                },
            ),
            field("Refs", TypeExpr::Array(Box::new(TypeExpr::Pointer(ident("Item"))))),
        ])?;

        let kinds: Vec<_> = shapes.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            [
                FieldKind::Array,
                FieldKind::Map,
                FieldKind::ArrayOfMap,
                FieldKind::MapOfArray,
                FieldKind::Array
            ]
        );
        assert_eq!(shapes[2].map_key.as_deref(), Some("string"));
        assert_eq!(shapes[3].element, ElementType::Declared("Item".into()));
        assert_eq!(shapes[4].element, ElementType::Declared("Item".into()));
        Ok(())
    }

    #[test]
    fn struct_in_array_in_map_terminates() -> Result<(), SdkGenError> {
        let mut fx = Fixture::new();
        let inner = TypeExpr::Struct(vec![field("Sku", TypeExpr::Ident("string".into()))]);
        let shapes = fx.resolve(&[field(
            "Lines",
            TypeExpr::Map {
                key: ident("string"),
                value: Box::new(TypeExpr::Array(Box::new(inner))),
            },
        )])?;

        assert_eq!(shapes[0].kind, FieldKind::MapOfArray);
        let nested = shapes[0].nested().expect("nested fields");
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name, "Sku");
        Ok(())
    }

    #[test]
    fn non_identifier_map_keys_are_rejected() {
        let mut fx = Fixture::new();
        let err = fx
            .resolve(&[field(
                "Bad",
                TypeExpr::Map {
                    key: Box::new(TypeExpr::Array(ident("string"))),
                    value: ident("int"),
                },
            )])
            .expect_err("array key");
        assert!(matches!(err, SdkGenError::Validation { line: 10, .. }), "{err:?}");
    }

    #[test]
    fn pointers_and_interfaces() -> Result<(), SdkGenError> {
        let mut fx = Fixture::new();
        let shapes = fx.resolve(&[
            field("Parent", TypeExpr::Pointer(ident("Item"))),
            field("Extra", TypeExpr::Interface),
        ])?;
        assert_eq!(shapes[0].kind, FieldKind::Pointer);
        assert_eq!(shapes[0].element, ElementType::Declared("Item".into()));
        assert_eq!(shapes[1].element, ElementType::Any);

        let err = fx
            .resolve(&[field("Tags", TypeExpr::Pointer(Box::new(TypeExpr::Array(ident("string")))))])
            .expect_err("pointer to array");
        assert!(matches!(err, SdkGenError::Validation { .. }));
        Ok(())
    }
}
