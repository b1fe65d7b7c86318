use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::error::SdkGenError;
use crate::file::syntax::{
    ConstBlock, ConstSpec, FieldDecl, FuncDecl, ImportSpec, TypeExpr, TypeSpec, ValueExpr,
};

/// A Go source file parsed with tree-sitter.
#[derive(Debug, Clone)]
pub struct GoFile {
    /// Path the source was read from.
    pub path: PathBuf,
    source: String,
    tree: Tree,
}

impl GoFile {
    /// Reads and parses a Go file.
    ///
    /// ## Errors
    /// Returns `Io` if the file cannot be read and `Parse` if it has syntax errors.
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, SdkGenError> {
        let path = path.as_ref().to_path_buf();
        let source = std::fs::read_to_string(&path).map_err(|source| SdkGenError::io(&path, source))?;
        Self::from_source(path, source)
    }

    /// Parses in-memory Go source attributed to `path`.
    ///
    /// ## Errors
    /// Returns `Parse` when the source is not syntactically valid Go.
    pub fn from_source(path: impl Into<PathBuf>, source: String) -> Result<Self, SdkGenError> {
        let path = path.into();
        let tree = parse_tree(&path, &source)?;

        if let Some(node) = first_syntax_error(tree.root_node()) {
            let start = node.start_position();
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                let text = node
                    .utf8_text(source.as_bytes())
                    .unwrap_or_default()
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                format!("unexpected `{text}`")
            };

            return Err(SdkGenError::Parse {
                path,
                line: start.row + 1,
                column: start.column + 1,
                message,
            });
        }

        Ok(Self { path, source, tree })
    }

    /// The name in the `package` clause.
    pub fn package_name(&self) -> Option<String> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let clause = root
            .named_children(&mut cursor)
            .find(|node| node.kind() == "package_clause")?;

        let mut inner = clause.walk();
        let name = clause
            .named_children(&mut inner)
            .find(|node| node.kind() == "package_identifier")
            .map(|node| self.text(node).to_string());
        name
    }

    pub fn imports(&self) -> Vec<ImportSpec> {
        let mut imports = Vec::new();

        for decl in self.top_level("import_declaration") {
            let mut cursor = decl.walk();
            for child in decl.named_children(&mut cursor) {
                match child.kind() {
                    "import_spec" => imports.extend(self.import_spec(child)),
                    "import_spec_list" => {
                        let mut list = child.walk();
                        for spec in child.named_children(&mut list) {
                            if spec.kind() == "import_spec" {
                                imports.extend(self.import_spec(spec));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        imports
    }

    /// Top-level `const` declarations in source order.
    pub fn const_blocks(&self) -> Vec<ConstBlock> {
        self.top_level("const_declaration")
            .into_iter()
            .map(|decl| {
                let mut cursor = decl.walk();
                let specs = decl
                    .named_children(&mut cursor)
                    .filter(|node| node.kind() == "const_spec")
                    .map(|spec| self.const_spec(spec))
                    .collect();
                ConstBlock { specs }
            })
            .collect()
    }

    /// Top-level type declarations in source order.
    ///
    /// ## Errors
    /// Returns `Validation` for generic declarations or type forms outside
    /// identifier, selector, array, map, struct, pointer and interface.
    pub fn type_specs(&self) -> Result<Vec<TypeSpec>, SdkGenError> {
        let mut specs = Vec::new();

        for decl in self.top_level("type_declaration") {
            let mut cursor = decl.walk();
            let nodes: Vec<Node<'_>> = decl
                .named_children(&mut cursor)
                .filter(|node| matches!(node.kind(), "type_spec" | "type_alias"))
                .collect();

            for node in nodes {
                let line = line_of(node);
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default();

                if node.child_by_field_name("type_parameters").is_some() {
                    return Err(SdkGenError::validation(
                        &self.path,
                        line,
                        format!("generic type `{name}` is not supported"),
                    ));
                }

                let ty_node = node.child_by_field_name("type").ok_or_else(|| {
                    SdkGenError::validation(&self.path, line, format!("type `{name}` has no body"))
                })?;

                specs.push(TypeSpec {
                    name,
                    ty: self.lower_type(ty_node)?,
                    line,
                });
            }
        }

        Ok(specs)
    }

    /// Functions and methods with their leading comment lines.
    pub fn functions(&self) -> Vec<FuncDecl> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let mut doc: Vec<String> = Vec::new();
        let mut doc_end: Option<usize> = None;
        let mut functions = Vec::new();

        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "comment" => {
                    let start = node.start_position().row;
                    if doc_end.is_none_or(|end| end + 1 != start) {
                        doc.clear();
                    }
                    doc.push(comment_text(self.text(node)));
                    doc_end = Some(node.end_position().row);
                }
                "function_declaration" | "method_declaration" => {
                    let start = node.start_position().row;
                    let attached = doc_end.is_some_and(|end| end + 1 == start);
                    if let Some(name) = node.child_by_field_name("name") {
                        functions.push(FuncDecl {
                            name: self.text(name).to_string(),
                            doc: if attached { doc.clone() } else { Vec::new() },
                            line: start + 1,
                        });
                    }
                    doc.clear();
                    doc_end = None;
                }
                _ => {
                    doc.clear();
                    doc_end = None;
                }
            }
        }

        functions
    }

    fn top_level(&self, kind: &str) -> Vec<Node<'_>> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        root.named_children(&mut cursor)
            .filter(|node| node.kind() == kind)
            .collect()
    }

    fn import_spec(&self, node: Node<'_>) -> Option<ImportSpec> {
        let path = node.child_by_field_name("path")?;
        let alias = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string());

        Some(ImportSpec {
            alias,
            path: unquote(self.text(path)).to_string(),
            line: line_of(node),
        })
    }

    fn const_spec(&self, node: Node<'_>) -> ConstSpec {
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.text(n).to_string())
            .collect();

        let ty = node
            .child_by_field_name("type")
            .map(|n| self.text(n).to_string());

        let values = match node.child_by_field_name("value") {
            Some(list) => {
                let mut list_cursor = list.walk();
                list.named_children(&mut list_cursor)
                    .filter(|n| n.kind() != "comment")
                    .map(|expr| self.lower_value(expr))
                    .collect()
            }
            None => Vec::new(),
        };

        ConstSpec {
            names,
            ty,
            values,
            line: line_of(node),
        }
    }

    fn lower_value(&self, node: Node<'_>) -> ValueExpr {
        match node.kind() {
            "identifier" | "iota" => ValueExpr::Ident(self.text(node).to_string()),
            "int_literal" | "float_literal" | "imaginary_literal" | "rune_literal"
            | "interpreted_string_literal" | "raw_string_literal" | "true" | "false" | "nil" => {
                ValueExpr::Literal(self.text(node).to_string())
            }
            "unary_expression" => {
                let literal_operand = node
                    .child_by_field_name("operand")
                    .is_some_and(|operand| matches!(self.lower_value(operand), ValueExpr::Literal(_)));
                if literal_operand {
                    ValueExpr::Literal(self.text(node).to_string())
                } else {
                    self.other(node)
                }
            }
            "parenthesized_expression" => {
                let mut cursor = node.walk();
                let inner = node
                    .named_children(&mut cursor)
                    .find(|n| n.kind() != "comment");
                match inner {
                    Some(inner) => self.lower_value(inner),
                    None => self.other(node),
                }
            }
            "binary_expression" => {
                let parts = (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("operator"),
                    node.child_by_field_name("right"),
                );
                match parts {
                    (Some(left), Some(op), Some(right)) => ValueExpr::Binary {
                        left: Box::new(self.lower_value(left)),
                        op: self.text(op).to_string(),
                        right: Box::new(self.lower_value(right)),
                    },
                    _ => self.other(node),
                }
            }
            _ => self.other(node),
        }
    }

    fn other(&self, node: Node<'_>) -> ValueExpr {
        ValueExpr::Other {
            kind: node.kind().to_string(),
            text: self.text(node).to_string(),
        }
    }

    fn lower_type(&self, node: Node<'_>) -> Result<TypeExpr, SdkGenError> {
        match node.kind() {
            "type_identifier" | "identifier" => Ok(TypeExpr::Ident(self.text(node).to_string())),
            "qualified_type" => {
                let package = node.child_by_field_name("package");
                let name = node.child_by_field_name("name");
                match (package, name) {
                    (Some(package), Some(name)) => Ok(TypeExpr::Selector {
                        package: self.text(package).to_string(),
                        name: self.text(name).to_string(),
                    }),
                    _ => Err(self.unsupported(node)),
                }
            }
            "pointer_type" | "parenthesized_type" => {
                let inner = self.first_named(node).ok_or_else(|| self.unsupported(node))?;
                let inner = self.lower_type(inner)?;
                if node.kind() == "pointer_type" {
                    Ok(TypeExpr::Pointer(Box::new(inner)))
                } else {
                    Ok(inner)
                }
            }
            "slice_type" | "array_type" => {
                let element = node
                    .child_by_field_name("element")
                    .ok_or_else(|| self.unsupported(node))?;
                Ok(TypeExpr::Array(Box::new(self.lower_type(element)?)))
            }
            "map_type" => {
                let key = node
                    .child_by_field_name("key")
                    .ok_or_else(|| self.unsupported(node))?;
                let value = node
                    .child_by_field_name("value")
                    .ok_or_else(|| self.unsupported(node))?;
                Ok(TypeExpr::Map {
                    key: Box::new(self.lower_type(key)?),
                    value: Box::new(self.lower_type(value)?),
                })
            }
            "struct_type" => {
                let mut cursor = node.walk();
                let list = node
                    .named_children(&mut cursor)
                    .find(|n| n.kind() == "field_declaration_list");
                match list {
                    Some(list) => Ok(TypeExpr::Struct(self.lower_fields(list)?)),
                    None => Ok(TypeExpr::Struct(Vec::new())),
                }
            }
            "interface_type" => Ok(TypeExpr::Interface),
            _ => Err(self.unsupported(node)),
        }
    }

    fn lower_fields(&self, list: Node<'_>) -> Result<Vec<FieldDecl>, SdkGenError> {
        let mut cursor = list.walk();
        let children: Vec<Node<'_>> = list.named_children(&mut cursor).collect();
        let mut fields: Vec<FieldDecl> = Vec::new();
        let mut leading: Vec<String> = Vec::new();
        let mut last_row: Option<usize> = None;

        for node in children {
            match node.kind() {
                "comment" => {
                    let text = comment_text(self.text(node));
                    let row = node.start_position().row;
                    match (last_row, fields.last_mut()) {
                        (Some(prev), Some(field)) if prev == row && field.comment.is_none() => {
                            field.comment = Some(text);
                        }
                        _ => leading.push(text),
                    }
                }
                "field_declaration" => {
                    let doc = if leading.is_empty() {
                        None
                    } else {
                        Some(leading.join(" "))
                    };
                    leading.clear();

                    let decls = self.field_declaration(node, doc)?;
                    last_row = Some(node.end_position().row);
                    fields.extend(decls);
                }
                _ => {}
            }
        }

        Ok(fields)
    }

    fn field_declaration(
        &self,
        node: Node<'_>,
        doc: Option<String>,
    ) -> Result<Vec<FieldDecl>, SdkGenError> {
        let line = line_of(node);
        let ty_node = node
            .child_by_field_name("type")
            .ok_or_else(|| self.unsupported(node))?;
        let mut ty = self.lower_type(ty_node)?;
        let tag = node
            .child_by_field_name("tag")
            .map(|n| self.text(n).to_string());

        let mut cursor = node.walk();
        let names: Vec<String> = node
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.text(n).to_string())
            .collect();

        if names.is_empty() {
            let mut inner = node.walk();
            let starred = node.children(&mut inner).any(|child| child.kind() == "*");
            if starred {
                ty = TypeExpr::Pointer(Box::new(ty));
            }
            return Ok(vec![FieldDecl {
                name: None,
                ty,
                tag,
                comment: doc,
                line,
            }]);
        }

        Ok(names
            .into_iter()
            .map(|name| FieldDecl {
                name: Some(name),
                ty: ty.clone(),
                tag: tag.clone(),
                comment: doc.clone(),
                line,
            })
            .collect())
    }

    fn first_named<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        let mut cursor = node.walk();
        let found = node.named_children(&mut cursor).find(|n| n.kind() != "comment");
        found
    }

    fn unsupported(&self, node: Node<'_>) -> SdkGenError {
        SdkGenError::validation(
            &self.path,
            line_of(node),
            format!(
                "unsupported type form `{}` ({})",
                self.text(node),
                node.kind()
            ),
        )
    }

    fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }
}

fn parse_tree(path: &Path, source: &str) -> Result<Tree, SdkGenError> {
    let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|err| SdkGenError::Parse {
            path: path.to_path_buf(),
            line: 0,
            column: 0,
            message: err.to_string(),
        })?;

    parser.parse(source, None).ok_or_else(|| SdkGenError::Parse {
        path: path.to_path_buf(),
        line: 0,
        column: 0,
        message: "parser produced no tree".to_string(),
    })
}

/// The earliest error or missing node in the tree.
pub(crate) fn first_syntax_error(root: Node<'_>) -> Option<Node<'_>> {
    if !root.has_error() {
        return None;
    }

    let mut found: Option<Node<'_>> = None;
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let earlier = found.is_none_or(|f| node.start_byte() < f.start_byte());
            if earlier {
                found = Some(node);
            }
        }

        if node.has_error() {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
    }

    found
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row.saturating_add(1)
}

fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '`')
}

fn comment_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = if let Some(line) = trimmed.strip_prefix("//") {
        line
    } else {
        trimmed
            .strip_prefix("/*")
            .and_then(|rest| rest.strip_suffix("*/"))
            .unwrap_or(trimmed)
    };
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> GoFile {
        GoFile::from_source("mem.go", source.to_string()).expect("source should parse")
    }

    #[test]
    fn reports_syntax_errors_with_position() {
        let err = GoFile::from_source("broken.go", "package x\n\ntype A struct {\n\tB int\n".to_string())
            .expect_err("unterminated struct should fail");
        match err {
            SdkGenError::Parse { path, line, .. } => {
                assert_eq!(path, PathBuf::from("broken.go"));
                assert!(line >= 3, "line was {line}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn reads_package_and_imports() {
        let file = parse(
            "package widgettype\n\nimport (\n\t\"time\"\n\tts \"example.com/shop/api/typespec\"\n)\n",
        );
        assert_eq!(file.package_name().as_deref(), Some("widgettype"));

        let imports = file.imports();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "time");
        assert_eq!(imports[0].alias, None);
        assert_eq!(imports[1].alias.as_deref(), Some("ts"));
        assert_eq!(imports[1].line, 5);
    }

    #[test]
    fn lowers_every_supported_type_form() {
        let file = parse(
            r#"package x

type Everything struct {
	ID       int64                  `json:"id"` // primary key
	Tags     []string
	Scores   map[string]int
	Parent   *Everything
	Page     typespec.Pagination
	Extra    interface{}
	Inline   struct {
		Name string
	}
	A, B     bool
}
"#,
        );

        let specs = file.type_specs().expect("supported forms");
        assert_eq!(specs.len(), 1);
        let TypeExpr::Struct(fields) = &specs[0].ty else {
            panic!("expected struct");
        };

        let names: Vec<_> = fields.iter().map(|f| f.name.clone().unwrap_or_default()).collect();
        assert_eq!(names, ["ID", "Tags", "Scores", "Parent", "Page", "Extra", "Inline", "A", "B"]);
        assert_eq!(fields[0].tag.as_deref(), Some("`json:\"id\"`"));
        assert_eq!(fields[0].comment.as_deref(), Some("primary key"));
        assert!(matches!(fields[1].ty, TypeExpr::Array(_)));
        assert!(matches!(fields[2].ty, TypeExpr::Map { .. }));
        assert!(matches!(fields[3].ty, TypeExpr::Pointer(_)));
        assert_eq!(
            fields[4].ty,
            TypeExpr::Selector {
                package: "typespec".into(),
                name: "Pagination".into()
            }
        );
        assert_eq!(fields[5].ty, TypeExpr::Interface);
        assert!(matches!(fields[6].ty, TypeExpr::Struct(ref inner) if inner.len() == 1));
        assert_eq!(fields[8].ty, TypeExpr::Ident("bool".into()));
    }

    #[test]
    fn embedded_pointer_fields_keep_the_pointer() {
        let file = parse("package x\n\ntype A struct {\n\t*Base\n\tOther\n}\n");
        let specs = file.type_specs().expect("embedded fields");
        let TypeExpr::Struct(fields) = &specs[0].ty else {
            panic!("expected struct");
        };
        assert_eq!(fields[0].name, None);
        assert_eq!(fields[0].ty, TypeExpr::Pointer(Box::new(TypeExpr::Ident("Base".into()))));
        assert_eq!(fields[1].ty, TypeExpr::Ident("Other".into()));
    }

    #[test]
    fn rejects_function_typed_fields() {
        let file = parse("package x\n\ntype A struct {\n\tCallback func()\n}\n");
        let err = file.type_specs().expect_err("func fields are unsupported");
        assert!(matches!(err, SdkGenError::Validation { line: 4, .. }), "{err:?}");
    }

    #[test]
    fn lowers_constant_values() {
        let file = parse(
            "package x\n\nconst (\n\tRead = 1 << iota\n\tWrite\n)\n\nconst Limit = 20\n",
        );
        let blocks = file.const_blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].specs.len(), 2);
        assert!(matches!(blocks[0].specs[0].values[0], ValueExpr::Binary { ref op, .. } if op == "<<"));
        assert!(blocks[0].specs[1].values.is_empty());
        assert_eq!(blocks[1].specs[0].values, vec![ValueExpr::Literal("20".into())]);
    }

    #[test]
    fn attaches_contiguous_doc_comments_to_functions() {
        let file = parse(
            "package widget\n\n// FetchWidget returns one widget.\n// @router /widget/info [get]\nfunc FetchWidget() {}\n\n// orphan\n\nfunc Other() {}\n",
        );
        let functions = file.functions();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "FetchWidget");
        assert_eq!(functions[0].doc, ["FetchWidget returns one widget.", "@router /widget/info [get]"]);
        assert!(functions[1].doc.is_empty());
    }
}
