use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use crate::emit::tags::translate_form_tag;
use crate::emit::writer::CodeWriter;
use crate::emit::{Dialect, EmitContext, Emitter, GENERATOR_NAME, GeneratedFile};
use crate::model::{
    ConstValue, ConstantGroup, ElementType, FieldKind, FieldShape, ImportClass, Operand,
    ResourceModel, SharedModel, TypeBody, TypeDecl,
};
use crate::naming::{lower_camel, upper_first};

/// Renders the statically-typed Go SDK.
#[derive(Debug, Clone)]
pub struct GoEmitter {
    out: PathBuf,
}

impl GoEmitter {
    /// Emits under `out`, normally the resolved SDK output directory.
    pub fn new(out: impl Into<PathBuf>) -> Self {
        Self { out: out.into() }
    }

    fn file(&self, path: PathBuf, contents: String) -> GeneratedFile {
        GeneratedFile {
            path,
            contents,
            dialect: Dialect::Go,
        }
    }
}

impl Emitter for GoEmitter {
    fn dialect(&self) -> Dialect {
        Dialect::Go
    }

    fn emit_resource(&self, resource: &ResourceModel, ctx: &EmitContext<'_>) -> Vec<GeneratedFile> {
        let package = resource.output_package();
        let dir = self.out.join(&package);
        let shared_aliases: BTreeSet<&str> = resource
            .imports
            .iter()
            .filter(|binding| binding.class == ImportClass::InternalTypespec)
            .map(|binding| binding.alias.as_str())
            .collect();

        let mut decls: Vec<&TypeDecl> = resource.general.iter().collect();
        for pair in &resource.pairs {
            decls.extend(pair.shared.iter());
            decls.push(&pair.request);
            decls.push(&pair.response);
        }

        let spec = SpecFile {
            package: &package,
            constants: &resource.constants,
            decls,
            types: GoTypes {
                shared_package: &ctx.target.shared_package,
                shared_aliases,
            },
        };

        debug!(resource = %resource.resource, dir = %dir.display(), "rendering go resource");
        vec![
            self.file(
                dir.join(format!("{}_spec.go", resource.file_stem)),
                spec.render(&ctx.target.shared_import()),
            ),
            self.file(
                dir.join(format!("{}.go", resource.file_stem)),
                client_file(resource, &package, ctx),
            ),
        ]
    }

    fn emit_shared(&self, shared: &SharedModel, ctx: &EmitContext<'_>) -> Vec<GeneratedFile> {
        let package = &ctx.target.shared_package;
        let spec = SpecFile {
            package,
            constants: &shared.constants,
            decls: shared.types.iter().collect(),
            types: GoTypes {
                shared_package: package,
                shared_aliases: BTreeSet::new(),
            },
        };

        vec![self.file(
            self.out.join(package).join("base.go"),
            spec.render(&ctx.target.shared_import()),
        )]
    }

    fn emit_factory(&self, resources: &[ResourceModel], ctx: &EmitContext<'_>) -> Vec<GeneratedFile> {
        vec![self.file(self.out.join("client.go"), factory_file(resources, ctx))]
    }
}

fn header(w: &mut CodeWriter, package: &str) {
    w.line(format!("// Code generated by {GENERATOR_NAME}. DO NOT EDIT."));
    w.blank();
    w.line(format!("package {package}"));
    w.blank();
}

fn imports(w: &mut CodeWriter, paths: &[(Option<String>, String)]) {
    match paths {
        [] => {}
        [(alias, path)] => {
            let alias = alias.as_ref().map(|a| format!("{a} ")).unwrap_or_default();
            w.line(format!("import {alias}\"{path}\""));
        }
        _ => {
            w.open("import (");
            for (alias, path) in paths {
                let alias = alias.as_ref().map(|a| format!("{a} ")).unwrap_or_default();
                w.line(format!("{alias}\"{path}\""));
            }
            w.close(")");
        }
    }
    w.blank();
}

/// Package name a Go import path is referred to by.
fn package_name(import: &str) -> &str {
    import.rsplit('/').next().unwrap_or(import)
}

/// Go spelling of model types; shared-base aliases become the emitted base package.
struct GoTypes<'a> {
    shared_package: &'a str,
    shared_aliases: BTreeSet<&'a str>,
}

impl GoTypes<'_> {
    /// Go spelling of a field's element.
    ///
    /// Collection elements never carry a pointer: `[]*Item` in the source is
    /// emitted as `[]Item`, and a `null` element decodes to the zero value.
    fn element(&self, element: &ElementType) -> String {
        match element {
            ElementType::Builtin(name) | ElementType::Declared(name) => name.clone(),
            ElementType::Shared { name, .. } => format!("{}.{name}", self.shared_package),
            ElementType::Nested(_) => "struct {".to_string(),
            ElementType::Any => "interface{}".to_string(),
        }
    }

    /// Full type of a field whose element renders as `inner`.
    fn wrap(&self, field: &FieldShape, inner: &str) -> String {
        let key = field.map_key.as_deref().unwrap_or("string");
        match field.kind {
            FieldKind::Identifier | FieldKind::Struct => inner.to_string(),
            FieldKind::Pointer => format!("*{inner}"),
            FieldKind::Array => format!("[]{inner}"),
            FieldKind::Map => format!("map[{key}]{inner}"),
            FieldKind::ArrayOfMap => format!("[]map[{key}]{inner}"),
            FieldKind::MapOfArray => format!("map[{key}][]{inner}"),
            FieldKind::Interface => "interface{}".to_string(),
        }
    }

    /// Rewrites a source-level type name such as a constant's `typespec.Status`.
    fn qualify(&self, name: &str) -> String {
        match name.split_once('.') {
            Some((alias, rest)) if self.shared_aliases.contains(alias) => {
                format!("{}.{rest}", self.shared_package)
            }
            _ => name.to_string(),
        }
    }

    fn is_shared(&self, name: &str) -> bool {
        name.split_once('.')
            .is_some_and(|(alias, _)| self.shared_aliases.contains(alias))
    }
}

fn mentions_shared(fields: &[FieldShape]) -> bool {
    fields.iter().any(|field| match &field.element {
        ElementType::Shared { .. } => true,
        ElementType::Nested(inner) => mentions_shared(inner),
        _ => false,
    })
}

struct SpecFile<'a> {
    package: &'a str,
    constants: &'a [ConstantGroup],
    decls: Vec<&'a TypeDecl>,
    types: GoTypes<'a>,
}

impl SpecFile<'_> {
    fn uses_shared(&self) -> bool {
        let in_types = self.decls.iter().any(|decl| match &decl.body {
            TypeBody::Struct(fields) => mentions_shared(fields),
            TypeBody::Scalar(underlying) => self.types.is_shared(underlying),
        });
        let in_constants = self
            .constants
            .iter()
            .filter_map(|group| group.ty.as_deref())
            .any(|ty| self.types.is_shared(ty));
        in_types || in_constants
    }

    fn render(&self, shared_import: &str) -> String {
        let mut w = CodeWriter::tabs();
        header(&mut w, self.package);

        if self.uses_shared() {
            imports(&mut w, &[(None, shared_import.to_string())]);
        }

        self.constants(&mut w);
        for decl in &self.decls {
            self.declaration(&mut w, decl);
        }

        w.finish()
    }

    /// One `const` per source declaration; specs split by name are rejoined.
    fn constants(&self, w: &mut CodeWriter) {
        for block in self.constants.chunk_by(|a, b| a.block == b.block) {
            let specs: Vec<&[ConstantGroup]> = block
                .chunk_by(|a, b| a.first_ordinal == b.first_ordinal)
                .collect();

            match specs.as_slice() {
                [spec] if spec.len() == 1 && spec[0].members.len() == 1 => {
                    w.line(format!("const {}", self.const_spec(spec)));
                }
                _ => {
                    w.open("const (");
                    for spec in &specs {
                        w.line(self.const_spec(spec));
                        for continuation in spec[0].members.iter().skip(1) {
                            w.line(continuation);
                        }
                    }
                    w.close(")");
                }
            }
            w.blank();
        }
    }

    fn const_spec(&self, spec: &[ConstantGroup]) -> String {
        let names: Vec<&str> = spec
            .iter()
            .filter_map(|group| group.members.first().map(String::as_str))
            .collect();
        let values: Vec<String> = spec.iter().map(|group| const_value(&group.value)).collect();
        let ty = spec
            .first()
            .and_then(|group| group.ty.as_deref())
            .map(|ty| format!(" {}", self.types.qualify(ty)))
            .unwrap_or_default();

        format!("{}{ty} = {}", names.join(", "), values.join(", "))
    }

    fn declaration(&self, w: &mut CodeWriter, decl: &TypeDecl) {
        match &decl.body {
            TypeBody::Scalar(underlying) => {
                w.line(format!("type {} {}", decl.name, self.types.qualify(underlying)));
            }
            TypeBody::Struct(fields) if fields.is_empty() => {
                w.line(format!("type {} struct{{}}", decl.name));
            }
            TypeBody::Struct(fields) => {
                w.open(format!("type {} struct {{", decl.name));
                self.fields(w, fields);
                w.close("}");
            }
        }
        w.blank();
    }

    /// Writes fields in source order, aligning runs of single-line fields.
    fn fields(&self, w: &mut CodeWriter, fields: &[FieldShape]) {
        let mut rows: Vec<Vec<String>> = Vec::new();

        for field in fields {
            let tag = field.annotation.as_deref().map(translate_form_tag).unwrap_or_default();
            let comment = field
                .comment
                .as_deref()
                .map(|c| format!("// {}", c.replace('\n', " ")))
                .unwrap_or_default();

            match field.nested() {
                Some(nested) => {
                    w.table(&rows);
                    rows.clear();

                    let opening = self.types.wrap(field, "struct {");
                    w.open(format!("{} {opening}", field.name));
                    self.fields(w, nested);
                    let closing = [String::from("}"), tag, comment]
                        .into_iter()
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ");
                    w.close(closing);
                }
                None => {
                    let ty = self.types.wrap(field, &self.types.element(&field.element));
                    if field.is_embedded() {
                        rows.push(vec![ty, String::new(), tag, comment]);
                    } else {
                        rows.push(vec![field.name.clone(), ty, tag, comment]);
                    }
                }
            }
        }

        w.table(&rows);
    }
}

fn operand(operand: &Operand) -> &str {
    match operand {
        Operand::Ident(text) | Operand::Literal(text) => text,
    }
}

fn const_value(value: &ConstValue) -> String {
    match value {
        ConstValue::Ident { name } => name.clone(),
        ConstValue::Literal { text } => text.clone(),
        ConstValue::Binary { left, op, right } => {
            format!("{} {op} {}", operand(left), operand(right))
        }
    }
}

fn client_file(resource: &ResourceModel, package: &str, ctx: &EmitContext<'_>) -> String {
    let go = &ctx.config.go;
    let client_pkg = package_name(&go.client_import);
    let query_pkg = package_name(&go.query_import);
    let routed: Vec<_> = resource.routed_pairs().collect();
    let needs_query = routed.iter().any(|(_, route)| route.method.is_query_encoded());

    let mut w = CodeWriter::tabs();
    header(&mut w, package);

    let mut paths = vec![(None, go.client_import.clone())];
    if needs_query {
        paths.push((None, go.query_import.clone()));
    }
    paths.sort_by(|a, b| a.1.cmp(&b.1));
    imports(&mut w, &paths);

    let service = format!("{}Service", lower_camel(&resource.resource));
    let receiver = resource
        .resource
        .chars()
        .next()
        .map(|c| c.to_lowercase().to_string())
        .unwrap_or_else(|| "s".to_string());

    w.line(format!("// Service calls the {} endpoints.", resource.resource));
    w.open("type Service interface {");
    for (pair, _) in &routed {
        w.line(format!(
            "{}(req *{}) ({}, error)",
            pair.action, pair.request.name, pair.response.name
        ));
    }
    w.close("}");
    w.blank();

    w.open(format!("type {service} struct {{"));
    w.line(format!("{client_pkg}.Client"));
    w.close("}");
    w.blank();

    w.open(format!(
        "func New{}Service(c {client_pkg}.Client) Service {{",
        resource.resource
    ));
    w.open(format!("return &{service}{{"));
    w.line("Client: c,");
    w.close("}");
    w.close("}");
    w.blank();

    for (pair, route) in &routed {
        let verb = upper_first(&route.method.as_str().to_lowercase());

        w.open(format!(
            "func ({receiver} *{service}) {}(req *{}) ({}, error) {{",
            pair.action, pair.request.name, pair.response.name
        ));
        w.open("var (");
        w.table(&[
            vec!["resp".to_string(), pair.response.name.clone()],
            vec!["err".to_string(), "error".to_string()],
        ]);
        w.close(")");
        w.blank();

        if route.method.is_query_encoded() {
            w.line(format!("val, err := {query_pkg}.Values(req)"));
            w.open("if err != nil {");
            w.line("return resp, err");
            w.close("}");
        }
        w.open(format!(
            "_, err = {receiver}.ClientWithParseContent(&resp).{verb}(\"{}\", {client_pkg}.Options{{",
            route.path
        ));
        if route.method.is_query_encoded() {
            w.line("Query: val.Encode(),");
        } else {
            w.line("JSON: req,");
        }
        w.close("})");
        w.blank();
        w.line("return resp, err");
        w.close("}");
        w.blank();
    }

    w.finish()
}

fn factory_file(resources: &[ResourceModel], ctx: &EmitContext<'_>) -> String {
    let client_import = &ctx.config.go.client_import;
    let client_pkg = package_name(client_import);

    // Resource packages that clash with another import get a suffixed alias.
    let services: Vec<(String, String, &ResourceModel)> = resources
        .iter()
        .map(|resource| {
            let package = resource.output_package();
            let name = if package == client_pkg || package == "context" {
                format!("{package}svc")
            } else {
                package.clone()
            };
            (name, package, resource)
        })
        .collect();

    let mut w = CodeWriter::tabs();
    header(&mut w, &ctx.target.root_package);

    w.open("import (");
    w.line("\"context\"");
    w.blank();
    let mut paths: Vec<(Option<&str>, String)> = vec![(None, client_import.clone())];
    for (name, package, _) in &services {
        let alias = (name != package).then_some(name.as_str());
        paths.push((alias, ctx.target.resource_import(package)));
    }
    paths.sort_by(|a, b| a.1.cmp(&b.1));
    for (alias, path) in &paths {
        match alias {
            Some(alias) => w.line(format!("{alias} \"{path}\"")),
            None => w.line(format!("\"{path}\"")),
        };
    }
    w.close(")");
    w.blank();

    w.line("// Client exposes one service per API resource.");
    w.open("type Client interface {");
    for (name, _, resource) in &services {
        w.line(format!("{}Service() {name}.Service", resource.resource));
    }
    w.close("}");
    w.blank();

    w.open("type sdkClient struct {");
    w.line(format!("{client_pkg}.Client"));
    w.close("}");
    w.blank();

    w.open("type Options struct {");
    w.line("Name string");
    w.close("}");
    w.blank();
    w.line("type Option func(opt *Options)");
    w.blank();

    w.open("func WithName(name string) Option {");
    w.open("return func(opt *Options) {");
    w.line("opt.Name = name");
    w.close("}");
    w.close("}");
    w.blank();

    w.open("func NewClient(ctx context.Context, opt ...Option) Client {");
    w.line("c := &sdkClient{}");
    w.line("c.Ctx = ctx");
    w.blank();
    w.line("opts := new(Options)");
    w.open("for _, o := range opt {");
    w.line("o(opts)");
    w.close("}");
    w.line("c.Name = opts.Name");
    w.blank();
    w.line("return c");
    w.close("}");
    w.blank();

    for (name, _, resource) in &services {
        w.open(format!(
            "func (c *sdkClient) {}Service() {name}.Service {{",
            resource.resource
        ));
        w.line(format!("return {name}.New{}Service(c.Client)", resource.resource));
        w.close("}");
        w.blank();
    }

    w.finish()
}
