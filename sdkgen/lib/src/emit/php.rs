use std::path::PathBuf;

use tracing::{debug, warn};

use crate::emit::tags::wire_name;
use crate::emit::writer::CodeWriter;
use crate::emit::{Dialect, EmitContext, Emitter, GENERATOR_NAME, GeneratedFile};
use crate::model::{
    ConstValue, ElementType, FieldKind, FieldShape, Operand, ResourceModel, SharedModel,
    TypeBody, TypeDecl,
};
use crate::naming::{lower_first, upper_camel};

/// Renders the PHP SDK: request/value classes, one service per resource and
/// the client factory.
#[derive(Debug, Clone)]
pub struct PhpEmitter {
    out: PathBuf,
}

impl PhpEmitter {
    pub fn new(out: impl Into<PathBuf>) -> Self {
        Self { out: out.into() }
    }

    fn file(&self, path: PathBuf, contents: String) -> GeneratedFile {
        GeneratedFile {
            path,
            contents,
            dialect: Dialect::Php,
        }
    }
}

impl Emitter for PhpEmitter {
    fn dialect(&self) -> Dialect {
        Dialect::Php
    }

    fn emit_resource(&self, resource: &ResourceModel, ctx: &EmitContext<'_>) -> Vec<GeneratedFile> {
        let dir = self.out.join(&resource.resource);
        let namespace = format!("{}\\{}", ctx.config.php.namespace, resource.resource);
        let shapes = Shapes {
            resource,
            shared: ctx.shared,
        };

        let mut classes: Vec<&TypeDecl> = resource.general.iter().collect();
        for pair in &resource.pairs {
            classes.extend(pair.shared.iter());
            classes.push(&pair.request);
        }

        let mut files: Vec<GeneratedFile> = classes
            .into_iter()
            .filter_map(|decl| match &decl.body {
                TypeBody::Struct(fields) => Some(self.file(
                    dir.join(format!("{}.php", decl.name)),
                    class_file(&namespace, decl, &shapes.properties(fields)),
                )),
                TypeBody::Scalar(_) => None,
            })
            .collect();

        debug!(resource = %resource.resource, classes = files.len(), "rendering php resource");
        files.push(self.file(
            dir.join(format!("{}Service.php", resource.resource)),
            service_file(&namespace, resource, ctx),
        ));
        files
    }

    /// Shared shapes are inlined into each resource's docblocks, so the base
    /// file has no PHP counterpart.
    fn emit_shared(&self, _shared: &SharedModel, _ctx: &EmitContext<'_>) -> Vec<GeneratedFile> {
        Vec::new()
    }

    fn emit_factory(&self, resources: &[ResourceModel], ctx: &EmitContext<'_>) -> Vec<GeneratedFile> {
        vec![self.file(self.out.join("ClientFactory.php"), factory_file(resources, ctx))]
    }
}

/// One private property of a generated class.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Property {
    /// Key used on the wire and in `toArray()`.
    wire: String,
    /// PHP variable name.
    ident: String,
    doc: String,
}

impl Property {
    /// Collections and record shapes start as `array()`; nullable and scalar ones as null.
    fn is_array(&self) -> bool {
        self.doc.starts_with("array") && !self.doc.ends_with("|null")
    }

    fn accessor(&self) -> String {
        upper_camel(&self.ident)
    }

    fn collides_with(&self, other: &Property) -> bool {
        self.ident == other.ident || self.accessor().eq_ignore_ascii_case(&other.accessor())
    }
}

/// Field-tree lookups for one resource.
struct Shapes<'a> {
    resource: &'a ResourceModel,
    shared: Option<&'a SharedModel>,
}

impl Shapes<'_> {
    /// Properties in field order, embedded shapes flattened in place.
    fn properties(&self, fields: &[FieldShape]) -> Vec<Property> {
        let mut guard = Vec::new();
        let mut out = Vec::new();
        self.collect(fields, &mut guard, &mut out);
        out
    }

    fn collect(&self, fields: &[FieldShape], guard: &mut Vec<String>, out: &mut Vec<Property>) {
        for field in fields {
            if field.is_embedded() {
                let Some(key) = field.element.cache_key() else {
                    continue;
                };
                if guard.contains(&key) {
                    continue;
                }
                if let Some(inner) = self.resource.cache.fields(&key) {
                    guard.push(key);
                    self.collect(&inner, guard, out);
                    guard.pop();
                }
                continue;
            }

            let wire = field
                .annotation
                .as_deref()
                .and_then(wire_name)
                .map(str::to_string)
                .unwrap_or_else(|| lower_first(&field.name));
            // An outer field shadows an embedded one of the same name.
            if out.iter().any(|p| p.wire == wire) {
                continue;
            }
            let property = Property {
                ident: php_ident(&wire),
                wire,
                doc: String::new(),
            };
            // PHP method names ignore case, so `page_size` and `pageSize` clash.
            if let Some(taken) = out.iter().find(|p| p.collides_with(&property)) {
                warn!(field = %field.name, wire = %property.wire, kept = %taken.wire, "skipping php property with a clashing name");
                continue;
            }

            let doc = self.field_doc(field, guard);
            out.push(Property { doc, ..property });
        }
    }

    /// Docblock type of a field, expanding referenced shapes once per path.
    fn field_doc(&self, field: &FieldShape, guard: &mut Vec<String>) -> String {
        let element = self.element_doc(&field.element, guard);
        let key = match field.map_key.as_deref().map(scalar_doc) {
            Some("int") => "int",
            _ => "string",
        };

        match field.kind {
            FieldKind::Identifier | FieldKind::Struct => element,
            FieldKind::Pointer => format!("{element}|null"),
            FieldKind::Array => format!("array<int, {element}>"),
            FieldKind::Map => format!("array<{key}, {element}>"),
            FieldKind::ArrayOfMap => format!("array<int, array<{key}, {element}>>"),
            FieldKind::MapOfArray => format!("array<{key}, array<int, {element}>>"),
            FieldKind::Interface => "mixed".to_string(),
        }
    }

    fn element_doc(&self, element: &ElementType, guard: &mut Vec<String>) -> String {
        match element {
            ElementType::Builtin(name) => scalar_doc(name).to_string(),
            ElementType::Any => "mixed".to_string(),
            ElementType::Nested(fields) => self.shape_doc(fields, guard),
            ElementType::Declared(_) | ElementType::Shared { .. } => {
                let Some(key) = element.cache_key() else {
                    return "mixed".to_string();
                };
                if guard.contains(&key) {
                    return "array".to_string();
                }

                match self.declaration(element) {
                    Some(TypeDecl {
                        body: TypeBody::Scalar(underlying),
                        ..
                    }) => scalar_doc(underlying).to_string(),
                    _ => match self.resource.cache.fields(&key) {
                        Some(fields) if !fields.is_empty() => {
                            guard.push(key);
                            let doc = self.shape_doc(&fields, guard);
                            guard.pop();
                            doc
                        }
                        _ => "array".to_string(),
                    },
                }
            }
        }
    }

    fn shape_doc(&self, fields: &[FieldShape], guard: &mut Vec<String>) -> String {
        let mut entries = Vec::new();
        self.collect(fields, guard, &mut entries);
        let body = entries
            .iter()
            .map(|p| format!("{}: {}", p.wire, p.doc))
            .collect::<Vec<_>>()
            .join(", ");
        format!("array{{{body}}}")
    }

    fn declaration(&self, element: &ElementType) -> Option<&TypeDecl> {
        match element {
            ElementType::Declared(name) => self.resource.declaration(name),
            ElementType::Shared { name, .. } => self.shared.and_then(|s| s.declaration(name)),
            _ => None,
        }
    }
}

/// PHP docblock spelling of a Go builtin.
fn scalar_doc(name: &str) -> &'static str {
    match name {
        "string" => "string",
        "bool" => "bool",
        "float32" | "float64" => "float",
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
        | "uint64" | "uintptr" | "byte" | "rune" => "int",
        _ => "mixed",
    }
}

fn php_ident(wire: &str) -> String {
    let ident: String = wire
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{ident}")
    } else {
        ident
    }
}

/// Single-quoted PHP string literal.
fn php_string(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn opening(w: &mut CodeWriter, namespace: &str) {
    w.line("<?php");
    w.blank();
    w.line(format!("// Code generated by {GENERATOR_NAME}. DO NOT EDIT."));
    w.blank();
    w.line(format!("namespace {namespace};"));
    w.blank();
}

fn class_file(namespace: &str, decl: &TypeDecl, properties: &[Property]) -> String {
    let mut w = CodeWriter::spaces();
    opening(&mut w, namespace);

    w.line(format!("class {}", decl.name));
    w.open("{");

    for property in properties {
        w.line("/**");
        w.line(format!(" * @var {}", property.doc));
        w.line(" */");
        if property.is_array() {
            w.line(format!("private ${} = array();", property.ident));
        } else {
            w.line(format!("private ${};", property.ident));
        }
        w.blank();
    }

    for property in properties {
        let ident = &property.ident;
        let accessor = property.accessor();

        w.line(format!("public function set{accessor}(${ident})"));
        w.open("{");
        w.line(format!("$this->{ident} = ${ident};"));
        w.blank();
        w.line("return $this;");
        w.close("}");
        w.blank();

        w.line(format!("public function get{accessor}()"));
        w.open("{");
        w.line(format!("return $this->{ident};"));
        w.close("}");
        w.blank();
    }

    w.line("public function toArray()");
    w.open("{");
    if properties.is_empty() {
        w.line("return [];");
    } else {
        w.open("return [");
        for property in properties {
            w.line(format!("{} => $this->{},", php_string(&property.wire), property.ident));
        }
        w.close("];");
    }
    w.close("}");

    w.close("}");
    w.finish()
}

fn service_file(namespace: &str, resource: &ResourceModel, ctx: &EmitContext<'_>) -> String {
    let mut w = CodeWriter::spaces();
    opening(&mut w, namespace);
    w.line(format!("use {}\\ClientFactory;", ctx.config.php.namespace));
    w.blank();

    w.line(format!("class {}Service", resource.resource));
    w.open("{");

    for group in &resource.constants {
        for (name, value) in group.expanded() {
            w.line(format!("const {name} = {};", php_value(&value)));
        }
    }
    w.blank();

    w.line("private $client;");
    w.blank();
    w.line("public function __construct(ClientFactory $client)");
    w.open("{");
    w.line("$this->client = $client;");
    w.close("}");
    w.blank();

    for (pair, route) in resource.routed_pairs() {
        let encoding = if route.method.is_query_encoded() { "query" } else { "json" };

        w.line(format!(
            "public function {}({} $request)",
            lower_first(&pair.action),
            pair.request.name
        ));
        w.open("{");
        w.open(format!(
            "$response = $this->client->{}({}, [",
            route.method.as_str().to_lowercase(),
            php_string(&route.path)
        ));
        w.line(format!("'{encoding}' => $request->toArray(),"));
        w.close("]);");
        w.blank();
        w.line("return $this->client->extractBody($response);");
        w.close("}");
        w.blank();
    }

    w.close("}");
    w.finish()
}

fn php_operand(operand: &Operand) -> String {
    match operand {
        Operand::Literal(text) => php_literal(text),
        Operand::Ident(name) => php_ident_value(name),
    }
}

fn php_ident_value(name: &str) -> String {
    match name {
        "true" | "false" => name.to_string(),
        "nil" => "null".to_string(),
        other => format!("self::{other}"),
    }
}

/// Converts a Go literal into an equivalent PHP constant expression.
fn php_literal(text: &str) -> String {
    if let Some(raw) = text.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return php_string(raw);
    }
    if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return if inner.contains('\\') {
            format!("\"{}\"", inner.replace('$', "\\$"))
        } else {
            php_string(inner)
        };
    }
    if let Some(inner) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        let mut chars = inner.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return (c as u32).to_string();
        }
    }
    text.to_string()
}

fn php_value(value: &ConstValue) -> String {
    match value {
        ConstValue::Ident { name } => php_ident_value(name),
        ConstValue::Literal { text } => php_literal(text),
        ConstValue::Binary { left, op, right } if op == "&^" => {
            format!("{} & ~{}", php_operand(left), php_operand(right))
        }
        ConstValue::Binary { left, op, right } => {
            format!("{} {op} {}", php_operand(left), php_operand(right))
        }
    }
}

fn factory_file(resources: &[ResourceModel], ctx: &EmitContext<'_>) -> String {
    let php = &ctx.config.php;
    let base = php.client_base.rsplit('\\').next().unwrap_or(&php.client_base);

    let mut uses: Vec<String> = resources
        .iter()
        .map(|r| format!("{}\\{}\\{}Service", php.namespace, r.resource, r.resource))
        .collect();
    uses.push(php.client_base.clone());
    uses.push("Psr\\Http\\Message\\ResponseInterface".to_string());
    uses.push("Symfony\\Component\\HttpFoundation\\Response".to_string());
    uses.sort();
    uses.dedup();

    let mut w = CodeWriter::spaces();
    opening(&mut w, &php.namespace);
    for class in &uses {
        w.line(format!("use {class};"));
    }
    w.blank();

    w.line(format!("class ClientFactory extends {base}"));
    w.open("{");

    let services: Vec<(String, String)> = resources
        .iter()
        .map(|r| {
            let class = format!("{}Service", r.resource);
            (lower_first(&class), class)
        })
        .collect();

    for (field, _) in &services {
        w.line(format!("private ${field};"));
    }
    w.blank();

    w.line("public function __construct(array $config = [])");
    w.open("{");
    for (field, class) in &services {
        w.line(format!("$this->{field} = new {class}($this);"));
    }
    w.blank();
    w.line("parent::__construct($config);");
    w.close("}");
    w.blank();

    for (field, _) in &services {
        w.line(format!("public function {field}()"));
        w.open("{");
        w.line(format!("return $this->{field};"));
        w.close("}");
        w.blank();
    }

    w.line("public function extractBody(ResponseInterface $response)");
    w.open("{");
    w.open("if (Response::HTTP_OK == $response->getStatusCode()) {");
    w.line("$result = $response->getBody()->getContents();");
    w.open("if ($result) {");
    w.line("return json_decode($result, true);");
    w.close("}");
    w.close("}");
    w.blank();
    w.line("return [];");
    w.close("}");
    w.blank();

    w.line("public function getContent(array $result)");
    w.open("{");
    w.open("if (!empty($result) && isset($result['status'])) {");
    w.open("if (Response::HTTP_OK != $result['status']) {");
    w.line("throw new \\Exception($result['errorMsg'], $result['status']);");
    w.close("}");
    w.line("return $result['content'];");
    w.close("}");
    w.blank();
    w.line("throw new \\Exception('client error', 4000);");
    w.close("}");

    w.close("}");
    w.finish()
}
