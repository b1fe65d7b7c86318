use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::cache::FieldCache;

/// Suffix that marks a request contract type.
pub const REQUEST_SUFFIX: &str = "Request";
/// Suffix that marks a response contract type.
pub const RESPONSE_SUFFIX: &str = "Response";

/// Where a declaration lives in its source file (1-based line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePos {
    pub path: PathBuf,
    pub line: usize,
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// The structural form of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Identifier,
    Array,
    Map,
    ArrayOfMap,
    MapOfArray,
    Struct,
    Pointer,
    Interface,
}

/// What a field's shape ultimately refers to.
///
/// Exactly one variant describes a field, so a shape can never be both an
/// inline struct and a named type reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "of", rename_all = "kebab-case")]
pub enum ElementType {
    /// A language builtin such as `int64` or `string`.
    Builtin(String),
    /// A type declared in the same file.
    Declared(String),
    /// A type declared in the shared base package.
    Shared { alias: String, name: String },
    /// An anonymous struct, fields in source order.
    Nested(Vec<FieldShape>),
    /// `interface{}`.
    Any,
}

impl ElementType {
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin(_))
    }

    /// Name of the referenced declaration, if any.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Self::Declared(name) | Self::Shared { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Key of the referenced declaration in a resource's field cache.
    ///
    /// Shared references are qualified with their package alias.
    pub fn cache_key(&self) -> Option<String> {
        match self {
            Self::Declared(name) => Some(name.clone()),
            Self::Shared { alias, name } => Some(format!("{alias}.{name}")),
            _ => None,
        }
    }
}

/// One struct field, possibly recursive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldShape {
    /// Empty for embedded fields.
    pub name: String,
    pub kind: FieldKind,
    pub element: ElementType,
    /// Key identifier for the map forms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_key: Option<String>,
    /// The raw tag, backticks included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub line: usize,
}

impl FieldShape {
    pub fn is_embedded(&self) -> bool {
        self.name.is_empty()
    }

    /// Nested fields for inline struct shapes.
    pub fn nested(&self) -> Option<&[FieldShape]> {
        match &self.element {
            ElementType::Nested(fields) => Some(fields),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    Request,
    Response,
    General,
}

impl TypeCategory {
    /// Classifies a type name by its suffix.
    pub fn of(name: &str) -> Self {
        if name.ends_with(REQUEST_SUFFIX) {
            Self::Request
        } else if name.ends_with(RESPONSE_SUFFIX) {
            Self::Response
        } else {
            Self::General
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum TypeBody {
    Struct(Vec<FieldShape>),
    /// A top-level named scalar such as `type Status int`.
    Scalar(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDecl {
    pub name: String,
    pub category: TypeCategory,
    pub body: TypeBody,
    pub pos: SourcePos,
}

impl TypeDecl {
    pub fn fields(&self) -> &[FieldShape] {
        match &self.body {
            TypeBody::Struct(fields) => fields,
            TypeBody::Scalar(_) => &[],
        }
    }

    /// The name with its Request/Response suffix removed.
    pub fn stem(&self) -> &str {
        match self.category {
            TypeCategory::Request => self.name.strip_suffix(REQUEST_SUFFIX).unwrap_or(&self.name),
            TypeCategory::Response => self.name.strip_suffix(RESPONSE_SUFFIX).unwrap_or(&self.name),
            TypeCategory::General => &self.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Parses a route method token, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// GET sends its request as a query string; everything else as a body.
    pub fn is_query_encoded(self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteBinding {
    pub action: String,
    pub method: HttpMethod,
    pub path: String,
    pub pos: SourcePos,
}

/// A request/response pair sharing one action stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionPair {
    pub action: String,
    pub request: TypeDecl,
    pub response: TypeDecl,
    /// A general type named exactly like the stem, promoted into the pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<TypeDecl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteBinding>,
}

/// One operand of a binary constant expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Operand {
    Ident(String),
    Literal(String),
}

impl Operand {
    fn is_iota(&self) -> bool {
        matches!(self, Self::Ident(name) if name == IOTA)
    }

    fn substitute(&self, ordinal: usize) -> Operand {
        if self.is_iota() {
            Operand::Literal(ordinal.to_string())
        } else {
            self.clone()
        }
    }
}

/// The auto-increment sentinel.
pub const IOTA: &str = "iota";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConstValue {
    Ident { name: String },
    Literal { text: String },
    Binary { left: Operand, op: String, right: Operand },
}

impl ConstValue {
    pub fn mentions_iota(&self) -> bool {
        match self {
            Self::Ident { name } => name == IOTA,
            Self::Literal { .. } => false,
            Self::Binary { left, right, .. } => left.is_iota() || right.is_iota(),
        }
    }

    /// Replaces the auto-increment sentinel with a concrete ordinal.
    pub fn with_ordinal(&self, ordinal: usize) -> ConstValue {
        match self {
            Self::Ident { name } if name == IOTA => Self::Literal {
                text: ordinal.to_string(),
            },
            Self::Binary { left, op, right } => Self::Binary {
                left: left.substitute(ordinal),
                op: op.clone(),
                right: right.substitute(ordinal),
            },
            other => other.clone(),
        }
    }
}

/// A run of constants: either one named value or an auto-incrementing group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantGroup {
    /// Index of the `const` declaration this group came from.
    pub block: usize,
    /// Value of the sentinel at the group's first member.
    pub first_ordinal: usize,
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    pub value: ConstValue,
    pub auto_increment: bool,
    pub pos: SourcePos,
}

impl ConstantGroup {
    /// Every member with its own value, the sentinel replaced by the member's ordinal.
    pub fn expanded(&self) -> Vec<(&str, ConstValue)> {
        self.members
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), self.value.with_ordinal(self.first_ordinal + i)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportClass {
    InternalTypespec,
    InternalOther,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportBinding {
    pub alias: String,
    pub path: String,
    pub class: ImportClass,
    pub pos: SourcePos,
}

/// The Interface Model of one resource's type file.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceModel {
    pub source: PathBuf,
    /// Go package clause of the type file.
    pub package: String,
    /// UpperCamel resource name, e.g. `Widget`.
    pub resource: String,
    /// File name without extension, e.g. `widget` or `user_info`.
    pub file_stem: String,
    pub imports: Vec<ImportBinding>,
    pub constants: Vec<ConstantGroup>,
    pub general: Vec<TypeDecl>,
    pub pairs: Vec<ActionPair>,
    #[serde(skip)]
    pub cache: FieldCache,
}

impl ResourceModel {
    /// Directory and package name used for this resource's generated code.
    pub fn output_package(&self) -> String {
        self.file_stem.replace('_', "")
    }

    pub fn routed_pairs(&self) -> impl Iterator<Item = (&ActionPair, &RouteBinding)> {
        self.pairs
            .iter()
            .filter_map(|pair| pair.route.as_ref().map(|route| (pair, route)))
    }

    /// Looks up a same-file declaration by name.
    pub fn declaration(&self, name: &str) -> Option<&TypeDecl> {
        self.general
            .iter()
            .chain(self.pairs.iter().flat_map(|p| {
                std::iter::once(&p.request)
                    .chain(std::iter::once(&p.response))
                    .chain(p.shared.iter())
            }))
            .find(|decl| decl.name == name)
    }
}

/// The Interface Model of the project-wide shared base file.
#[derive(Debug, Clone, Serialize)]
pub struct SharedModel {
    pub source: PathBuf,
    pub constants: Vec<ConstantGroup>,
    pub types: Vec<TypeDecl>,
    #[serde(skip)]
    pub cache: FieldCache,
}

impl SharedModel {
    pub fn declaration(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|decl| decl.name == name)
    }
}
