//! Owned declarations lowered from a Go syntax tree.
//!
//! Extraction never touches tree-sitter nodes directly; it matches on these
//! closed enums so that every syntactic form has to be handled explicitly.

/// A type expression in one of the forms API contracts may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `int64`, `Widget`
    Ident(String),
    /// `typespec.Pagination`
    Selector { package: String, name: String },
    /// `[]T` or `[N]T`
    Array(Box<TypeExpr>),
    /// `map[K]V`
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    /// `struct { ... }`
    Struct(Vec<FieldDecl>),
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `interface{ ... }`
    Interface,
}

impl TypeExpr {
    /// Short human-readable form name used in diagnostics.
    pub fn form(&self) -> &'static str {
        match self {
            Self::Ident(_) => "identifier",
            Self::Selector { .. } => "selector",
            Self::Array(_) => "array",
            Self::Map { .. } => "map",
            Self::Struct(_) => "struct",
            Self::Pointer(_) => "pointer",
            Self::Interface => "interface",
        }
    }
}

/// One struct field; embedded fields have no name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: Option<String>,
    pub ty: TypeExpr,
    /// Raw tag text including its delimiters.
    pub tag: Option<String>,
    pub comment: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: String,
    pub ty: TypeExpr,
    pub line: usize,
}

/// A constant value expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExpr {
    Ident(String),
    Literal(String),
    Binary {
        left: Box<ValueExpr>,
        op: String,
        right: Box<ValueExpr>,
    },
    /// Anything else, kept as source text for the error message.
    Other { kind: String, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstSpec {
    pub names: Vec<String>,
    pub ty: Option<String>,
    pub values: Vec<ValueExpr>,
    pub line: usize,
}

/// A `const` declaration; parenthesized blocks hold several specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstBlock {
    pub specs: Vec<ConstSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub alias: Option<String>,
    pub path: String,
    pub line: usize,
}

impl ImportSpec {
    /// The name the importing file uses for this package.
    pub fn local_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

/// A function or method with the comment lines directly above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub doc: Vec<String>,
    pub line: usize,
}
