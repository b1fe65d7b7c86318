use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A single positional problem found while checking a type file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.message)
    }
}

/// Errors emitted by SDK generation.
#[derive(Debug, Error)]
pub enum SdkGenError {
    #[error("Failed to read or write `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}:{column}: syntax error: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{}:{line}: {message}", path.display())]
    Validation {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{} request/response type(s) have no counterpart:\n{}", diagnostics.len(), render(diagnostics))]
    UnpairedTypes { diagnostics: Vec<Diagnostic> },

    #[error("{}:{line}: `{import}` is not a whitelisted package for API contracts", path.display())]
    Resolution {
        path: PathBuf,
        line: usize,
        import: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read git metadata under `{path}`: {source}")]
    Git {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to parse `{path}`: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Generated code for `{path}` does not parse: {message}")]
    CodeGen { path: PathBuf, message: String },

    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),
}

impl SdkGenError {
    pub(crate) fn validation(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_errors_render_path_and_line() {
        let err = SdkGenError::validation("api/typespec/widgettype/widget.go", 12, "map type not supported");
        assert_eq!(
            err.to_string(),
            "api/typespec/widgettype/widget.go:12: map type not supported"
        );
    }

    #[test]
    fn unpaired_types_list_every_offender() {
        let err = SdkGenError::UnpairedTypes {
            diagnostics: vec![
                Diagnostic {
                    path: PathBuf::from("a.go"),
                    line: 3,
                    message: "FooRequest has no matching FooResponse".into(),
                },
                Diagnostic {
                    path: PathBuf::from("a.go"),
                    line: 9,
                    message: "BarResponse has no matching BarRequest".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("2 request/response"));
        assert!(text.contains("a.go:3: FooRequest"));
        assert!(text.contains("a.go:9: BarResponse"));
    }
}
