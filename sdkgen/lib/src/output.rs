//! Validation and atomic writing of generated files.
//!
//! Every file is re-parsed with the grammar of its dialect before anything
//! is written, and each write goes through a temp file in the destination
//! directory followed by a rename, so readers never see a truncated file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};
use tree_sitter::{Language, Parser};

use crate::emit::{Dialect, GeneratedFile};
use crate::error::SdkGenError;
use crate::file::go_file::first_syntax_error;

/// Writes `contents` to `path` through a sibling temp file and a rename.
///
/// Parent directories are created as needed.
///
/// ## Errors
/// Returns `Io` naming the path that could not be created or written.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), SdkGenError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|source| SdkGenError::io(parent, source))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|source| SdkGenError::io(parent, source))?;
    temp.write_all(contents.as_bytes())
        .map_err(|source| SdkGenError::io(temp.path(), source))?;
    temp.persist(path)
        .map_err(|err| SdkGenError::io(path, err.error))?;

    debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

fn language(dialect: Dialect) -> Language {
    match dialect {
        Dialect::Go => tree_sitter_go::LANGUAGE.into(),
        Dialect::Php => tree_sitter_php::LANGUAGE_PHP.into(),
    }
}

/// Re-parses generated text with the grammar of its dialect.
///
/// ## Errors
/// Returns `CodeGen` with the position of the first syntax error.
pub fn validate(file: &GeneratedFile) -> Result<(), SdkGenError> {
    let codegen = |message: String| SdkGenError::CodeGen {
        path: file.path.clone(),
        message,
    };

    let mut parser = Parser::new();
    parser
        .set_language(&language(file.dialect))
        .map_err(|err| codegen(err.to_string()))?;
    let tree = parser
        .parse(&file.contents, None)
        .ok_or_else(|| codegen("parser produced no tree".to_string()))?;

    match first_syntax_error(tree.root_node()) {
        Some(node) => {
            let at = node.start_position();
            let what = if node.is_missing() { "missing" } else { "unexpected" };
            Err(codegen(format!(
                "{what} `{}` at {}:{}",
                node.kind(),
                at.row + 1,
                at.column + 1
            )))
        }
        None => Ok(()),
    }
}

/// Validates every file, then writes them all (or prints them on a dry run).
///
/// Nothing is written unless every file validates.
///
/// ## Returns
/// The paths written, or that would have been written on a dry run.
///
/// ## Errors
/// Returns the first `CodeGen` or `Io` error.
#[instrument(skip(files), fields(files = files.len()))]
pub fn write_all(files: &[GeneratedFile], dry_run: bool) -> Result<Vec<PathBuf>, SdkGenError> {
    for file in files {
        validate(file)?;
    }

    if dry_run {
        for file in files {
            println!("=== {} ===\n{}", file.path.display(), file.contents);
        }
    } else {
        for file in files {
            write_atomic(&file.path, &file.contents)?;
        }
        info!(count = files.len(), "generated files written");
    }

    Ok(files.iter().map(|file| file.path.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn go(path: PathBuf, contents: &str) -> GeneratedFile {
        GeneratedFile {
            path,
            contents: contents.to_string(),
            dialect: Dialect::Go,
        }
    }

    #[test]
    fn write_atomic_creates_parent_directories() -> Result<(), SdkGenError> {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("sdk/widget/widget.go");

        write_atomic(&path, "package widget\n")?;

        assert_eq!(fs::read_to_string(&path).expect("read back"), "package widget\n");
        Ok(())
    }

    #[test]
    fn write_atomic_replaces_without_leftovers() -> Result<(), SdkGenError> {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("client.go");
        fs::write(&path, "old").expect("seed file");

        write_atomic(&path, "package shop\n")?;

        assert_eq!(fs::read_to_string(&path).expect("read back"), "package shop\n");
        let entries = fs::read_dir(dir.path()).expect("list").count();
        assert_eq!(entries, 1);
        Ok(())
    }

    #[test]
    fn validate_rejects_broken_go() {
        let file = go(PathBuf::from("broken.go"), "package x\n\ntype A struct {\n");
        let err = validate(&file).expect_err("unterminated struct");
        assert!(matches!(err, SdkGenError::CodeGen { .. }), "{err:?}");
        assert!(err.to_string().contains("broken.go"));
    }

    #[test]
    fn validate_accepts_php() -> Result<(), SdkGenError> {
        validate(&GeneratedFile {
            path: PathBuf::from("A.php"),
            contents: "<?php\n\nnamespace App;\n\nclass A\n{\n    private $a;\n}\n".to_string(),
            dialect: Dialect::Php,
        })
    }

    #[test]
    fn nothing_is_written_when_one_file_is_invalid() {
        let dir = TempDir::new().expect("temp dir");
        let good = dir.path().join("good.go");
        let files = vec![
            go(good.clone(), "package good\n"),
            go(dir.path().join("bad.go"), "package bad\n\nfunc {\n"),
        ];

        assert!(write_all(&files, false).is_err());
        assert!(!good.exists());
    }

    #[test]
    fn dry_run_writes_nothing() -> Result<(), SdkGenError> {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("a.go");

        let planned = write_all(&[go(path.clone(), "package a\n")], true)?;

        assert_eq!(planned, vec![path.clone()]);
        assert!(!path.exists());
        Ok(())
    }
}
