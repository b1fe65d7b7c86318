#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sdkgen_lib::{DistributionMode, GeneratorConfig, SdkGenerator};
use tempfile::TempDir;

/// Copies `tests/fixtures/shop` into a fresh temp directory.
pub fn shop() -> io::Result<TempDir> {
    let temp_dir = TempDir::new()?;
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/shop");
    copy_tree(&fixture, temp_dir.path())?;
    Ok(temp_dir)
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

pub fn generator(root: &Path) -> SdkGenerator {
    SdkGenerator::new(root, GeneratorConfig::default(), DistributionMode::Local)
}

/// Output directory of the Go SDK in local mode.
pub fn go_out(root: &Path) -> PathBuf {
    root.join("sdk/shop")
}

/// Every file under `dir` with its contents, sorted by path.
pub fn snapshot(dir: &Path) -> io::Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    collect(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect(dir: &Path, files: &mut Vec<(PathBuf, String)>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(&path, files)?;
        } else {
            let contents = fs::read_to_string(&path)?;
            files.push((path, contents));
        }
    }
    Ok(())
}

pub fn write(root: &Path, relative: &str, contents: &str) -> io::Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path)
}
