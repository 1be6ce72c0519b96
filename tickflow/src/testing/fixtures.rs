//! Helpers for laying out config and script trees on disk.

use crate::config::{CONFIGS_DIR, CONFIG_EXTENSION};
use crate::identifier::NodeIdentifier;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn write_file(path: PathBuf, contents: &str) -> io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path)
}

/// Writes `<root>/configs/<namespace>/<name>.yml`.
///
/// # Errors
///
/// Returns any IO error.
pub fn write_builtin_config(
    root: &Path,
    identifier: &NodeIdentifier,
    yaml: &str,
) -> io::Result<PathBuf> {
    let path = root
        .join(CONFIGS_DIR)
        .join(identifier.namespace())
        .join(format!("{}.{CONFIG_EXTENSION}", identifier.name()));
    write_file(path, yaml)
}

/// Writes `<custom_dir>/configs/<name>.yml`.
///
/// # Errors
///
/// Returns any IO error.
pub fn write_custom_config(custom_dir: &Path, name: &str, yaml: &str) -> io::Result<PathBuf> {
    let path = custom_dir
        .join(CONFIGS_DIR)
        .join(format!("{name}.{CONFIG_EXTENSION}"));
    write_file(path, yaml)
}

/// Writes `<custom_dir>/<name>.rhai`.
///
/// # Errors
///
/// Returns any IO error.
pub fn write_script(custom_dir: &Path, name: &str, source: &str) -> io::Result<PathBuf> {
    write_file(custom_dir.join(format!("{name}.rhai")), source)
}

/// Renders a minimal node config with the given keys.
#[must_use]
pub fn contract_yaml(inputs: &[&str], outputs: &[&str]) -> String {
    let list = |keys: &[&str]| {
        if keys.is_empty() {
            "[\"none\"]".to_string()
        } else {
            format!("[{}]", keys.join(", "))
        }
    };
    format!("input: {}\noutput: {}\n", list(inputs), list(outputs))
}
