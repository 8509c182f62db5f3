//! Migration file discovery
//!
//! Migration files live flat in one directory and are named
//! `<version><anything>.sql` where the version is a run of leading digits,
//! conventionally a `YYYYMMDDHHMMSS` timestamp so that lexicographic order
//! is chronological order.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static MIGRATION_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d.*\.sql$").expect("valid regex"));

/// All migration filenames in `dir`, sorted lexicographically.
///
/// Subdirectories and files not matching the naming convention are
/// ignored.
pub fn find_migration_files(dir: &Path) -> Result<Vec<String>> {
    find_matching_files(dir, &MIGRATION_FILE_RE)
}

/// The first migration file whose version prefix is `version`.
pub fn find_migration_file(dir: &Path, version: &str) -> Result<String> {
    let re = Regex::new(&format!(r"^{}.*\.sql$", regex::escape(version))).expect("valid regex");

    find_matching_files(dir, &re)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::MigrationNotFound {
            version: version.to_string(),
        })
}

/// The leading-digit version prefix of a migration filename.
pub fn migration_version(filename: &str) -> &str {
    let end = filename
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(filename.len());
    &filename[..end]
}

fn find_matching_files(dir: &Path, re: &Regex) -> Result<Vec<String>> {
    let dir_not_found = || Error::MigrationDirNotFound {
        dir: dir.display().to_string(),
    };

    let mut matches = Vec::new();
    for entry in fs::read_dir(dir).map_err(|_| dir_not_found())? {
        let entry = entry.map_err(|_| dir_not_found())?;
        if entry.path().is_dir() {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if re.is_match(name) {
            matches.push(name.to_string());
        }
    }

    matches.sort();
    Ok(matches)
}

#[cfg(test)]
#[path = "files_test.rs"]
mod tests;
