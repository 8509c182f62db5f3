//! Migration file parsing
//!
//! A migration file is a UTF-8 text file divided into blocks, each
//! introduced by a directive line: `-- migrate:up`, `-- migrate:down`, or
//! their `:slave` variants destined for replicas. A block runs from its
//! directive line to the character before the next directive (the last
//! block runs to end of file). Options such as `transaction:false` follow
//! the directive on the same line.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tm_db::Wildcards;

/// Contents written into a newly generated migration file.
pub const MIGRATION_TEMPLATE: &str = "-- migrate:up\n\n\n-- migrate:down\n\n";

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^--\s*migrate:(?:up|down)(?::slave)?(\s*$|\s+\S+)").expect("valid regex")
});
static UP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^--\s*migrate:up(\s*$|\s+\S+)").expect("valid regex"));
static DOWN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^--\s*migrate:down(\s*$|\s+\S+)$").expect("valid regex"));
static UP_REPLICA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^--\s*migrate:up:slave(\s*$|\s+\S+)").expect("valid regex"));
static DOWN_REPLICA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^--\s*migrate:down:slave(\s*$|\s+\S+)$").expect("valid regex")
});
static DIRECTIVE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^--\s*migrate:(up|down)(:slave)?").expect("valid regex"));
static EMPTY_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*$").expect("valid regex"));
static COMMENT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*--").expect("valid regex"));

/// Options parsed from a block's directive line.
///
/// The only recognized key is `transaction`; unknown and malformed pairs
/// are dropped at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockOptions(HashMap<String, String>);

impl BlockOptions {
    /// Whether this block runs inside a transaction. Defaults to true.
    pub fn transaction(&self) -> bool {
        self.0.get("transaction").map(String::as_str) != Some("false")
    }
}

/// One directive-introduced region of a migration file.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Raw text including the directive line; empty when the block was
    /// absent from the file.
    pub contents: String,

    /// Options from the directive line.
    pub options: BlockOptions,
}

impl Block {
    /// Whether the block was present in the file.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Contents with every `{{IDENT}}` token substituted from `wildcards`.
    ///
    /// Identifiers without a mapping pass through unchanged. With
    /// `enabled` false the contents are returned verbatim regardless of
    /// the mapping.
    pub fn contents_replaced(&self, wildcards: &Wildcards, enabled: bool) -> String {
        if !enabled || wildcards.is_empty() {
            return self.contents.clone();
        }

        let mut replaced = self.contents.clone();
        for (key, value) in wildcards {
            replaced = replaced.replace(&format!("{{{{{key}}}}}"), value);
        }
        replaced
    }
}

/// A parsed migration file: up/down blocks for the primary and their
/// replica variants. Only `up` is mandatory.
#[derive(Debug, Clone, Default)]
pub struct MigrationFile {
    pub up: Block,
    pub down: Block,
    pub up_replica: Block,
    pub down_replica: Block,
}

/// Read and parse the migration file at `path`.
pub fn parse_migration_file(path: &Path) -> Result<MigrationFile> {
    let contents = fs::read_to_string(path)?;
    parse_migration_contents(&contents)
}

/// Parse the text of one migration file into its blocks.
///
/// Blocks may appear in any order. Errors: no up block, duplicate blocks
/// of one kind, or statements preceding the first directive.
pub fn parse_migration_contents(contents: &str) -> Result<MigrationFile> {
    let starts: Vec<usize> = DIRECTIVE_RE.find_iter(contents).map(|m| m.start()).collect();
    if starts.is_empty() {
        return Err(Error::ParseMissingUp);
    }

    let mut file = MigrationFile::default();
    for (idx, &start) in starts.iter().enumerate() {
        let end = match starts.get(idx + 1) {
            Some(&next_start) => next_start - 1,
            None => contents.len(),
        };
        classify_block(&mut file, &contents[start..end])?;
    }

    for line in contents[..starts[0]].lines() {
        if EMPTY_LINE_RE.is_match(line) || COMMENT_LINE_RE.is_match(line) {
            continue;
        }
        return Err(Error::ParseUnexpectedStmt);
    }

    if file.up.is_empty() {
        return Err(Error::ParseMissingUp);
    }

    Ok(file)
}

/// Assign one block to its slot in `file` by directive kind.
///
/// A block whose directive matches none of the anchored patterns (for
/// example `-- migrate:down a b`) is dropped, not an error.
fn classify_block(file: &mut MigrationFile, block_text: &str) -> Result<()> {
    let slot = if UP_REPLICA_RE.is_match(block_text) {
        &mut file.up_replica
    } else if DOWN_REPLICA_RE.is_match(block_text) {
        &mut file.down_replica
    } else if UP_RE.is_match(block_text) {
        &mut file.up
    } else if DOWN_RE.is_match(block_text) {
        &mut file.down
    } else {
        return Ok(());
    };

    if !slot.contents.is_empty() {
        return Err(Error::ParseDuplicateBlock);
    }

    slot.options = parse_block_options(block_text);
    slot.contents = block_text.to_string();
    Ok(())
}

/// Parse `key:value` options from a block's directive line.
fn parse_block_options(block_text: &str) -> BlockOptions {
    let directive_line = block_text.lines().next().unwrap_or_default();
    let rest = DIRECTIVE_PREFIX_RE.replace(directive_line, "");

    let mut options = HashMap::new();
    for token in rest.split_whitespace() {
        let pair: Vec<&str> = token.split(':').collect();
        if pair.len() == 2 {
            options.insert(pair[0].to_string(), pair[1].to_string());
        }
    }
    BlockOptions(options)
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
