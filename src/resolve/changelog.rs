//! Changelog conflict-marker resolution
//!
//! Merges two-way conflict blocks (`<<<<<<<` / `=======` / `>>>>>>>`) in a
//! changelog file by concatenating both sides instead of choosing one. This is
//! deliberately narrow: line-block concatenation only, no semantic merging.
//! Changelogs are append-mostly, so keeping both entries is almost always what
//! a human resolver would do by hand.

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Prefix that opens a conflict block (note the trailing space).
pub const START_MARKER: &str = "<<<<<<< ";
/// Prefix separating the two sides of a block.
const SEPARATOR: &str = "=======";
/// Prefix that closes a conflict block (note the trailing space).
const END_MARKER: &str = ">>>>>>> ";

/// Errors that can occur while resolving changelog conflicts
#[derive(Error, Debug)]
pub enum ChangelogError {
    #[error("nested conflict marker at line {line}: a new block starts before the previous one ends")]
    NestedMarkers { line: usize },

    #[error("unterminated conflict block starting at line {line}")]
    UnterminatedBlock { line: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Order in which the two sides of a conflict block are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockOrder {
    /// Incoming ("theirs") lines above current ("ours") lines
    #[default]
    IncomingFirst,
    /// Current ("ours") lines above incoming ("theirs") lines
    CurrentFirst,
}

impl std::fmt::Display for BlockOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockOrder::IncomingFirst => write!(f, "incoming-first"),
            BlockOrder::CurrentFirst => write!(f, "current-first"),
        }
    }
}

/// What [`resolve_changelog_file`] found on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogOutcome {
    /// The file does not exist in the working tree
    Absent,
    /// The file exists but contains no conflict markers
    NoMarkers,
    /// Conflict blocks were merged and the file was rewritten
    Merged,
}

/// Parser state while scanning a file for conflict blocks
enum ParseState {
    Normal,
    InOurs,
    InTheirs,
}

/// Merge every conflict block in `content`, concatenating both sides of each
/// block in `order`.
///
/// Returns `Ok(None)` when the text contains no start marker (the input is
/// passed through untouched). Marker lines are dropped; all content lines on
/// both sides are kept, in document order across blocks. The presence or
/// absence of a trailing newline is preserved exactly.
///
/// A start marker inside an open block, or a block still open at end of
/// input, is an error: such files were hand-edited or corrupted, and merging
/// them would silently destroy content.
pub fn merge_conflict_markers(
    content: &str,
    order: BlockOrder,
) -> Result<Option<String>, ChangelogError> {
    if !content.contains(START_MARKER) {
        return Ok(None);
    }

    let mut merged: Vec<&str> = Vec::new();
    let mut ours: Vec<&str> = Vec::new();
    let mut theirs: Vec<&str> = Vec::new();
    let mut state = ParseState::Normal;
    let mut block_start = 0usize;

    for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;
        match state {
            ParseState::Normal => {
                if line.starts_with(START_MARKER) {
                    state = ParseState::InOurs;
                    block_start = lineno;
                } else {
                    // Stray separators or end markers outside a block are
                    // ordinary content here, same as any other line.
                    merged.push(line);
                }
            }
            ParseState::InOurs => {
                if line.starts_with(START_MARKER) {
                    return Err(ChangelogError::NestedMarkers { line: lineno });
                }
                if line.starts_with(SEPARATOR) {
                    state = ParseState::InTheirs;
                } else {
                    ours.push(line);
                }
            }
            ParseState::InTheirs => {
                if line.starts_with(START_MARKER) {
                    return Err(ChangelogError::NestedMarkers { line: lineno });
                }
                if line.starts_with(END_MARKER) {
                    match order {
                        BlockOrder::IncomingFirst => {
                            merged.append(&mut theirs);
                            merged.append(&mut ours);
                        }
                        BlockOrder::CurrentFirst => {
                            merged.append(&mut ours);
                            merged.append(&mut theirs);
                        }
                    }
                    state = ParseState::Normal;
                } else {
                    theirs.push(line);
                }
            }
        }
    }

    if !matches!(state, ParseState::Normal) {
        return Err(ChangelogError::UnterminatedBlock { line: block_start });
    }

    let mut resolved = merged.join("\n");
    if content.ends_with('\n') {
        resolved.push('\n');
    }
    Ok(Some(resolved))
}

/// Resolve conflict markers in the changelog file at `root/rel_path`,
/// rewriting it in place when blocks were merged.
///
/// Staging the rewritten file is the caller's job; this function never
/// touches the git index.
pub fn resolve_changelog_file(
    root: &Path,
    rel_path: &str,
    order: BlockOrder,
) -> Result<ChangelogOutcome, ChangelogError> {
    let path = root.join(rel_path);
    if !path.is_file() {
        return Ok(ChangelogOutcome::Absent);
    }

    let content = fs::read_to_string(&path)?;
    match merge_conflict_markers(&content, order)? {
        None => Ok(ChangelogOutcome::NoMarkers),
        Some(resolved) => {
            fs::write(&path, resolved)?;
            debug!(path = %path.display(), %order, "merged changelog conflict blocks");
            Ok(ChangelogOutcome::Merged)
        }
    }
}
