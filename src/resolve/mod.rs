//! Conflict resolution for the designated changelog file

pub mod changelog;

pub use changelog::{
    merge_conflict_markers, resolve_changelog_file, BlockOrder, ChangelogError, ChangelogOutcome,
};
