//! Replace specification models and top-level error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::report::ReportCopy;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Symlink handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopySymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    Dereference,
    /// Create a symbolic link at destination (do not copy target bytes).
    CopySymlinks,
    /// Ignore symlink entries.
    SkipSymlinks,
}

/// How the old destination tree gives way to the new copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumReplaceStrategy {
    /// Remove the destination, then copy into its place.
    ///
    /// A failure during the copy leaves a partial destination behind.
    RemoveThenCopy,
    /// Copy into a hidden sibling directory, then swap it into place.
    ///
    /// The old destination survives any failure of the copy phase.
    StageThenRename,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `replace_tree`.
#[derive(Debug, Clone)]
pub struct SpecReplaceOptions {
    /// Symlink handling behavior.
    pub rule_symlink: EnumCopySymlinkStrategy,
    /// Destination swap behavior.
    pub rule_replace: EnumReplaceStrategy,
    /// Copy permissions, timestamps and extended attributes.
    pub if_preserve_metadata: bool,
    /// Do not mutate filesystem; record what would happen.
    pub if_dry_run: bool,
}

impl Default for SpecReplaceOptions {
    fn default() -> Self {
        Self {
            rule_symlink: EnumCopySymlinkStrategy::Dereference,
            rule_replace: EnumReplaceStrategy::RemoveThenCopy,
            if_preserve_metadata: true,
            if_dry_run: false,
        }
    }
}

/// One copy failure item with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// Failures of one `replace_tree` call.
#[derive(Debug, Error)]
pub enum ReplaceTreeError {
    /// Source path is missing or not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// Source and destination overlap (`src` contains `dst` or vice versa).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        .src.display(),
        .dst.display()
    )]
    SourceDestinationOverlap {
        /// Resolved source directory.
        src: PathBuf,
        /// Resolved destination directory.
        dst: PathBuf,
    },
    /// Destination exists as a symbolic link.
    #[error("Destination must not be a symbolic link: {}", .0.display())]
    DestinationIsSymlink(PathBuf),
    /// Destination exists but is not a directory.
    #[error("Destination exists and is not a directory: {}", .0.display())]
    DestinationNotDirectory(PathBuf),
    /// Destination (or its parent) could not be created.
    #[error("Failed to initialize destination {}: {source}", .path.display())]
    DestinationInitFailed {
        /// Path that failed initialization.
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Existing destination tree could not be removed.
    #[error("Failed to remove existing destination {}: {source}", .path.display())]
    DestinationRemoveFailed {
        /// Destination path being removed.
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Staging directory could not be created or swapped into place.
    #[error("Failed to stage destination {}: {source}", .path.display())]
    StagingFailed {
        /// Staging or destination path involved.
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Traversal finished with per-entry errors.
    #[error(
        "{} entries failed while copying into {}",
        .report.error_count(),
        .destination.display()
    )]
    CopyIncomplete {
        /// Destination root of the copy.
        destination: PathBuf,
        /// Full run report, including the failed entries.
        report: ReportCopy,
    },
}

impl ReplaceTreeError {
    /// Whether the failure comes from the recursive copy itself rather than
    /// from plain filesystem setup.
    pub fn is_copy_library_error(&self) -> bool {
        matches!(
            self,
            Self::SourceDestinationOverlap { .. } | Self::CopyIncomplete { .. }
        )
    }

    /// Process exit status used when failures must be told apart.
    ///
    /// - `2`: invalid input paths
    /// - `3`: destination preparation failed
    /// - `4`: the copy phase finished with errors
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SourceNotDirectory(_)
            | Self::SourceDestinationOverlap { .. }
            | Self::DestinationIsSymlink(_)
            | Self::DestinationNotDirectory(_) => 2,
            Self::DestinationInitFailed { .. }
            | Self::DestinationRemoveFailed { .. }
            | Self::StagingFailed { .. } => 3,
            Self::CopyIncomplete { .. } => 4,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
