//! Destination replacement: validation, removal/staging and copy orchestration.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::copy::copy_tree_into;
use crate::report::ReportCopy;
use crate::spec::{EnumReplaceStrategy, ReplaceTreeError, SpecReplaceOptions};
use crate::util::{derive_parent_dir, is_overlap, resolve_path};

/// Replace the directory tree at `dir_destination` with a copy of `dir_source`.
///
/// Validation happens before anything is touched:
/// - the source must be an existing directory,
/// - source and destination must not overlap,
/// - an existing destination must be a real directory (not a file or link).
///
/// Then the parent of the destination is created if needed and the copy is
/// performed according to [`SpecReplaceOptions::rule_replace`]:
/// - [`EnumReplaceStrategy::RemoveThenCopy`] deletes the old tree first. A
///   failing copy leaves a partial destination; there is no rollback.
/// - [`EnumReplaceStrategy::StageThenRename`] copies into a hidden sibling and
///   only removes the old tree once the copy has fully succeeded.
///
/// Returns [`ReportCopy`] when every entry was copied. Any per-entry failure
/// turns into [`ReplaceTreeError::CopyIncomplete`], which still carries the
/// report.
pub fn replace_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_options: SpecReplaceOptions,
) -> Result<ReportCopy, ReplaceTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref();
    let path_dir_dst = dir_destination.as_ref();

    validate_replace_paths(path_dir_src, path_dir_dst)?;
    debug!(
        "replacing {} with a copy of {} ({:?})",
        path_dir_dst.display(),
        path_dir_src.display(),
        spec_options
    );

    if spec_options.if_dry_run {
        let report = copy_tree_into(path_dir_src, path_dir_dst, &spec_options)?;
        return finish_report(path_dir_dst, report);
    }

    let path_dir_parent = derive_parent_dir(path_dir_dst);
    fs::create_dir_all(&path_dir_parent).map_err(|e| ReplaceTreeError::DestinationInitFailed {
        path: path_dir_parent.clone(),
        source: e,
    })?;

    match spec_options.rule_replace {
        EnumReplaceStrategy::RemoveThenCopy => {
            remove_existing_destination(path_dir_dst)?;
            let report = copy_tree_into(path_dir_src, path_dir_dst, &spec_options)?;
            finish_report(path_dir_dst, report)
        }
        EnumReplaceStrategy::StageThenRename => {
            replace_via_staging(path_dir_src, path_dir_dst, &path_dir_parent, &spec_options)
        }
    }
}

fn validate_replace_paths(
    path_dir_src: &Path,
    path_dir_dst: &Path,
) -> Result<(), ReplaceTreeError> {
    if !path_dir_src.is_dir() {
        return Err(ReplaceTreeError::SourceNotDirectory(
            path_dir_src.to_path_buf(),
        ));
    }

    match fs::symlink_metadata(path_dir_dst) {
        Ok(meta_dst) if meta_dst.file_type().is_symlink() => {
            return Err(ReplaceTreeError::DestinationIsSymlink(
                path_dir_dst.to_path_buf(),
            ));
        }
        Ok(meta_dst) if !meta_dst.is_dir() => {
            return Err(ReplaceTreeError::DestinationNotDirectory(
                path_dir_dst.to_path_buf(),
            ));
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(ReplaceTreeError::DestinationInitFailed {
                path: path_dir_dst.to_path_buf(),
                source: e,
            });
        }
    }

    if is_overlap(path_dir_src, path_dir_dst) {
        return Err(ReplaceTreeError::SourceDestinationOverlap {
            src: resolve_path(path_dir_src),
            dst: resolve_path(path_dir_dst),
        });
    }
    Ok(())
}

/// Delete the tree at `path_dir_dst`; a missing destination is not an error.
fn remove_existing_destination(path_dir_dst: &Path) -> Result<(), ReplaceTreeError> {
    match fs::remove_dir_all(path_dir_dst) {
        Ok(_) => {
            debug!("removed existing destination {}", path_dir_dst.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ReplaceTreeError::DestinationRemoveFailed {
            path: path_dir_dst.to_path_buf(),
            source: e,
        }),
    }
}

fn replace_via_staging(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    path_dir_parent: &Path,
    spec_options: &SpecReplaceOptions,
) -> Result<ReportCopy, ReplaceTreeError> {
    let name_dst = path_dir_dst.file_name().unwrap_or(OsStr::new("tree"));
    // Removed on drop, whichever way this function returns.
    let dir_staging = tempfile::Builder::new()
        .prefix(&format!(".{}.staging-", name_dst.to_string_lossy()))
        .tempdir_in(path_dir_parent)
        .map_err(|e| ReplaceTreeError::StagingFailed {
            path: path_dir_parent.to_path_buf(),
            source: e,
        })?;
    let path_dir_staged: PathBuf = dir_staging.path().join(name_dst);
    debug!("staging copy in {}", path_dir_staged.display());

    let report = copy_tree_into(path_dir_src, &path_dir_staged, spec_options)?;
    if !report.is_complete() {
        debug!(
            "staged copy incomplete, keeping existing {}",
            path_dir_dst.display()
        );
        return finish_report(path_dir_dst, report);
    }

    remove_existing_destination(path_dir_dst)?;
    fs::rename(&path_dir_staged, path_dir_dst).map_err(|e| ReplaceTreeError::StagingFailed {
        path: path_dir_dst.to_path_buf(),
        source: e,
    })?;
    finish_report(path_dir_dst, report)
}

fn finish_report(
    path_dir_dst: &Path,
    report: ReportCopy,
) -> Result<ReportCopy, ReplaceTreeError> {
    info!("{report}");
    if report.is_complete() {
        return Ok(report);
    }
    Err(ReplaceTreeError::CopyIncomplete {
        destination: path_dir_dst.to_path_buf(),
        report,
    })
}
