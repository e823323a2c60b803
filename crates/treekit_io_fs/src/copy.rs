//! Recursive tree traversal and per-entry copy.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::trace;

use crate::report::{ReportCopy, ReportCopyBuilder};
use crate::spec::{EnumCopySymlinkStrategy, ReplaceTreeError, SpecReplaceOptions};
use crate::util::{apply_metadata, copy_file, create_symbolic_link};

#[derive(Debug, Clone)]
struct SpecDirEntry {
    path_dir_src_sub: PathBuf,
    name_dir: OsString,
    if_is_symlink: bool,
}

#[derive(Debug, Clone)]
struct SpecFileEntry {
    path_file_src: PathBuf,
    name_file: OsString,
    if_is_symlink: bool,
}

#[derive(Debug)]
struct SpecCopyContext<'a> {
    spec_options: &'a SpecReplaceOptions,
    builder_report: ReportCopyBuilder,
    set_ancestor_dirs: HashSet<(u64, u64)>,
}

/// Copy the whole tree under `path_dir_src` into a new `path_dir_dst`.
///
/// `path_dir_dst` itself is created here; its parent must already exist.
/// Entry-level failures do not stop the walk, they are collected in the
/// returned report. Only failing to create the destination root aborts.
pub(crate) fn copy_tree_into(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_options: &SpecReplaceOptions,
) -> Result<ReportCopy, ReplaceTreeError> {
    if !spec_options.if_dry_run {
        fs::create_dir(path_dir_dst).map_err(|e| ReplaceTreeError::DestinationInitFailed {
            path: path_dir_dst.to_path_buf(),
            source: e,
        })?;
    }

    let mut spec_cp_ctx = SpecCopyContext {
        spec_options,
        builder_report: ReportCopyBuilder::default(),
        set_ancestor_dirs: HashSet::new(),
    };
    if let Some(key_ancestor) = enter_directory(path_dir_src, &mut spec_cp_ctx) {
        walk_directory(path_dir_src, path_dir_dst, &mut spec_cp_ctx);
        leave_directory(key_ancestor, &mut spec_cp_ctx);
    }
    finish_directory(path_dir_src, path_dir_dst, &mut spec_cp_ctx);

    Ok(spec_cp_ctx.builder_report.build())
}

fn walk_directory(path_dir_src: &Path, path_dir_dst: &Path, spec_cp_ctx: &mut SpecCopyContext) {
    let iter_entries = match fs::read_dir(path_dir_src) {
        Ok(iter) => iter,
        Err(e) => {
            spec_cp_ctx.builder_report.add_error(
                path_dir_src.to_path_buf(),
                format!("Failed to read directory {} ({e})", path_dir_src.display()),
            );
            return;
        }
    };

    let mut l_dirs: Vec<SpecDirEntry> = Vec::new();
    let mut l_files: Vec<SpecFileEntry> = Vec::new();

    for entry_res in iter_entries {
        let entry = match entry_res {
            Ok(v) => v,
            Err(e) => {
                spec_cp_ctx.builder_report.add_error(
                    path_dir_src.to_path_buf(),
                    format!(
                        "Failed to read directory entry under {} ({e})",
                        path_dir_src.display()
                    ),
                );
                continue;
            }
        };

        let path_entry = entry.path();
        let c_name = entry.file_name();
        let cfg_file_type = match entry.file_type() {
            Ok(v) => v,
            Err(e) => {
                spec_cp_ctx
                    .builder_report
                    .add_error(path_entry, format!("Failed to inspect entry ({e})"));
                continue;
            }
        };

        spec_cp_ctx.builder_report.add_scanned();
        let b_is_symlink = cfg_file_type.is_symlink();
        let b_is_dir = cfg_file_type.is_dir() || (b_is_symlink && path_entry.is_dir());
        if b_is_dir {
            l_dirs.push(SpecDirEntry {
                path_dir_src_sub: path_entry,
                name_dir: c_name,
                if_is_symlink: b_is_symlink,
            });
        } else if cfg_file_type.is_file() || b_is_symlink {
            l_files.push(SpecFileEntry {
                path_file_src: path_entry,
                name_file: c_name,
                if_is_symlink: b_is_symlink,
            });
        } else {
            spec_cp_ctx
                .builder_report
                .add_warning(format!("Special file skipped: {}", path_entry.display()));
            spec_cp_ctx.builder_report.add_skipped();
        }
    }

    l_dirs.sort_by(|a, b| a.name_dir.cmp(&b.name_dir));
    l_files.sort_by(|a, b| a.name_file.cmp(&b.name_file));

    for dir_entry in l_dirs {
        let path_dir_src_sub = dir_entry.path_dir_src_sub.clone();
        let path_dir_dst_sub = path_dir_dst.join(&dir_entry.name_dir);
        // Loops are rejected before anything is created for them.
        let Some(key_ancestor) = enter_directory(&path_dir_src_sub, spec_cp_ctx) else {
            continue;
        };
        if handle_dir_entry(dir_entry, &path_dir_dst_sub, spec_cp_ctx) {
            walk_directory(&path_dir_src_sub, &path_dir_dst_sub, spec_cp_ctx);
            finish_directory(&path_dir_src_sub, &path_dir_dst_sub, spec_cp_ctx);
        }
        leave_directory(key_ancestor, spec_cp_ctx);
    }

    for file_entry in l_files {
        let path_file_dst = path_dir_dst.join(&file_entry.name_file);
        handle_file_entry(file_entry, &path_file_dst, spec_cp_ctx);
    }
}

/// Register `path_dir` on the current descent chain.
///
/// Only followed links can form loops, so this is a no-op unless symlinks are
/// dereferenced. Returns `None` when the directory must not be entered (it is
/// already one of its own ancestors, or cannot be inspected); `Some(None)`
/// when nothing was registered.
fn enter_directory(
    path_dir: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Option<Option<(u64, u64)>> {
    if spec_cp_ctx.spec_options.rule_symlink != EnumCopySymlinkStrategy::Dereference {
        return Some(None);
    }

    let stat_dir = match fs::metadata(path_dir) {
        Ok(v) => v,
        Err(e) => {
            spec_cp_ctx.builder_report.add_error(
                path_dir.to_path_buf(),
                format!("Failed to stat directory {} ({e})", path_dir.display()),
            );
            return None;
        }
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let key = (stat_dir.dev(), stat_dir.ino());
        if !spec_cp_ctx.set_ancestor_dirs.insert(key) {
            spec_cp_ctx
                .builder_report
                .add_warning(format!("Symlink loop detected: {}", path_dir.display()));
            spec_cp_ctx.builder_report.add_skipped();
            return None;
        }
        Some(Some(key))
    }
    #[cfg(not(unix))]
    {
        let _ = stat_dir;
        Some(None)
    }
}

fn leave_directory(key_ancestor: Option<(u64, u64)>, spec_cp_ctx: &mut SpecCopyContext) {
    if let Some(key) = key_ancestor {
        spec_cp_ctx.set_ancestor_dirs.remove(&key);
    }
}

/// Copy directory metadata once its children are in place.
fn finish_directory(path_dir_src: &Path, path_dir_dst: &Path, spec_cp_ctx: &mut SpecCopyContext) {
    let spec_options = spec_cp_ctx.spec_options;
    if spec_options.if_dry_run || !spec_options.if_preserve_metadata {
        return;
    }
    if let Err(e) = apply_metadata(path_dir_src, path_dir_dst) {
        spec_cp_ctx.builder_report.add_warning(format!(
            "Failed to copy directory metadata to {} ({e})",
            path_dir_dst.display()
        ));
    }
}

/// Returns `true` when the walk should descend into this directory.
fn handle_dir_entry(
    spec_dir_entry: SpecDirEntry,
    path_dir_dst_sub: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> bool {
    let enum_rule_symlink = spec_cp_ctx.spec_options.rule_symlink;
    let if_dry_run = spec_cp_ctx.spec_options.if_dry_run;

    if spec_dir_entry.if_is_symlink {
        match enum_rule_symlink {
            EnumCopySymlinkStrategy::SkipSymlinks => {
                spec_cp_ctx.builder_report.add_skipped();
                return false;
            }
            EnumCopySymlinkStrategy::CopySymlinks => {
                if if_dry_run {
                    spec_cp_ctx.builder_report.add_planned();
                } else {
                    record_symlink(&spec_dir_entry.path_dir_src_sub, path_dir_dst_sub, spec_cp_ctx);
                }
                return false;
            }
            EnumCopySymlinkStrategy::Dereference => {}
        }
    }

    if if_dry_run {
        trace!("would create {}", path_dir_dst_sub.display());
        spec_cp_ctx.builder_report.add_planned();
        return true;
    }

    match fs::create_dir(path_dir_dst_sub) {
        Ok(_) => {
            trace!("created {}", path_dir_dst_sub.display());
            spec_cp_ctx.builder_report.add_copied();
            true
        }
        Err(e) => {
            spec_cp_ctx
                .builder_report
                .add_error(path_dir_dst_sub.to_path_buf(), e.to_string());
            false
        }
    }
}

fn handle_file_entry(
    spec_file_entry: SpecFileEntry,
    path_file_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) {
    let enum_rule_symlink = spec_cp_ctx.spec_options.rule_symlink;
    let if_dry_run = spec_cp_ctx.spec_options.if_dry_run;
    let path_file_src = &spec_file_entry.path_file_src;

    if spec_file_entry.if_is_symlink {
        match enum_rule_symlink {
            EnumCopySymlinkStrategy::SkipSymlinks => {
                spec_cp_ctx.builder_report.add_skipped();
                return;
            }
            EnumCopySymlinkStrategy::CopySymlinks => {
                if if_dry_run {
                    spec_cp_ctx.builder_report.add_planned();
                } else {
                    record_symlink(path_file_src, path_file_dst, spec_cp_ctx);
                }
                return;
            }
            EnumCopySymlinkStrategy::Dereference => {}
        }
    }

    // Regular files are checked without following links, dereferenced links
    // through their target.
    let res_meta = if spec_file_entry.if_is_symlink {
        fs::metadata(path_file_src)
    } else {
        fs::symlink_metadata(path_file_src)
    };
    let meta_file_src = match res_meta {
        Ok(v) => v,
        Err(e) if spec_file_entry.if_is_symlink && e.kind() == io::ErrorKind::NotFound => {
            spec_cp_ctx.builder_report.add_error(
                path_file_src.clone(),
                format!("Broken symlink: {}", path_file_src.display()),
            );
            return;
        }
        Err(e) if spec_file_entry.if_is_symlink => {
            spec_cp_ctx.builder_report.add_error(
                path_file_src.clone(),
                format!(
                    "Failed to resolve symlink {} ({:?}: {e})",
                    path_file_src.display(),
                    e.kind()
                ),
            );
            return;
        }
        Err(e) => {
            spec_cp_ctx
                .builder_report
                .add_error(path_file_src.clone(), e.to_string());
            return;
        }
    };
    if !meta_file_src.file_type().is_file() {
        let c_kind = if spec_file_entry.if_is_symlink {
            "Special file target skipped"
        } else {
            "Special file skipped"
        };
        spec_cp_ctx
            .builder_report
            .add_warning(format!("{c_kind}: {}", path_file_src.display()));
        spec_cp_ctx.builder_report.add_skipped();
        return;
    }

    if if_dry_run {
        trace!(
            "would copy {} -> {}",
            path_file_src.display(),
            path_file_dst.display()
        );
        spec_cp_ctx.builder_report.add_planned();
        return;
    }

    match copy_file(
        path_file_src,
        path_file_dst,
        spec_cp_ctx.spec_options.if_preserve_metadata,
    ) {
        Ok(_) => {
            trace!(
                "copied {} -> {}",
                path_file_src.display(),
                path_file_dst.display()
            );
            spec_cp_ctx.builder_report.add_copied();
        }
        Err(e) => spec_cp_ctx
            .builder_report
            .add_error(path_file_dst.to_path_buf(), e.to_string()),
    }
}

fn record_symlink(path_src: &Path, path_dst: &Path, spec_cp_ctx: &mut SpecCopyContext) {
    match create_symbolic_link(path_src, path_dst) {
        Ok(_) => spec_cp_ctx.builder_report.add_copied(),
        Err(e) => spec_cp_ctx
            .builder_report
            .add_error(path_dst.to_path_buf(), e.to_string()),
    }
}
