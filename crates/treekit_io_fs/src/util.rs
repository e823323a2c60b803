use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Resolve `path` through the filesystem as far as it exists.
///
/// The longest existing ancestor is canonicalized (following symlinks) and
/// the missing tail is appended with `.`/`..` folded lexically, so paths
/// that do not exist yet still compare correctly against real ones.
pub(crate) fn resolve_path(path: &Path) -> PathBuf {
    let path_abs = _absolutize_path(path);

    let mut path_existing = path_abs.as_path();
    let mut l_tail = Vec::new();
    let path_resolved = loop {
        if let Ok(resolved) = fs::canonicalize(path_existing) {
            break resolved;
        }
        match (path_existing.parent(), path_existing.file_name()) {
            (Some(parent), Some(name)) => {
                l_tail.push(name.to_os_string());
                path_existing = parent;
            }
            (Some(parent), None) => {
                // `..` or `.` as the last component: keep it for lexical folding.
                l_tail.push(path_existing.components().next_back().map_or_else(
                    Default::default,
                    |c| c.as_os_str().to_os_string(),
                ));
                path_existing = parent;
            }
            (None, _) => break path_existing.to_path_buf(),
        }
    };

    let mut path_out = path_resolved;
    for part in l_tail.iter().rev() {
        match Path::new(part).components().next() {
            Some(Component::ParentDir) => {
                path_out.pop();
            }
            Some(Component::CurDir) | None => {}
            Some(_) => path_out.push(part),
        }
    }
    path_out
}

/// `true` when one path is equal to, or nested inside, the other.
pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = resolve_path(src);
    let dst_resolved = resolve_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Directory that must exist before `path_dst` can be created.
pub(crate) fn derive_parent_dir(path_dst: &Path) -> PathBuf {
    match path_dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EntryCopy

/// Recreate the link at `path_src` under `path_dst`, pointing at the same target.
pub(crate) fn create_symbolic_link(path_src: &Path, path_dst: &Path) -> io::Result<()> {
    let target = fs::read_link(path_src)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, path_dst)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, path_dst);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Symbolic links are unsupported on this platform",
        ))
    }
}

pub(crate) fn copy_file(
    path_file_src: &Path,
    path_file_dst: &Path,
    if_preserve_metadata: bool,
) -> io::Result<()> {
    fs::copy(path_file_src, path_file_dst)?;
    if if_preserve_metadata {
        apply_metadata(path_file_src, path_file_dst)?;
        #[cfg(target_os = "linux")]
        copy_xattrs_linux(path_file_src, path_file_dst);
    }
    Ok(())
}

/// Copy permission bits and access/modification times from `path_src`.
///
/// For directories this must run after all children are written, or the
/// writes would bump the modification time again.
pub(crate) fn apply_metadata(path_src: &Path, path_dst: &Path) -> io::Result<()> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_src)?;
    fs::set_permissions(path_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_dst, file_time_access, file_time_modify)
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            log::trace!(
                "xattr {:?} not copied to {}: {e}",
                name,
                path_file_dst.display()
            );
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
