use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn treekit(src: &Path, dst: &Path, flags: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_treekit"))
        .args(flags)
        .arg(src)
        .arg(dst)
        .env_remove("RUST_LOG")
        .output()
        .expect("run treekit")
}

fn write_text(path: &Path, txt: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, txt).expect("write text");
}

#[test]
fn replaces_destination_and_prints_confirmation() {
    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("A");
    let dst = tmp.path().join("B");
    write_text(&src.join("file1.txt"), "hello");
    write_text(&src.join("sub/file2.txt"), "world");
    write_text(&dst.join("old.txt"), "stale");

    let output = treekit(&src, &dst, &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim_end(),
        format!(
            "Directory copied from '{}' to '{}' successfully.",
            src.display(),
            dst.display()
        )
    );
    assert!(!dst.join("old.txt").exists());
    assert_eq!(fs::read_to_string(dst.join("file1.txt")).unwrap(), "hello");
    assert_eq!(fs::read_to_string(dst.join("sub/file2.txt")).unwrap(), "world");
}

#[test]
fn missing_source_reports_error_but_exits_zero() {
    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("missing");
    let dst = tmp.path().join("dst");

    let output = treekit(&src, &dst, &[]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Error: Source is not a directory"), "{stdout}");
    assert!(!dst.exists());
}

#[test]
fn strict_exit_maps_failures_to_status_codes() {
    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("src");
    write_text(&src.join("a.txt"), "a");

    let output = treekit(
        &tmp.path().join("missing"),
        &tmp.path().join("dst"),
        &["--strict-exit"],
    );
    assert_eq!(output.status.code(), Some(2));

    let output = treekit(&src, &src.join("inner"), &["--strict-exit"]);
    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with(
            "Error: Failed to copy directory: Source and destination directories overlap"
        ),
        "{stdout}"
    );

    let output = treekit(&src, &tmp.path().join("ok"), &["--strict-exit"]);
    assert_eq!(output.status.code(), Some(0));
}

#[cfg(unix)]
#[test]
fn strict_exit_reports_incomplete_copy() {
    use std::os::unix::fs::symlink;

    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    write_text(&src.join("good.txt"), "good");
    symlink(tmp.path().join("nowhere"), src.join("dangling")).expect("create symlink");
    write_text(&dst.join("old.txt"), "old");

    let output = treekit(&src, &dst, &["--strict-exit", "--staged"]);

    assert_eq!(output.status.code(), Some(4));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Broken symlink"), "{stdout}");
    assert!(dst.join("old.txt").exists());
}

#[test]
fn dry_run_leaves_destination_alone() {
    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    write_text(&src.join("a.txt"), "a");
    write_text(&dst.join("old.txt"), "old");

    let output = treekit(&src, &dst, &["--dry-run"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Dry run: 1 entries would be copied"), "{stdout}");
    assert!(dst.join("old.txt").exists());
    assert!(!dst.join("a.txt").exists());
}

#[cfg(unix)]
#[test]
fn dry_run_counts_exclude_skipped_links() {
    use std::os::unix::fs::symlink;

    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    write_text(&src.join("a.txt"), "a");
    write_text(&src.join("b.txt"), "b");
    symlink(src.join("a.txt"), src.join("link.txt")).expect("create symlink");

    let output = treekit(&src, &dst, &["--dry-run", "--symlinks", "skip"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Dry run: 2 entries would be copied"), "{stdout}");
    assert!(!dst.exists());
}

#[cfg(unix)]
#[test]
fn strict_exit_reports_undeletable_destination() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().expect("tempdir");
    let src = tmp.path().join("src");
    let parent = tmp.path().join("locked");
    let dst = parent.join("dst");
    write_text(&src.join("a.txt"), "a");
    write_text(&dst.join("old.txt"), "old");
    fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).expect("lock parent");

    // Privileged users ignore directory write bits.
    let b_is_enforced = fs::create_dir(parent.join("writable")).is_err();
    let output = b_is_enforced.then(|| treekit(&src, &dst, &["--strict-exit"]));
    fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).expect("unlock parent");
    let Some(output) = output else {
        return;
    };

    assert_eq!(output.status.code(), Some(3));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with("Error: Failed to remove existing destination"),
        "{stdout}"
    );
}

#[test]
fn missing_positional_is_a_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_treekit"))
        .arg("only_src")
        .output()
        .expect("run treekit");
    assert_eq!(output.status.code(), Some(2));
}
