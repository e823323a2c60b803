use std::path::Path;

use clap::Parser;
use log::{info, warn};
use treekit_io_fs::{ReplaceTreeError, replace_tree};

use crate::cli::Cli;

mod cli;
mod logging;

fn format_success(src: &Path, dst: &Path) -> String {
    format!(
        "Directory copied from '{}' to '{}' successfully.",
        src.display(),
        dst.display()
    )
}

fn format_failure(err: &ReplaceTreeError) -> String {
    let mut txt = if err.is_copy_library_error() {
        format!("Error: Failed to copy directory: {err}")
    } else {
        format!("Error: {err}")
    };
    if let ReplaceTreeError::CopyIncomplete { report, .. } = err {
        for spec_error in &report.errors {
            txt.push_str(&format!(
                "\n  {}: {}",
                spec_error.path.display(),
                spec_error.exception
            ));
        }
    }
    txt
}

/// Run one replace and return the process exit status.
fn run(cli: &Cli) -> i32 {
    match replace_tree(&cli.src, &cli.dst, cli.to_options()) {
        Ok(report) => {
            if cli.dry_run {
                println!(
                    "Dry run: {} entries would be copied from '{}' to '{}'.",
                    report.cnt_planned,
                    cli.src.display(),
                    cli.dst.display()
                );
            } else {
                info!("{} entries copied", report.cnt_copied);
                println!("{}", format_success(&cli.src, &cli.dst));
            }
            0
        }
        Err(err) => {
            println!("{}", format_failure(&err));
            if cli.strict_exit {
                err.exit_code()
            } else {
                warn!("copy failed; exiting with status 0 (use --strict-exit to fail)");
                0
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let code = run(&cli);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
