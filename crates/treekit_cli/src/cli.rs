//! Command-line surface.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use treekit_io_fs::{EnumCopySymlinkStrategy, EnumReplaceStrategy, SpecReplaceOptions};

#[derive(Debug, Parser)]
#[command(
    name = "treekit",
    version,
    about = "Copy a directory from source to destination, with overwriting"
)]
pub struct Cli {
    /// Source directory path
    pub src: PathBuf,
    /// Destination directory path
    pub dst: PathBuf,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// How symbolic links inside the source are copied
    #[arg(long, value_enum, default_value_t = ArgSymlinkMode::Dereference)]
    pub symlinks: ArgSymlinkMode,
    /// Copy into a hidden sibling first and swap it in only on success
    #[arg(long)]
    pub staged: bool,
    /// Do not copy permissions, timestamps or extended attributes
    #[arg(long)]
    pub no_metadata: bool,
    /// Walk the source and report, without touching the destination
    #[arg(long)]
    pub dry_run: bool,
    /// Exit with a non-zero status when the copy fails
    #[arg(long)]
    pub strict_exit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArgSymlinkMode {
    /// Copy what the link points to
    Dereference,
    /// Recreate the link itself
    Copy,
    /// Leave links out
    Skip,
}

impl From<ArgSymlinkMode> for EnumCopySymlinkStrategy {
    fn from(mode: ArgSymlinkMode) -> Self {
        match mode {
            ArgSymlinkMode::Dereference => Self::Dereference,
            ArgSymlinkMode::Copy => Self::CopySymlinks,
            ArgSymlinkMode::Skip => Self::SkipSymlinks,
        }
    }
}

impl Cli {
    pub fn to_options(&self) -> SpecReplaceOptions {
        SpecReplaceOptions {
            rule_symlink: self.symlinks.into(),
            rule_replace: if self.staged {
                EnumReplaceStrategy::StageThenRename
            } else {
                EnumReplaceStrategy::RemoveThenCopy
            },
            if_preserve_metadata: !self.no_metadata,
            if_dry_run: self.dry_run,
        }
    }
}
