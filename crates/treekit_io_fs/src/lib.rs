//! `treekit_io_fs` v1:
//! Rust-side directory replacement engine.
//!
//! Modules:
//! - `replace` : validation, destination removal/staging, orchestration
//! - `copy`    : recursive traversal and per-entry copy
//! - `spec`    : enums/options/errors
//! - `report`  : run-time report model
//! - `util`    : shared helper functions

mod copy;
pub mod replace;
pub mod report;
pub mod spec;
mod util;

pub use replace::replace_tree;
pub use report::{ReportCopy, ReportCopyBuilder};
pub use spec::{
    EnumCopySymlinkStrategy, EnumReplaceStrategy, ReplaceTreeError, SpecCopyError,
    SpecReplaceOptions,
};
