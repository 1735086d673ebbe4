use crate::error::MigrateError;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub files: usize,
    pub pruned: usize,
}

fn traversal_error(root: &Path, err: walkdir::Error) -> MigrateError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    MigrateError::Traversal { path, source }
}

/// Depth-first walk of `root`. Directories matching `prune` are skipped with
/// everything below them; the root itself is never pruned. Each regular file
/// is handed to `visit`, and the first error from either the walk or `visit`
/// ends the traversal.
pub fn walk<P, F>(root: &Path, prune: P, mut visit: F) -> Result<WalkSummary, MigrateError>
where
    P: Fn(&DirEntry) -> bool,
    F: FnMut(&Path) -> Result<(), MigrateError>,
{
    let mut summary = WalkSummary::default();
    let mut pruned = 0usize;
    let entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let skip = e.depth() > 0 && e.file_type().is_dir() && prune(e);
            if skip {
                debug!(dir = %e.path().display(), "pruned subtree");
                pruned += 1;
            }
            !skip
        });

    for entry in entries {
        let entry = entry.map_err(|err| traversal_error(root, err))?;
        let file_type = entry.file_type();
        if file_type.is_file() {
            visit(entry.path())?;
            summary.files += 1;
        } else if file_type.is_symlink() {
            warn!(path = %entry.path().display(), "skipping symlink");
        }
    }

    summary.pruned = pruned;
    Ok(summary)
}

/// Pruning predicate matching directories whose name is one of `names`.
pub fn named_any<'a>(names: &'a [&'a str]) -> impl Fn(&DirEntry) -> bool + 'a {
    move |entry| {
        entry
            .file_name()
            .to_str()
            .is_some_and(|name| names.contains(&name))
    }
}
