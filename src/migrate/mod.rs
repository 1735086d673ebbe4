pub mod classify;
pub mod config;
pub mod fill;
pub mod paths;
pub mod relocate;
pub mod scan;

use crate::error::MigrateError;
use config::MigrateConfig;
use fill::FillSummary;
use paths::{MigrationPaths, MigrationRequest};
use scan::WalkSummary;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct MigrationOutcome {
    pub global_relocated: usize,
    pub global_skipped: usize,
    pub entity_relocated: usize,
    pub pruned_subtrees: usize,
    pub generations: usize,
    pub filled: usize,
    pub bytes_copied: u64,
}

fn relocate_global(
    paths: &MigrationPaths,
    cfg: &MigrateConfig,
    out: &mut MigrationOutcome,
) -> Result<(), MigrateError> {
    let layout = &cfg.layout;
    let file_name = layout.snapshot_file_name(&layout.global_entity);
    walk_and_count(&paths.global_snapshots, |_| false, |file| {
        let is_snapshot = file
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| name.ends_with(&layout.snapshot_suffix));
        if !is_snapshot {
            warn!(path = %file.display(), "skipping non-snapshot file in global subtree");
            out.global_skipped += 1;
            return Ok(());
        }
        let classified = classify::classify_global_file(file, &layout.global_entity)?;
        let moved = relocate::relocate(
            file,
            &paths.global_namespace,
            &layout.snapshot_dir,
            &classified.tx,
            &file_name,
        )?;
        debug!(
            source = %file.display(),
            destination = %moved.destination.display(),
            "relocated global snapshot"
        );
        out.global_relocated += 1;
        out.bytes_copied += moved.bytes;
        Ok(())
    })?;
    Ok(())
}

fn relocate_entities(
    paths: &MigrationPaths,
    cfg: &MigrateConfig,
    out: &mut MigrationOutcome,
) -> Result<(), MigrateError> {
    let layout = &cfg.layout;
    let excluded = layout.excluded_dirs();
    let summary = walk_and_count(&paths.source, scan::named_any(&excluded), |file| {
        let relative = file.strip_prefix(&paths.source).unwrap_or(file);
        let classified = classify::classify_entity_file(relative)?;
        let moved = relocate::relocate(
            file,
            &paths.entity_namespace,
            &layout.snapshot_dir,
            &classified.tx,
            &layout.snapshot_file_name(&classified.entity),
        )?;
        debug!(
            entity = %classified.entity,
            source = %file.display(),
            destination = %moved.destination.display(),
            "relocated snapshot"
        );
        out.entity_relocated += 1;
        out.bytes_copied += moved.bytes;
        Ok(())
    })?;
    out.pruned_subtrees = summary.pruned;
    Ok(())
}

fn walk_and_count<P, F>(root: &Path, prune: P, visit: F) -> Result<WalkSummary, MigrateError>
where
    P: Fn(&walkdir::DirEntry) -> bool,
    F: FnMut(&Path) -> Result<(), MigrateError>,
{
    let summary = scan::walk(root, prune, visit)?;
    info!(
        root = %root.display(),
        files = summary.files,
        pruned = summary.pruned,
        "relocation pass complete"
    );
    Ok(summary)
}

/// Runs the whole migration: global relocation, per-entity relocation, then
/// gap filling over the per-entity namespace. The first error aborts the run.
pub fn run(req: &MigrationRequest, cfg: &MigrateConfig) -> Result<MigrationOutcome, MigrateError> {
    let paths = paths::resolve_paths(req, &cfg.layout)?;
    let mut out = MigrationOutcome::default();

    relocate_global(&paths, cfg, &mut out)?;
    relocate_entities(&paths, cfg, &mut out)?;

    let FillSummary {
        generations,
        filled,
    } = fill::fill_gaps(&paths.entity_snapshot_root(&cfg.layout))?;
    out.generations = generations;
    out.filled = filled;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateErrorKind;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn tx(n: u64) -> String {
        format!("{n:020}")
    }

    fn put(path: PathBuf, body: &str) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, body).expect("write");
    }

    fn request(source: &Path, target: &Path) -> MigrationRequest {
        MigrationRequest {
            source: source.to_path_buf(),
            global_namespace: "globalStore".to_string(),
            entity_namespace: "stores".to_string(),
            target: target.to_path_buf(),
        }
    }

    #[test]
    fn migrates_legacy_tree() {
        let tmp = tempdir().expect("tempdir");
        let src = tmp.path().join("iron");
        let target = tmp.path().join("out");

        put(src.join("global/snapshot").join(format!("{}.snapshot", tx(1))), "g1");
        put(src.join("global/snapshot").join(format!("{}.snapshot", tx(2))), "g2");
        put(src.join("global/snapshot/README"), "ignored");
        put(src.join("global/tx").join(format!("{}.tx", tx(1))), "log");
        put(src.join("storeA/snapshot").join(format!("{}.snapshot", tx(1))), "a1");
        put(src.join("storeB/snapshot").join(format!("{}.snapshot", tx(1))), "b1");
        put(src.join("storeB/snapshot").join(format!("{}.snapshot", tx(2))), "b2");
        put(src.join("storeB/tx").join(format!("{}.tx", tx(2))), "log");
        put(src.join(".tmp/work/x").join(format!("{}.snapshot", tx(3))), "tmp");

        let out = run(&request(&src, &target), &MigrateConfig::default()).expect("run");
        assert_eq!(out.global_relocated, 2);
        assert_eq!(out.global_skipped, 1);
        assert_eq!(out.entity_relocated, 3);
        assert_eq!(out.pruned_subtrees, 3);
        assert_eq!(out.generations, 2);
        assert_eq!(out.filled, 1);

        let read = |rel: String| fs::read_to_string(target.join(rel)).expect("read");
        assert_eq!(read(format!("globalStore/snapshot/{}/global.snapshot", tx(2))), "g2");
        assert_eq!(read(format!("stores/snapshot/{}/storeA.snapshot", tx(1))), "a1");
        assert_eq!(read(format!("stores/snapshot/{}/storeA.snapshot", tx(2))), "a1");
        assert_eq!(read(format!("stores/snapshot/{}/storeB.snapshot", tx(2))), "b2");
        assert!(!target.join("stores/snapshot").join(tx(3)).exists());
    }

    #[test]
    fn only_pruned_files_yield_no_entity_snapshots() {
        let tmp = tempdir().expect("tempdir");
        let src = tmp.path().join("iron");
        let target = tmp.path().join("out");
        fs::create_dir_all(src.join("global/snapshot")).expect("mkdir");
        put(src.join("store/tx").join(format!("{}.tx", tx(5))), "log");
        put(src.join(".tmp/store/snapshot").join(format!("{}.snapshot", tx(5))), "tmp");

        let out = run(&request(&src, &target), &MigrateConfig::default()).expect("run");
        assert_eq!(out.entity_relocated, 0);
        assert_eq!(out.generations, 0);
        assert!(!target.join("stores").exists());
    }

    #[test]
    fn missing_global_subtree_aborts() {
        let tmp = tempdir().expect("tempdir");
        let src = tmp.path().join("iron");
        put(src.join("store/snapshot").join(format!("{}.snapshot", tx(1))), "a");

        let err = run(&request(&src, &tmp.path().join("out")), &MigrateConfig::default())
            .expect_err("no global");
        assert_eq!(err.kind(), MigrateErrorKind::Traversal);
    }

    #[test]
    fn duplicate_source_snapshot_is_fatal() {
        let tmp = tempdir().expect("tempdir");
        let src = tmp.path().join("iron");
        fs::create_dir_all(src.join("global/snapshot")).expect("mkdir");
        put(src.join("store/snapshot").join(format!("{}-a.snapshot", tx(1))), "a");
        put(src.join("store/snapshot").join(format!("{}-b.snapshot", tx(1))), "b");

        let err = run(&request(&src, &tmp.path().join("out")), &MigrateConfig::default())
            .expect_err("duplicate");
        assert_eq!(err.kind(), MigrateErrorKind::DestinationExists);
    }
}
