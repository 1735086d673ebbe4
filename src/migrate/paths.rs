use crate::error::MigrateError;
use crate::migrate::config::{LayoutConfig, is_single_component};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The four inputs of a migration run, as given on the command line.
#[derive(Debug, Clone)]
pub struct MigrationRequest {
    pub source: PathBuf,
    pub global_namespace: String,
    pub entity_namespace: String,
    pub target: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MigrationPaths {
    pub source: PathBuf,
    pub global_snapshots: PathBuf,
    pub global_namespace: PathBuf,
    pub entity_namespace: PathBuf,
}

impl MigrationPaths {
    pub fn entity_snapshot_root(&self, layout: &LayoutConfig) -> PathBuf {
        self.entity_namespace.join(&layout.snapshot_dir)
    }
}

fn ensure_empty_or_absent(dir: &Path) -> Result<(), MigrateError> {
    match fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Err(MigrateError::InvalidArgument(format!(
                    "target namespace {} is not empty",
                    dir.display()
                )));
            }
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(MigrateError::io("read", dir, err)),
    }
}

/// Absolute form of `path`, resolving symlinks through its nearest existing
/// ancestor so targets that do not exist yet can still be compared.
fn resolve_absolute(path: &Path) -> Result<PathBuf, MigrateError> {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(found) => {
                return Ok(rest.iter().rev().fold(found, |acc, part| acc.join(part)));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(MigrateError::io("resolve", existing, err)),
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            _ => {
                let err = std::io::Error::from(ErrorKind::NotFound);
                return Err(MigrateError::io("resolve", path, err));
            }
        }
    }
}

fn check_namespace_name(label: &str, name: &str) -> Result<(), MigrateError> {
    if name.is_empty() {
        return Err(MigrateError::InvalidArgument(format!(
            "{label} must not be empty"
        )));
    }
    if !is_single_component(name) {
        return Err(MigrateError::InvalidArgument(format!(
            "{label} `{name}` must be a plain directory name"
        )));
    }
    Ok(())
}

/// Checks the run's preconditions and resolves every directory it touches.
pub fn resolve_paths(
    req: &MigrationRequest,
    layout: &LayoutConfig,
) -> Result<MigrationPaths, MigrateError> {
    if !req.source.is_dir() {
        return Err(MigrateError::InvalidArgument(format!(
            "unknown iron directory: {}",
            req.source.display()
        )));
    }
    check_namespace_name("global namespace name", &req.global_namespace)?;
    check_namespace_name("entity namespace name", &req.entity_namespace)?;
    if req.global_namespace == req.entity_namespace {
        return Err(MigrateError::InvalidArgument(
            "global and entity namespace names must differ".to_string(),
        ));
    }

    let source = resolve_absolute(&req.source)?;
    let target = resolve_absolute(&req.target)?;
    if target.starts_with(&source) {
        return Err(MigrateError::InvalidArgument(format!(
            "target {} must not be inside source {}",
            req.target.display(),
            req.source.display()
        )));
    }

    let global_namespace = req.target.join(&req.global_namespace);
    let entity_namespace = req.target.join(&req.entity_namespace);
    ensure_empty_or_absent(&global_namespace)?;
    ensure_empty_or_absent(&entity_namespace)?;

    Ok(MigrationPaths {
        source: req.source.clone(),
        global_snapshots: req
            .source
            .join(&layout.global_dir)
            .join(&layout.snapshot_dir),
        global_namespace,
        entity_namespace,
    })
}
