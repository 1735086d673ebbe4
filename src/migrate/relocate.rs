use crate::error::MigrateError;
use crate::migrate::classify::TransactionId;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Relocation {
    pub destination: PathBuf,
    pub bytes: u64,
}

/// Copies `from` to `to`, failing with `DestinationExists` instead of
/// replacing an existing file.
pub fn copy_no_clobber(from: &Path, to: &Path) -> Result<u64, MigrateError> {
    let mut reader = fs::File::open(from).map_err(|err| MigrateError::io("open", from, err))?;
    let mut writer = match fs::OpenOptions::new().write(true).create_new(true).open(to) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            return Err(MigrateError::DestinationExists(to.to_path_buf()));
        }
        Err(err) => return Err(MigrateError::io("create", to, err)),
    };
    let bytes = io::copy(&mut reader, &mut writer).map_err(|err| {
        MigrateError::io("copy", from, err)
    })?;
    writer
        .sync_all()
        .map_err(|err| MigrateError::io("sync", to, err))?;
    Ok(bytes)
}

pub fn generation_dir(namespace_root: &Path, snapshot_dir: &str, tx: &TransactionId) -> PathBuf {
    namespace_root.join(snapshot_dir).join(tx.as_str())
}

/// Copies one snapshot into `<namespace_root>/<snapshot_dir>/<tx>/<file_name>`.
pub fn relocate(
    source_file: &Path,
    namespace_root: &Path,
    snapshot_dir: &str,
    tx: &TransactionId,
    file_name: &str,
) -> Result<Relocation, MigrateError> {
    let dir = generation_dir(namespace_root, snapshot_dir, tx);
    fs::create_dir_all(&dir).map_err(|err| MigrateError::io("create", &dir, err))?;

    let destination = dir.join(file_name);
    let bytes = copy_no_clobber(source_file, &destination)?;
    Ok(Relocation { destination, bytes })
}
