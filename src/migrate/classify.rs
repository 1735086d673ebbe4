use crate::error::MigrateError;
use std::fmt;
use std::path::Path;

/// Width of every transaction identifier. Identifiers are zero-padded at
/// creation time, so lexical order is chronological order.
pub const TX_ID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Accepts exactly `TX_ID_LEN` characters, as found in generation
    /// directory names.
    pub fn parse(raw: &str) -> Option<Self> {
        (raw.chars().count() == TX_ID_LEN).then(|| Self(raw.to_string()))
    }

    /// Takes the leading `TX_ID_LEN` characters of a snapshot file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let end = name.char_indices().nth(TX_ID_LEN).map_or(name.len(), |(i, _)| i);
        Self::parse(&name[..end])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub entity: String,
    pub tx: TransactionId,
}

fn tx_from_path(path: &Path) -> Result<TransactionId, MigrateError> {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MigrateError::malformed(path, "file name is missing or not UTF-8"))?;
    TransactionId::from_file_name(name).ok_or_else(|| {
        MigrateError::malformed(
            path,
            format!("file name shorter than {TX_ID_LEN} characters"),
        )
    })
}

/// Classifies a file of the per-entity pass. `relative` is the path below the
/// source root, shaped `<entity>/.../<subdir>/<file>`; the entity is the
/// directory two levels above the file.
pub fn classify_entity_file(relative: &Path) -> Result<Classified, MigrateError> {
    let parts: Vec<_> = relative.iter().collect();
    if parts.len() < 3 {
        return Err(MigrateError::malformed(
            relative,
            "path too shallow to name an entity",
        ));
    }
    let entity = parts[parts.len() - 3]
        .to_str()
        .ok_or_else(|| MigrateError::malformed(relative, "entity name is not UTF-8"))?;
    Ok(Classified {
        entity: entity.to_string(),
        tx: tx_from_path(relative)?,
    })
}

pub fn classify_global_file(path: &Path, global_entity: &str) -> Result<Classified, MigrateError> {
    Ok(Classified {
        entity: global_entity.to_string(),
        tx: tx_from_path(path)?,
    })
}
