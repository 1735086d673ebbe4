use crate::error::MigrateError;
use crate::migrate::classify::{TX_ID_LEN, TransactionId};
use crate::migrate::relocate::copy_no_clobber;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One generation directory and the snapshot files it holds, keyed by file
/// name.
#[derive(Debug, Clone)]
pub struct Generation {
    pub tx: TransactionId,
    pub dir: PathBuf,
    pub files: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillSummary {
    pub generations: usize,
    pub filled: usize,
}

/// File name → latest known snapshot of that entity.
type Carry = BTreeMap<String, PathBuf>;

fn read_generation(tx: TransactionId, dir: PathBuf) -> Result<Generation, MigrateError> {
    let mut files = BTreeMap::new();
    let entries = fs::read_dir(&dir).map_err(|err| MigrateError::io("read", &dir, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| MigrateError::io("read", &dir, err))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|err| MigrateError::io("stat", &path, err))?;
        if !file_type.is_file() {
            return Err(MigrateError::malformed(
                path,
                "generation entries must be regular files",
            ));
        }
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| MigrateError::malformed(&path, "file name is not UTF-8"))?;
        files.insert(name, path);
    }
    Ok(Generation { tx, dir, files })
}

/// Lists the generations under `snapshot_root`, ascending by transaction id.
/// A missing root means nothing was relocated and yields no generations.
pub fn list_generations(snapshot_root: &Path) -> Result<Vec<Generation>, MigrateError> {
    let entries = match fs::read_dir(snapshot_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(MigrateError::io("read", snapshot_root, err)),
    };

    let mut generations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| MigrateError::io("read", snapshot_root, err))?;
        let path = entry.path();
        let is_dir = entry
            .file_type()
            .map_err(|err| MigrateError::io("stat", &path, err))?
            .is_dir();
        if !is_dir {
            return Err(MigrateError::malformed(path, "expected a generation directory"));
        }
        let tx = entry
            .file_name()
            .to_str()
            .and_then(TransactionId::parse)
            .ok_or_else(|| {
                MigrateError::malformed(
                    &path,
                    format!("generation name is not a {TX_ID_LEN}-character transaction id"),
                )
            })?;
        generations.push(read_generation(tx, path)?);
    }
    generations.sort_by(|a, b| a.tx.cmp(&b.tx));
    Ok(generations)
}

/// Copies every carried snapshot missing from `generation` into it and
/// returns the generation's complete file set as the next carry.
fn fill_generation(
    carry: Carry,
    generation: Generation,
    filled: &mut usize,
) -> Result<Carry, MigrateError> {
    let Generation { tx, dir, mut files } = generation;
    for (name, previous) in carry {
        if files.contains_key(&name) {
            continue;
        }
        let destination = dir.join(&name);
        copy_no_clobber(&previous, &destination)?;
        debug!(%tx, file = %name, from = %previous.display(), "carried snapshot forward");
        *filled += 1;
        files.insert(name, destination);
    }
    Ok(files)
}

/// Forward-fills every generation under `snapshot_root` so each holds a
/// snapshot for every entity seen in an earlier generation. The earliest
/// generation is left as it is.
pub fn fill_gaps(snapshot_root: &Path) -> Result<FillSummary, MigrateError> {
    let generations = list_generations(snapshot_root)?;
    let mut summary = FillSummary {
        generations: generations.len(),
        filled: 0,
    };

    generations
        .into_iter()
        .try_fold(Carry::new(), |carry, generation| {
            fill_generation(carry, generation, &mut summary.filled)
        })?;

    info!(
        root = %snapshot_root.display(),
        generations = summary.generations,
        filled = summary.filled,
        "gap fill complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateErrorKind;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn gen_name(n: u64) -> String {
        format!("{n:020}")
    }

    fn seed(root: &Path, n: u64, entities: &[&str]) {
        let dir = root.join(gen_name(n));
        fs::create_dir_all(&dir).expect("mkdir gen");
        for entity in entities {
            fs::write(dir.join(format!("{entity}.snapshot")), format!("{entity}@{n}"))
                .expect("write snapshot");
        }
    }

    fn names(root: &Path, n: u64) -> BTreeSet<String> {
        fs::read_dir(root.join(gen_name(n)))
            .expect("read gen")
            .map(|e| e.expect("entry").file_name().into_string().expect("utf8"))
            .collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| format!("{s}.snapshot")).collect()
    }

    #[test]
    fn carries_missing_entities_forward() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path();
        seed(root, 1, &["A", "B"]);
        seed(root, 2, &["B", "C"]);
        seed(root, 3, &[]);

        let summary = fill_gaps(root).expect("fill");
        assert_eq!(summary, FillSummary { generations: 3, filled: 4 });

        assert_eq!(names(root, 1), set(&["A", "B"]));
        assert_eq!(names(root, 2), set(&["A", "B", "C"]));
        assert_eq!(names(root, 3), set(&["A", "B", "C"]));

        let read = |n: u64, e: &str| {
            fs::read_to_string(root.join(gen_name(n)).join(format!("{e}.snapshot")))
                .expect("read")
        };
        assert_eq!(read(2, "A"), "A@1");
        assert_eq!(read(2, "B"), "B@2");
        assert_eq!(read(3, "A"), "A@1");
        assert_eq!(read(3, "B"), "B@2");
        assert_eq!(read(3, "C"), "C@2");
    }

    #[test]
    fn generations_are_processed_in_tx_order() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path();
        // Created out of order on purpose.
        seed(root, 30, &[]);
        seed(root, 4, &["A"]);
        seed(root, 200, &["A"]);

        fill_gaps(root).expect("fill");
        let a30 = fs::read_to_string(root.join(gen_name(30)).join("A.snapshot")).expect("read");
        assert_eq!(a30, "A@4");
        let a200 = fs::read_to_string(root.join(gen_name(200)).join("A.snapshot")).expect("read");
        assert_eq!(a200, "A@200");
    }

    #[test]
    fn second_fill_copies_nothing() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path();
        seed(root, 1, &["A", "B"]);
        seed(root, 2, &["C"]);

        assert_eq!(fill_gaps(root).expect("first").filled, 2);
        assert_eq!(fill_gaps(root).expect("second").filled, 0);
    }

    #[test]
    fn first_generation_is_not_fabricated() {
        let tmp = tempdir().expect("tempdir");
        let root = tmp.path();
        seed(root, 1, &["A"]);
        seed(root, 2, &["B"]);

        fill_gaps(root).expect("fill");
        assert_eq!(names(root, 1), set(&["A"]));
        assert_eq!(names(root, 2), set(&["A", "B"]));
    }

    #[test]
    fn missing_root_has_no_generations() {
        let tmp = tempdir().expect("tempdir");
        let summary = fill_gaps(&tmp.path().join("snapshot")).expect("fill");
        assert_eq!(summary, FillSummary::default());
    }

    #[test]
    fn bad_generation_name_is_malformed() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("123")).expect("mkdir");
        let err = fill_gaps(tmp.path()).expect_err("bad name");
        assert_eq!(err.kind(), MigrateErrorKind::MalformedLayout);
    }

    #[test]
    fn nested_directory_in_generation_is_malformed() {
        let tmp = tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join(gen_name(1)).join("nested")).expect("mkdir");
        let err = fill_gaps(tmp.path()).expect_err("nested dir");
        assert_eq!(err.kind(), MigrateErrorKind::MalformedLayout);
    }
}
