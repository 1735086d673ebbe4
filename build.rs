use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// Must match the prefix `config::unknown_env_keys` filters on.
const ENV_PREFIX: &str = "IRON_MIGRATE_";

fn rust_sources(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            rust_sources(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
    Ok(())
}

/// A variable name is a whole string literal: the prefix followed by at least
/// one of `A-Z`, `0-9` or `_`.
fn as_env_key(literal: &str) -> Option<&str> {
    let rest = literal.strip_prefix(ENV_PREFIX)?;
    let valid = !rest.is_empty()
        && rest
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
    valid.then_some(literal)
}

fn env_keys_in(source: &str, keys: &mut BTreeSet<String>) {
    // Odd-indexed pieces are the insides of double-quoted literals on a line.
    for line in source.lines() {
        for literal in line.split('"').skip(1).step_by(2) {
            if let Some(key) = as_env_key(literal) {
                keys.insert(key.to_string());
            }
        }
    }
}

fn write_allowlist(path: &Path, keys: &BTreeSet<String>) -> std::io::Result<()> {
    let mut f = fs::File::create(path)?;
    writeln!(f, "pub const GENERATED_MIGRATE_ENV_ALLOWLIST: &[&str] = &[")?;
    for key in keys {
        writeln!(f, "    \"{key}\",")?;
    }
    writeln!(f, "];")
}

fn main() {
    let mut files = Vec::new();
    rust_sources(Path::new("src"), &mut files).expect("failed to list src");

    let mut keys = BTreeSet::new();
    for file in &files {
        if let Ok(content) = fs::read_to_string(file) {
            env_keys_in(&content, &mut keys);
        }
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    write_allowlist(&Path::new(&out_dir).join("migrate_env_allowlist.rs"), &keys)
        .expect("failed to write env allowlist");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
