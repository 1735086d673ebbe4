use crate::error::MigrateError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Prefix of every variable the tool reads; build.rs collects the full names.
const ENV_PREFIX: &str = "IRON_MIGRATE_";

include!(concat!(env!("OUT_DIR"), "/migrate_env_allowlist.rs"));

/// Directory and file names of the source layout, plus the suffix used for
/// every snapshot file written into the target namespaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    pub global_dir: String,
    pub snapshot_dir: String,
    pub tx_dir: String,
    pub tmp_dir: String,
    pub snapshot_suffix: String,
    pub global_entity: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            global_dir: "global".to_string(),
            snapshot_dir: "snapshot".to_string(),
            tx_dir: "tx".to_string(),
            tmp_dir: ".tmp".to_string(),
            snapshot_suffix: ".snapshot".to_string(),
            global_entity: "global".to_string(),
        }
    }
}

impl LayoutConfig {
    /// Subtrees skipped by the per-entity relocation pass.
    pub fn excluded_dirs(&self) -> [&str; 3] {
        [
            self.global_dir.as_str(),
            self.tmp_dir.as_str(),
            self.tx_dir.as_str(),
        ]
    }

    pub fn snapshot_file_name(&self, entity: &str) -> String {
        format!("{entity}{}", self.snapshot_suffix)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigrateConfig {
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialMigrateConfig {
    layout: Option<LayoutConfig>,
}

pub fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn validate(cfg: &MigrateConfig) -> Result<(), MigrateError> {
    let layout = &cfg.layout;
    let names = [
        ("global_dir", &layout.global_dir),
        ("snapshot_dir", &layout.snapshot_dir),
        ("tx_dir", &layout.tx_dir),
        ("tmp_dir", &layout.tmp_dir),
        ("global_entity", &layout.global_entity),
    ];
    for (key, value) in names {
        if !is_single_component(value) {
            return Err(MigrateError::InvalidArgument(format!(
                "invalid layout.{key} `{value}`: must be a single non-empty path component"
            )));
        }
    }
    if !layout.snapshot_suffix.starts_with('.') || layout.snapshot_suffix.len() < 2 {
        return Err(MigrateError::InvalidArgument(format!(
            "invalid layout.snapshot_suffix `{}`: must start with `.`",
            layout.snapshot_suffix
        )));
    }
    Ok(())
}

fn resolve_config_path(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(custom) = lookup("IRON_MIGRATE_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".iron").join("migrate.toml"))
}

fn merge_file_config(base: &mut MigrateConfig, path: &Path) -> Result<(), MigrateError> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path).map_err(|err| MigrateError::io("read", path, err))?;
    let parsed: PartialMigrateConfig = toml::from_str(&raw).map_err(|err| {
        MigrateError::InvalidArgument(format!(
            "failed to parse migrate config {}: {err}",
            path.display()
        ))
    })?;
    if let Some(layout) = parsed.layout {
        base.layout = layout;
    }
    Ok(())
}

fn override_string(lookup: &impl Fn(&str) -> Option<String>, var: &str, slot: &mut String) {
    if let Some(v) = lookup(var) {
        let trimmed = v.trim();
        if !trimmed.is_empty() {
            *slot = trimmed.to_string();
        }
    }
}

fn apply_env_overrides(cfg: &mut MigrateConfig, lookup: &impl Fn(&str) -> Option<String>) {
    let layout = &mut cfg.layout;
    override_string(lookup, "IRON_MIGRATE_GLOBAL_DIR", &mut layout.global_dir);
    override_string(lookup, "IRON_MIGRATE_SNAPSHOT_DIR", &mut layout.snapshot_dir);
    override_string(lookup, "IRON_MIGRATE_TX_DIR", &mut layout.tx_dir);
    override_string(lookup, "IRON_MIGRATE_TMP_DIR", &mut layout.tmp_dir);
    override_string(
        lookup,
        "IRON_MIGRATE_SNAPSHOT_SUFFIX",
        &mut layout.snapshot_suffix,
    );
}

fn unknown_env_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    keys.filter(|k| k.starts_with(ENV_PREFIX))
        .filter(|k| !GENERATED_MIGRATE_ENV_ALLOWLIST.contains(k))
        .collect()
}

fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<MigrateConfig, MigrateError> {
    let mut cfg = MigrateConfig::default();
    if let Some(path) = resolve_config_path(&lookup) {
        merge_file_config(&mut cfg, &path)?;
    }
    apply_env_overrides(&mut cfg, &lookup);
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_config() -> Result<MigrateConfig, MigrateError> {
    let present: Vec<String> = env::vars().map(|(k, _)| k).collect();
    for key in unknown_env_keys(present.iter().map(String::as_str)) {
        tracing::warn!(var = key, "ignoring unrecognised environment variable");
    }
    load_with(|var| env::var(var).ok())
}
