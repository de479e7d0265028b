use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::MnemaConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["mnema.toml", "mnema.yaml", "mnema.yml", "mnema.json"];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

fn lock_override() -> std::sync::MutexGuard<'static, Option<PathBuf>> {
    CONFIG_DIR_OVERRIDE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Restrict config discovery to a single directory. Project-local and
/// user-global paths are skipped while an override is set. Each call
/// replaces the previous override.
pub fn set_config_dir(path: PathBuf) {
    *lock_override() = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *lock_override() = None;
}

fn config_dir_override() -> Option<PathBuf> {
    lock_override().clone()
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<MnemaConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./mnema.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/mnema/mnema.{toml,yaml,yml,json}` (user-global)
///
/// Writes a default config file and returns defaults when nothing is found;
/// an unreadable file also falls back to defaults with a warning.
pub fn discover_and_load() -> MnemaConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, writing default config");
        let config = MnemaConfig::default();
        if let Err(e) = write_default_config(&config) {
            warn!(error = %e, "failed to write default config file");
        }
        return config;
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            MnemaConfig::default()
        }
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
        // Override is set, never fall through to other locations.
        return None;
    }

    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/mnema/
    if let Some(dir) = home_dir().map(|h| h.join(".config").join("mnema")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the config directory: override, or `~/.config/mnema/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return Some(dir);
    }
    home_dir().map(|h| h.join(".config").join("mnema"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("mnema.toml")
}

/// Lock guarding config read-modify-write cycles.
static CONFIG_SAVE_LOCK: Mutex<()> = Mutex::new(());

/// Load the current config, apply `f`, and save. Holds a process-wide lock
/// so concurrent callers cannot race. Returns the path written to.
pub fn update_config(f: impl FnOnce(&mut MnemaConfig)) -> anyhow::Result<PathBuf> {
    let _guard = CONFIG_SAVE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut config = discover_and_load();
    f(&mut config);
    save_config_inner(&config)
}

/// Write `config` to the discovered config path (default TOML path when
/// none exists yet), creating parent directories as needed.
///
/// Prefer [`update_config`] for read-modify-write cycles.
pub fn save_config(config: &MnemaConfig) -> anyhow::Result<PathBuf> {
    let _guard = CONFIG_SAVE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    save_config_inner(config)
}

fn save_config_inner(config: &MnemaConfig) -> anyhow::Result<PathBuf> {
    let path = find_or_default_config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, render_config(config, &path)?)?;
    debug!(path = %path.display(), "saved config");
    Ok(path)
}

fn write_default_config(config: &MnemaConfig) -> anyhow::Result<()> {
    let path = find_or_default_config_path();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, render_config(config, &path)?)?;
    debug!(path = %path.display(), "wrote default config file");
    Ok(())
}

/// Serialize in the format the target path's extension names.
fn render_config(config: &MnemaConfig, path: &Path) -> anyhow::Result<String> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    match ext {
        "toml" => toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}")),
        "yaml" | "yml" => {
            serde_yaml::to_string(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))
        }
        "json" => serde_json::to_string_pretty(config)
            .map_err(|e| anyhow::anyhow!("serialize config: {e}")),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<MnemaConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
