//! Bridge configuration – reads/writes a TOML file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Settings shared by every request a [`Provider`][crate::Provider] issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Selector used when a query carries none. Empty means "no selector".
    #[serde(default)]
    pub default_selector: String,

    /// Return subscriptions already monitoring.
    #[serde(default)]
    pub auto_start_subscriptions: bool,

    /// Fail decoding on the first undecodable field instead of skipping it.
    #[serde(default)]
    pub strict_decode: bool,
}

/// Load the config from `path`. Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<BridgeConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut cfg: BridgeConfig = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `PARAMLINK_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `PARAMLINK_DEFAULT_SELECTOR` | `default_selector` |
/// | `PARAMLINK_AUTO_START` | `auto_start_subscriptions` |
/// | `PARAMLINK_STRICT_DECODE` | `strict_decode` |
///
/// Boolean variables accept `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off`;
/// anything else is ignored.
pub fn apply_env_overrides(cfg: &mut BridgeConfig) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides(cfg: &mut BridgeConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("PARAMLINK_DEFAULT_SELECTOR") {
        cfg.default_selector = v;
    }
    if let Some(v) = var("PARAMLINK_AUTO_START")
        && let Some(flag) = parse_flag(&v)
    {
        cfg.auto_start_subscriptions = flag;
    }
    if let Some(v) = var("PARAMLINK_STRICT_DECODE")
        && let Some(flag) = parse_flag(&v)
    {
        cfg.strict_decode = flag;
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Save the config to `path`, creating parent directories if necessary.
pub fn save_to(cfg: &BridgeConfig, path: &Path) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let raw = toml::to_string_pretty(cfg)?;
    fs::write(path, raw).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let loaded = load_from(&dir.path().join("absent.toml")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("bridge.toml");
        fs::write(&path, "strict_decode = true\n").expect("write");

        let cfg = load_from(&path).expect("load").expect("present");
        assert!(cfg.strict_decode);
        assert!(!cfg.auto_start_subscriptions);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("nested").join("bridge.toml");
        let cfg = BridgeConfig {
            default_selector: "SPS.USER.ALL".into(),
            auto_start_subscriptions: true,
            strict_decode: false,
        };
        save_to(&cfg, &path).expect("save");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("default_selector = \"SPS.USER.ALL\""));
        let mut loaded: BridgeConfig = toml::from_str(&raw).expect("parse");
        apply_overrides(&mut loaded, |_| None);
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("bridge.toml");
        fs::write(&path, "strict_decode = \"maybe\"\n").expect("write");
        assert!(matches!(load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("PARAMLINK_DEFAULT_SELECTOR", "LHC.USER.ALL"),
            ("PARAMLINK_AUTO_START", "yes"),
            ("PARAMLINK_STRICT_DECODE", "nonsense"),
        ]
        .into_iter()
        .collect();
        let mut cfg = BridgeConfig::default();
        apply_overrides(&mut cfg, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.default_selector, "LHC.USER.ALL");
        assert!(cfg.auto_start_subscriptions);
        assert!(!cfg.strict_decode, "unparseable flags are ignored");
    }
}
