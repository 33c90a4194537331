//! Configuration Vault – reads/writes `~/.politenav/config.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use politenav_kernel::{InterceptorParams, StaticParameters};
use politenav_middleware::BridgeTopics;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLAN_RATE_HZ: u32 = 10;

/// Stand-in for the parameter server: fully qualified keys, as the
/// controller lookup reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterTable {
    #[serde(default)]
    pub strings: BTreeMap<String, String>,
    #[serde(default)]
    pub numbers: BTreeMap<String, f64>,
}

impl Default for ParameterTable {
    fn default() -> Self {
        Self {
            strings: BTreeMap::from([("/local_planner".to_string(), "teb".to_string())]),
            numbers: BTreeMap::from([(
                "/move_base_flex/TebLocalPlannerROS/max_vel_x".to_string(),
                0.5,
            )]),
        }
    }
}

impl ParameterTable {
    pub fn to_source(&self) -> StaticParameters {
        let mut source = StaticParameters::new();
        for (k, v) in &self.strings {
            source.set_str(k.as_str(), v.as_str());
        }
        for (k, v) in &self.numbers {
            source.set_f64(k.as_str(), *v);
        }
        source
    }
}

/// Persisted configuration stored in `~/.politenav/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket URL of the `rosbridge_server`.
    #[serde(default = "default_rosbridge_url")]
    pub rosbridge_url: String,

    /// Namespace the controller keyword and parameters are looked up under.
    #[serde(default = "default_node_namespace")]
    pub node_namespace: String,

    /// Upper bound on pose-triggered planning requests per second.
    #[serde(default = "default_plan_rate_hz")]
    pub plan_rate_hz: u32,

    #[serde(default)]
    pub topics: BridgeTopics,

    #[serde(default)]
    pub interceptor: InterceptorParams,

    #[serde(default)]
    pub parameters: ParameterTable,
}

fn default_rosbridge_url() -> String {
    "ws://localhost:9090".to_string()
}
fn default_node_namespace() -> String {
    "/".to_string()
}
fn default_plan_rate_hz() -> u32 {
    DEFAULT_PLAN_RATE_HZ
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rosbridge_url: default_rosbridge_url(),
            node_namespace: default_node_namespace(),
            plan_rate_hz: default_plan_rate_hz(),
            topics: BridgeTopics::default(),
            interceptor: InterceptorParams::default(),
            parameters: ParameterTable::default(),
        }
    }
}

/// `POLITENAV_CONFIG` if set, otherwise `~/.politenav/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("POLITENAV_CONFIG") {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".politenav").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `POLITENAV_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `POLITENAV_ROSBRIDGE_URL` | `rosbridge_url` |
/// | `POLITENAV_NAMESPACE` | `node_namespace` |
/// | `POLITENAV_PLAN_RATE_HZ` | `plan_rate_hz` (ignored unless a positive integer) |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("POLITENAV_ROSBRIDGE_URL") {
        cfg.rosbridge_url = v;
    }
    if let Ok(v) = std::env::var("POLITENAV_NAMESPACE") {
        cfg.node_namespace = v;
    }
    if let Ok(v) = std::env::var("POLITENAV_PLAN_RATE_HZ")
        && let Ok(rate) = v.parse::<u32>()
        && rate > 0
    {
        cfg.plan_rate_hz = rate;
    }
}

/// Save the config to disk, creating the parent directory if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
