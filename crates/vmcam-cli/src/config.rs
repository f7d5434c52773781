//! Configuration Vault – reads/writes `~/.vmcam/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vmcam_runtime::SessionConfig;
use vmcam_types::VmcError;

/// Persisted user configuration stored in `~/.vmcam/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// UDP port the tracking source sends to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Name of the scene object that receives the pose.
    #[serde(default = "default_camera_name")]
    pub camera_name: String,

    /// Local address to listen on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Applier tick cadence in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Upper bound on one blocking receive in milliseconds.
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,

    /// Host that `/send` addresses its test packets to.
    #[serde(default = "default_sender_host")]
    pub sender_host: String,
}

fn default_port() -> u16 {
    vmcam_runtime::DEFAULT_PORT
}
fn default_camera_name() -> String {
    vmcam_runtime::DEFAULT_CAMERA_NAME.to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_tick_interval_ms() -> u64 {
    10
}
fn default_recv_timeout_ms() -> u64 {
    500
}
fn default_sender_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            camera_name: default_camera_name(),
            bind_address: default_bind_address(),
            tick_interval_ms: default_tick_interval_ms(),
            recv_timeout_ms: default_recv_timeout_ms(),
            sender_host: default_sender_host(),
        }
    }
}

impl Config {
    /// Build the runtime's [`SessionConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`VmcError::Config`] when `bind_address` is not an IP address
    /// or a duration is zero.
    pub fn to_session_config(&self) -> Result<SessionConfig, VmcError> {
        let bind_address: IpAddr = self.bind_address.trim().parse().map_err(|_| {
            VmcError::Config(format!("invalid bind_address '{}'", self.bind_address))
        })?;
        if self.tick_interval_ms == 0 {
            return Err(VmcError::Config("tick_interval_ms must be > 0".to_string()));
        }
        if self.recv_timeout_ms == 0 {
            return Err(VmcError::Config("recv_timeout_ms must be > 0".to_string()));
        }
        Ok(SessionConfig {
            bind_address,
            port: self.port,
            camera_name: self.camera_name.clone(),
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            recv_timeout: Duration::from_millis(self.recv_timeout_ms),
        })
    }

    /// Where `/send` should address packets so the local receiver sees them.
    ///
    /// # Errors
    ///
    /// Returns [`VmcError::Config`] when `sender_host` is not an IP address.
    pub fn sender_target(&self) -> Result<std::net::SocketAddr, VmcError> {
        let host: IpAddr = self.sender_host.trim().parse().map_err(|_| {
            VmcError::Config(format!("invalid sender_host '{}'", self.sender_host))
        })?;
        Ok(std::net::SocketAddr::new(host, self.port))
    }
}

/// Return the path to `~/.vmcam/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".vmcam").join("config.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `VMCAM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `VMCAM_PORT` | `port` |
/// | `VMCAM_CAMERA` | `camera_name` |
/// | `VMCAM_BIND_ADDRESS` | `bind_address` |
/// | `VMCAM_SENDER_HOST` | `sender_host` |
///
/// Unparseable ports are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("VMCAM_PORT")
        && let Ok(port) = v.trim().parse::<u16>()
    {
        cfg.port = port;
    }
    if let Ok(v) = std::env::var("VMCAM_CAMERA")
        && !v.trim().is_empty()
    {
        cfg.camera_name = v;
    }
    if let Ok(v) = std::env::var("VMCAM_BIND_ADDRESS") {
        cfg.bind_address = v;
    }
    if let Ok(v) = std::env::var("VMCAM_SENDER_HOST") {
        cfg.sender_host = v;
    }
}

/// Save the config to disk, creating `~/.vmcam/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.port, 8000);
        assert_eq!(loaded.camera_name, "Camera");
        assert_eq!(loaded.bind_address, "0.0.0.0");
        assert_eq!(loaded.tick_interval_ms, 10);
        assert_eq!(loaded.recv_timeout_ms, 500);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "camera_name = \"Witness\"\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.camera_name, "Witness");
        assert_eq!(loaded.port, 8000);
        assert_eq!(loaded.sender_host, "127.0.0.1");
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"eight thousand\"\n").unwrap();
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn config_path_points_to_vmcam_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".vmcam"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn default_converts_to_default_session_config() {
        let session = Config::default().to_session_config().unwrap();
        assert_eq!(session, SessionConfig::default());
    }

    #[test]
    fn invalid_bind_address_is_a_config_error() {
        let cfg = Config {
            bind_address: "not-an-ip".to_string(),
            ..Config::default()
        };
        assert!(matches!(cfg.to_session_config(), Err(VmcError::Config(_))));
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let cfg = Config {
            tick_interval_ms: 0,
            ..Config::default()
        };
        assert!(matches!(cfg.to_session_config(), Err(VmcError::Config(_))));
    }

    #[test]
    fn sender_target_uses_configured_port() {
        let cfg = Config {
            port: 9000,
            ..Config::default()
        };
        let target = cfg.sender_target().unwrap();
        assert_eq!(target.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(target.port(), 9000);
    }

    // All env-var cases share one test so no two tests mutate the
    // environment concurrently.
    #[test]
    fn apply_env_overrides_reads_vmcam_vars() {
        // SAFETY: no other test in this crate reads or writes these vars.
        unsafe {
            std::env::set_var("VMCAM_PORT", "9001");
            std::env::set_var("VMCAM_CAMERA", "Witness");
            std::env::set_var("VMCAM_BIND_ADDRESS", "127.0.0.1");
            std::env::set_var("VMCAM_SENDER_HOST", "10.0.0.2");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.camera_name, "Witness");
        assert_eq!(cfg.bind_address, "127.0.0.1");
        assert_eq!(cfg.sender_host, "10.0.0.2");

        unsafe { std::env::set_var("VMCAM_PORT", "not-a-port") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.port, 8000);

        unsafe {
            std::env::remove_var("VMCAM_PORT");
            std::env::remove_var("VMCAM_CAMERA");
            std::env::remove_var("VMCAM_BIND_ADDRESS");
            std::env::remove_var("VMCAM_SENDER_HOST");
        }
    }
}
