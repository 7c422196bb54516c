//! Configuration for the crossplane facade.
//!
//! Everything the handlers used to take from fixed paths or the working
//! directory (manifest directory, binaries, the provider credentials script)
//! is an explicit field here and is threaded into the orchestrator at
//! construction time.
//!
//! Lookup order:
//! 1. an explicit path (`--config`)
//! 2. `$CROSSPLANE_FACADE_CONFIG`
//! 3. `<config dir>/crossplane-facade/config.toml`, when it exists
//! 4. built-in defaults
//!
//! Environment overrides are applied on top of whichever source won.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_ENV: &str = "CROSSPLANE_FACADE_CONFIG";
pub const BIND_ENV: &str = "CROSSPLANE_FACADE_BIND";
pub const MANIFEST_DIR_ENV: &str = "CROSSPLANE_FACADE_MANIFEST_DIR";
pub const KUBECTL_ENV: &str = "CROSSPLANE_FACADE_KUBECTL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub commands: CommandsConfig,
    pub provider: ProviderConfig,
    pub orchestration: OrchestrationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Applied manifests, one `<tenant>/<name>.yaml` per resource.
    pub manifest_dir: PathBuf,
    /// Transient creation documents, removed after each apply.
    pub scratch_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            manifest_dir: PathBuf::from("/var/lib/crossplane-facade/manifests"),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub kubectl: PathBuf,
    pub openstack: PathBuf,
    pub shell: PathBuf,
    /// Sourced before every openstack call; exports the `OS_*` credentials.
    pub admin_script: PathBuf,
    pub timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            kubectl: PathBuf::from("kubectl"),
            openstack: PathBuf::from("openstack"),
            shell: PathBuf::from("bash"),
            admin_script: PathBuf::from("/home/ubuntu/admin.sh"),
            timeout_secs: 120,
        }
    }
}

impl CommandsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// `spec.providerConfigRef.name` stamped on every provider resource.
    pub config_ref: String,
    pub instance_api_version: String,
    pub volume_api_version: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            config_ref: "provider-openstack-config".to_string(),
            instance_api_version: "compute.openstack.crossplane.io/v1alpha1".to_string(),
            volume_api_version: "blockstorage.openstack.crossplane.io/v1alpha1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Hold a per-resource lock across inspect and apply. Off by default,
    /// which leaves concurrent actions on one resource unordered.
    pub serialize_per_resource: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "orchestrator_api=info,orchestrator_core=info,command_runner=info,tower_http=info"
                .to_string(),
            json: false,
        }
    }
}

impl FacadeConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from a specific file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Resolve the config source, apply environment overrides and validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        Self::default_path().filter(|p| p.exists())
    }

    /// `<config dir>/crossplane-facade/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("crossplane-facade").join("config.toml"))
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(BIND_ENV) {
            self.server.bind = bind.parse().map_err(|e| ConfigError::Invalid {
                key: BIND_ENV,
                message: format!("'{bind}': {e}"),
            })?;
        }
        if let Some(dir) = lookup(MANIFEST_DIR_ENV) {
            self.paths.manifest_dir = PathBuf::from(dir);
        }
        if let Some(kubectl) = lookup(KUBECTL_ENV) {
            self.commands.kubectl = PathBuf::from(kubectl);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.commands.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "commands.timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        let binaries = [
            ("commands.kubectl", &self.commands.kubectl),
            ("commands.openstack", &self.commands.openstack),
            ("commands.shell", &self.commands.shell),
        ];
        for (key, path) in binaries {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid {
                    key,
                    message: "must not be empty".to_string(),
                });
            }
        }
        if self.provider.config_ref.is_empty() {
            return Err(ConfigError::Invalid {
                key: "provider.config_ref",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
