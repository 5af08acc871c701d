//! Configuration
//!
//! Settings are read from a YAML file (user-level by default,
//! `~/.config/toolrelay/config.yaml`) and then overridden from the
//! environment. A missing file yields the defaults.

mod error;
mod file;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use file::FileConfig;
pub use settings::{
    BackendSettings, RelayConfig, RemoteServerConfig, DEFAULT_MODEL, DEFAULT_PROVIDER,
    DEFAULT_SYSTEM_PROMPT,
    ENV_API_BASE, ENV_API_KEY, ENV_MODEL, ENV_PROVIDER,
};
