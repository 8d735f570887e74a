use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Environment variable naming the config file, e.g.
/// `DOCKET_CONFIG=/etc/docket/docket.toml`.
pub const CONFIG_PATH_ENV: &str = "DOCKET_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "docket.toml";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(Figment::new().merge(Toml::file(path)))
}

/// Resolve the config the way the daemon does: `DOCKET_CONFIG` if set,
/// otherwise `docket.toml` in the working directory, otherwise defaults.
/// Environment overrides apply in every case; only an explicitly named
/// file is required to exist.
pub fn resolve_config() -> Result<Config, ConfigError> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => load_config(&PathBuf::from(path)),
        Err(_) => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)
            } else {
                extract(Figment::new())
            }
        }
    }
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    // Two-underscore separator: section names and key names both contain
    // single underscores (DOCKET_PROCESSORS__AI_ENDPOINT).
    figment
        .merge(Env::prefixed("DOCKET_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}
