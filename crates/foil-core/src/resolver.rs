//! Turning config files, overrides and defaults into a connection descriptor
//!
//! [`merge`] is tolerant: it fills what it can and leaves the rest unset.
//! [`resolve`] runs [`merge`] and then the strict
//! [`PartialDescriptor::validate`].
//!
//! When a config map is given it is the only source. Overrides and defaults
//! are used only when there is no config map at all.

use crate::{
    ConfigMap, ConnectionDescriptor, FoilError, LoadedConfig, PartialDescriptor, Result,
    discover_config, expand_path, load_config,
};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const MONGO_SERVER_SECTION: &str = "MongoServer";
pub const MONGO_CLIENT_SECTION: &str = "MongoClient";
pub const MONGO_DATABASE_SECTION: &str = "MongoDatabase";
pub const SSH_TUNNEL_SECTION: &str = "SSHTunnel";

pub const ADDRESS_OPTION: &str = "address";
pub const PORT_OPTION: &str = "port";
pub const TIMEOUT_OPTION: &str = "serverselectiontimeoutms";
pub const DATABASE_NAME_OPTION: &str = "database_name";
pub const USE_SSH_TUNNEL_OPTION: &str = "use_ssh_tunnel";
pub const SSH_HOST_OPTION: &str = "ssh_host";
pub const SSH_PORT_OPTION: &str = "ssh_port";
pub const SSH_USERNAME_OPTION: &str = "ssh_username";
pub const SSH_KEY_FILE_OPTION: &str = "ssh_key_file";
pub const REMOTE_PORT_OPTION: &str = "remote_port";

/// Files tried, in order, when no config path is given
pub const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["database.ini", "~/.database.ini"];

/// Built-in connection defaults: `localhost:27017`, 30 s timeout, no tunnel
pub static DEFAULT_CONNECTION: LazyLock<PartialDescriptor> = LazyLock::new(|| {
    PartialDescriptor::new()
        .with_address("localhost")
        .with_port(27017)
        .with_timeout_ms(30_000)
        .without_tunnel()
});

/// Collect connection parameters without validating them.
///
/// With a config map every field is read from it; a missing option leaves
/// the field unset and a malformed integer is a parse error. Without a
/// config map each field comes from `overrides`, falling back to `defaults`.
pub fn merge(
    config: Option<&ConfigMap>,
    overrides: &PartialDescriptor,
    defaults: &PartialDescriptor,
) -> Result<PartialDescriptor> {
    match config {
        Some(config) => from_config(config),
        None => Ok(overrides.or(defaults)),
    }
}

/// Merge and validate in one step
pub fn resolve(
    config: Option<&ConfigMap>,
    overrides: &PartialDescriptor,
    defaults: &PartialDescriptor,
) -> Result<ConnectionDescriptor> {
    let partial = merge(config, overrides, defaults)?;
    let descriptor = partial.validate()?;
    tracing::debug!(
        from_config = config.is_some(),
        address = %descriptor.address,
        port = descriptor.port,
        timeout_ms = descriptor.timeout_ms,
        use_tunnel = descriptor.use_tunnel(),
        "connection descriptor resolved"
    );
    Ok(descriptor)
}

fn from_config(config: &ConfigMap) -> Result<PartialDescriptor> {
    let text = |section: &str, option: &str| {
        optional(config.get(section, option).map(str::to_string))
    };
    let int = |section: &str, option: &str| optional(config.get_int(section, option));

    Ok(PartialDescriptor {
        address: text(MONGO_SERVER_SECTION, ADDRESS_OPTION)?,
        port: int(MONGO_SERVER_SECTION, PORT_OPTION)?,
        timeout_ms: int(MONGO_CLIENT_SECTION, TIMEOUT_OPTION)?,
        database_name: text(MONGO_DATABASE_SECTION, DATABASE_NAME_OPTION)?,
        use_tunnel: optional(config.get_bool(SSH_TUNNEL_SECTION, USE_SSH_TUNNEL_OPTION))?,
        tunnel_host: text(SSH_TUNNEL_SECTION, SSH_HOST_OPTION)?,
        tunnel_port: int(SSH_TUNNEL_SECTION, SSH_PORT_OPTION)?,
        tunnel_username: text(SSH_TUNNEL_SECTION, SSH_USERNAME_OPTION)?,
        private_key_path: text(SSH_TUNNEL_SECTION, SSH_KEY_FILE_OPTION)?,
        remote_port: int(SSH_TUNNEL_SECTION, REMOTE_PORT_OPTION)?,
    })
}

/// A missing key becomes `None`; every other error is kept
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(FoilError::KeyNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Config written by `foil --init`
pub fn default_config_map() -> ConfigMap {
    let key_file = dirs::home_dir()
        .map(|home| home.join(".ssh").join("ssh_key"))
        .unwrap_or_else(|| PathBuf::from("~/.ssh/ssh_key"));

    ConfigMap::from_sections([
        (
            MONGO_SERVER_SECTION,
            vec![
                (ADDRESS_OPTION, "localhost".to_string()),
                (PORT_OPTION, "27017".to_string()),
            ],
        ),
        (
            MONGO_DATABASE_SECTION,
            vec![(DATABASE_NAME_OPTION, "foil".to_string())],
        ),
        (
            MONGO_CLIENT_SECTION,
            vec![(TIMEOUT_OPTION, "5000".to_string())],
        ),
        (
            SSH_TUNNEL_SECTION,
            vec![
                (USE_SSH_TUNNEL_OPTION, "False".to_string()),
                (SSH_HOST_OPTION, "someserver.com".to_string()),
                (SSH_PORT_OPTION, "22".to_string()),
                (SSH_USERNAME_OPTION, "user".to_string()),
                (REMOTE_PORT_OPTION, "27017".to_string()),
                (SSH_KEY_FILE_OPTION, key_file.display().to_string()),
            ],
        ),
    ])
}

/// Find the config to connect with.
///
/// An explicit path must load. Without one the default locations are tried
/// in order and `None` means no config file was found.
pub fn load_connection_config(explicit: Option<&Path>) -> Result<Option<LoadedConfig>> {
    match explicit {
        Some(path) => {
            let config = load_config(path)?;
            Ok(Some(LoadedConfig {
                path: expand_path(path),
                config,
            }))
        }
        None => {
            let found = discover_config(&DEFAULT_CONFIG_LOCATIONS);
            if found.is_none() {
                tracing::debug!(
                    candidates = ?DEFAULT_CONFIG_LOCATIONS,
                    "no config file found, using explicit parameters"
                );
            }
            Ok(found)
        }
    }
}
