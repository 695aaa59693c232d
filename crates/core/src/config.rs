//! Service configuration.
//!
//! The configuration file is resolved once at process startup and turned into a
//! [`RouteTable`](crate::RouteTable) that is then passed into the HTTP layer. Nothing here is
//! consulted during request handling.
//!
//! ## File format
//!
//! ```yaml
//! paths:
//!   - repolocation: "/srv/repos/laser"
//!     url: "/ihm"
//!     path: "builds/IHM/ihm.exe"
//! ```

use crate::routes::{RouteEntry, RouteTable};
use crate::{ConfigError, ConfigResult};
use std::path::Path;

/// Parsed configuration file.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub paths: Vec<RouteEntry>,
}

impl ServiceConfig {
    /// Read and parse the YAML configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::FileRead` if the file cannot be read, or
    /// `ConfigError::YamlDeserialization` if it is not a valid configuration document.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML text.
    ///
    /// An empty document is an empty configuration.
    pub fn from_yaml_str(contents: &str) -> ConfigResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(ConfigError::YamlDeserialization)
    }

    /// Validate the entries and build the route table.
    pub fn into_route_table(self) -> ConfigResult<RouteTable> {
        let table = RouteTable::build(self.paths)?;
        if table.is_empty() {
            tracing::warn!("configuration declares no paths; only the liveness probe is served");
        }
        Ok(table)
    }
}

/// Load the configuration at `path` and build its route table.
pub fn load_route_table(path: &Path) -> ConfigResult<RouteTable> {
    ServiceConfig::load(path)?.into_route_table()
}
