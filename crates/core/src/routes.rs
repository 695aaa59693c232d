//! Route table.
//!
//! Maps public endpoints to the (repository, file path) pair they serve. The table is built once
//! at startup, validated eagerly, and read-only afterwards. Each [`Route`] owns its own data;
//! nothing is shared between routes.

use crate::constants::READY_ENDPOINT;
use crate::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One configured endpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Route {
    endpoint: String,
    repository: PathBuf,
    path: String,
}

impl Route {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    /// Path of the served file inside each commit's tree.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Raw route triple as supplied by configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RouteEntry {
    #[serde(default, rename = "repolocation")]
    pub repo_location: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub path: String,
}

/// Immutable endpoint → route map.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    by_endpoint: HashMap<String, usize>,
}

impl RouteTable {
    /// Validate `entries` and build the table.
    ///
    /// Entries keep their configured order. Fields are trimmed before use.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - any entry has an empty `repolocation`, `url` or `path`,
    /// - an endpoint does not start with `/`,
    /// - an endpoint is the reserved liveness endpoint,
    /// - two entries use the same endpoint.
    pub fn build<I>(entries: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = RouteEntry>,
    {
        let mut table = Self::default();

        for (index, entry) in entries.into_iter().enumerate() {
            let repository = required(&entry.repo_location, index, "repolocation")?;
            let endpoint = required(&entry.url, index, "url")?;
            let path = required(&entry.path, index, "path")?;

            if !endpoint.starts_with('/') {
                return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
            }
            if endpoint == READY_ENDPOINT {
                return Err(ConfigError::ReservedEndpoint(endpoint.to_string()));
            }
            if table.by_endpoint.contains_key(endpoint) {
                return Err(ConfigError::DuplicateEndpoint(endpoint.to_string()));
            }

            table
                .by_endpoint
                .insert(endpoint.to_string(), table.routes.len());
            table.routes.push(Route {
                endpoint: endpoint.to_string(),
                repository: PathBuf::from(repository),
                path: path.to_string(),
            });
        }

        Ok(table)
    }

    /// Look up the route serving `endpoint`. Matching is exact.
    pub fn dispatch(&self, endpoint: &str) -> Option<&Route> {
        self.by_endpoint.get(endpoint).map(|&i| &self.routes[i])
    }

    /// Routes in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn required<'a>(value: &'a str, index: usize, field: &'static str) -> ConfigResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::MissingField { index, field });
    }
    Ok(value)
}
