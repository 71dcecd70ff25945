//! Rowlink client configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RowlinkError};
use crate::types::Location;

/// Client-side configuration.
///
/// `params` are opaque connection parameters (e.g. transport options the
/// service understands); they are passed through to the service at
/// negotiation time without interpretation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Planner endpoint to submit requests to.
    pub planner: Location,

    /// Preferred records-per-batch hint sent when opening a task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_size: Option<usize>,

    /// Opaque connection parameters, passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            planner: Location::new("127.0.0.1", 40000),
            fetch_size: None,
            params: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RowlinkError::Config(e.to_string()))?;
        toml::from_str(&content).map_err(|e| RowlinkError::Config(e.to_string()))
    }

    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| RowlinkError::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| RowlinkError::Config(e.to_string()))?;
        Ok(())
    }
}
