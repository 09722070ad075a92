//! Serverless function metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Resource;

/// A serverless function (metadata only, deployments are not transferred).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    /// Function id.
    pub id: String,
    /// Function name.
    pub name: String,
    /// Runtime identifier, e.g. `node-18.0`.
    pub runtime: String,
    /// Entrypoint file.
    #[serde(default)]
    pub entrypoint: String,
    /// Whether the function can be executed.
    #[serde(default)]
    pub enabled: bool,
    /// Execution timeout in seconds.
    #[serde(default)]
    pub timeout: u32,
    /// CRON schedule.
    #[serde(default)]
    pub schedule: String,
    /// Events that trigger the function.
    #[serde(default)]
    pub events: Vec<String>,
    /// Environment variables.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Function {
    /// Creates an enabled function with a 15 second timeout.
    pub fn new(id: impl Into<String>, name: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            runtime: runtime.into(),
            entrypoint: String::new(),
            enabled: true,
            timeout: 15,
            schedule: String::new(),
            events: Vec::new(),
            variables: BTreeMap::new(),
        }
    }
}

impl Resource for Function {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &'static str {
        "Function"
    }
}
