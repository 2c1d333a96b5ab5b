use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cyber_compliance_catalog::Catalog;
use serde_json::Value;

use super::{Operation, ToolClient, ToolError, Transport};

/// Calls the linked catalog in-process.
#[derive(Debug, Clone)]
pub struct DirectClient {
    catalog: Arc<Catalog>,
}

impl DirectClient {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    /// Uses the catalog file at `path`, or the built-in catalog when no path is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Unavailable`] when the configured catalog cannot be loaded.
    pub fn from_catalog_path(path: Option<&Path>) -> Result<Self, ToolError> {
        let catalog = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading catalog file");
                Catalog::from_path(path).map_err(|err| ToolError::Unavailable(err.to_string()))?
            }
            None => Catalog::builtin(),
        };
        Ok(Self::new(catalog))
    }
}

#[async_trait]
impl ToolClient for DirectClient {
    fn transport(&self) -> Transport {
        Transport::Direct
    }

    async fn invoke(&self, operation: Operation, arguments: Value) -> Result<Value, ToolError> {
        tracing::debug!(tool = %operation, "direct tool call");
        Ok(self.catalog.dispatch(operation.tool_name(), arguments))
    }
}
