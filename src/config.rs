//! Configuration for subscription access.

use crate::error::{PaymentsError, Result};
use serde::Deserialize;

/// Payments configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Top-level collection holding one document per customer.
    /// Default: "customers"
    pub customers_collection: String,

    /// Max buffered events per `MemoryStore` listener and snapshots per
    /// subscription feed.
    /// Default: 1000
    pub listener_buffer_size: usize,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            customers_collection: "customers".to_string(),
            listener_buffer_size: 1000,
        }
    }
}

impl PaymentsConfig {
    /// Parse a JSON configuration; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PaymentsError::InvalidArgument(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let name = &self.customers_collection;
        if name.is_empty() || name.contains('/') {
            return Err(PaymentsError::InvalidArgument(format!(
                "customers_collection must be a single non-empty path segment, got {name:?}"
            )));
        }
        if self.listener_buffer_size == 0 {
            return Err(PaymentsError::InvalidArgument(
                "listener_buffer_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
