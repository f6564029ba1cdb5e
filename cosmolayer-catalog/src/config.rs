//! Startup provisioning settings for the product container.

use serde::{Deserialize, Serialize};

use cosmolayer::{
    error::{DocumentStoreError, DocumentStoreResult},
    resource::ThroughputProperties,
};

/// Throughput the product database and container are created with at startup.
///
/// Every field has a default, so an empty JSON object is a valid configuration. The
/// container's id and partition key path come from the client facade.
///
/// ```ignore
/// let config = ProvisioningConfig::from_json(r#"{ "container_throughput": { "autoscale": { "max": 4000 } } }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    /// Shared throughput for the database. `None` leaves throughput to the containers.
    pub database_throughput: Option<ThroughputProperties>,
    pub container_throughput: Option<ThroughputProperties>,
}

impl ProvisioningConfig {
    pub fn from_json(json: &str) -> DocumentStoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DocumentStoreError::Initialization(format!("invalid provisioning config: {e}")))
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            database_throughput: None,
            container_throughput: Some(ThroughputProperties::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        assert_eq!(ProvisioningConfig::from_json("{}").unwrap(), ProvisioningConfig::default());
    }

    #[test]
    fn overrides_are_read() {
        let config = ProvisioningConfig::from_json(
            r#"{ "database_throughput": { "manual": 1000 }, "container_throughput": { "autoscale": { "max": 4000 } } }"#,
        )
        .unwrap();

        assert_eq!(config.database_throughput, Some(ThroughputProperties::Manual(1000)));
        assert_eq!(config.container_throughput, Some(ThroughputProperties::Autoscale { max: 4000 }));
    }

    #[test]
    fn malformed_config_is_an_initialization_error() {
        let err = ProvisioningConfig::from_json("{ \"container_throughput\": 3 }").unwrap_err();
        assert!(matches!(err, DocumentStoreError::Initialization(_)));
    }

    #[test]
    fn container_shape_is_not_configurable() {
        let err = ProvisioningConfig::from_json(r#"{ "partition_key_path": "/name" }"#).unwrap_err();
        assert!(matches!(err, DocumentStoreError::Initialization(_)));
    }
}
