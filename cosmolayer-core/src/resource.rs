//! Descriptions of the service-side resources a client provisions: databases,
//! containers, and user-defined functions.

use serde::{Deserialize, Serialize};

/// Partition key path used when a container does not specify one.
pub const DEFAULT_PARTITION_KEY_PATH: &str = "/id";

/// Provisioned throughput for a database or container, in request units per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThroughputProperties {
    Manual(u32),
    Autoscale { max: u32 },
}

impl Default for ThroughputProperties {
    fn default() -> Self {
        ThroughputProperties::Manual(400)
    }
}

/// A provisioned database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseProperties {
    pub id: String,
    pub throughput: Option<ThroughputProperties>,
}

/// A provisioned container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerProperties {
    pub id: String,
    /// JSON path of the partition key, e.g. `/id` or `/customer/region`.
    pub partition_key_path: String,
    pub throughput: Option<ThroughputProperties>,
}

impl ContainerProperties {
    pub fn new(id: impl Into<String>, partition_key_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            partition_key_path: partition_key_path.into(),
            throughput: None,
        }
    }

    /// Splits the partition key path into field segments.
    ///
    /// `/customer/region` yields `["customer", "region"]`.
    pub fn partition_key_segments(&self) -> impl Iterator<Item = &str> {
        self.partition_key_path
            .split('/')
            .filter(|segment| !segment.is_empty())
    }
}

impl Default for ContainerProperties {
    fn default() -> Self {
        Self::new("", DEFAULT_PARTITION_KEY_PATH)
    }
}

/// A user-defined function registered on a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionProperties {
    pub id: String,
    pub body: String,
}
