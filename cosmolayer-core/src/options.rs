//! Per-request options passed through to the document service.
//!
//! Options are hints: backends honor what they support and ignore the rest.

use serde::{Deserialize, Serialize};

use crate::document::PartitionKey;

/// Read consistency requested for a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    Strong,
    BoundedStaleness,
    Session,
    ConsistentPrefix,
    Eventual,
}

/// Options for single-item and resource operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Only apply the write if the stored item still carries this etag.
    pub if_match: Option<String>,
    pub consistency_level: Option<ConsistencyLevel>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    pub fn with_consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = Some(level);
        self
    }
}

/// Options for query operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Requested number of items per server page. The service may return fewer.
    pub max_item_count: Option<usize>,
    /// Restricts the query to a single partition.
    pub partition_key: Option<PartitionKey>,
    pub consistency_level: Option<ConsistencyLevel>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_item_count(mut self, max_item_count: usize) -> Self {
        self.max_item_count = Some(max_item_count);
        self
    }

    pub fn with_partition_key(mut self, partition_key: impl Into<PartitionKey>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    pub fn with_consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = Some(level);
        self
    }
}
