/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier of a bin node as reported by the devices (e.g. `"node1"`).
pub type NodeId = String;
