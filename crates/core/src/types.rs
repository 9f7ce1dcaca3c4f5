/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generation sessions and gallery entries are keyed by UUID v7 so that
/// identifiers sort by creation time.
pub type EntityId = uuid::Uuid;
