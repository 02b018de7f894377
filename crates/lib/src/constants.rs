//! Names shared between the in-memory model and the persisted form.

/// Persisted sub-field holding a time-restoring field's current value.
pub const RESTORE_VALUE: &str = "val";

/// Persisted sub-field holding a time-restoring field's maximum.
pub const RESTORE_MAX: &str = "maxval";

/// Persisted sub-field holding the time of the last recorded change.
pub const RESTORE_UPDATED: &str = "utime";

/// Persisted sub-field holding the regeneration interval in milliseconds.
pub const RESTORE_INTERVAL: &str = "tick";

/// Default name of the field records are matched on.
pub const DEFAULT_KEY_FIELD: &str = "_id";

/// Separator between dotted path segments.
pub const PATH_SEPARATOR: char = '.';
