//! Configuration and constants for profile conversion.

/// Upper bound on buffered multipart form data (32 MiB)
pub const MAX_FORM_MEMORY: u64 = 32 << 20;

// Multipart field names used by profiler agents
pub const FORM_FIELD_PROFILE: &str = "profile";
pub const FORM_FIELD_SAMPLE_TYPE_CONFIG: &str = "sample_type_config";
pub const FORM_FIELD_JFR: &str = "jfr";
pub const FORM_FIELD_LABELS: &str = "labels";

/// Synthetic tag added to the metadata when a sample rate is known
pub const SAMPLE_RATE_TAG: &str = "_sample_rate_";

/// Reserved tag/label carrying the correlation (profile) id
pub const PROFILE_ID_LABEL: &str = "profile_id";

/// Marker written into every record's `dataType` field
pub const DATA_TYPE_CALL_STACK: &str = "CallStack";

// JFR literals
pub const JFR_ACTIVE_EVENT_SETTING: &str = "event";
pub const JFR_WALL_EVENT: &str = "wall";
pub const JFR_RUNNABLE_STATE: &str = "STATE_RUNNABLE";

/// Gzip stream magic bytes
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Window assumed by the CLI when no start time is given
pub const DEFAULT_WINDOW_SECS: i64 = 10;
