use std::time::Duration;

/// Widest availability or calendar query window, in days.
pub const MAX_QUERY_WINDOW_DAYS: i64 = 366;

/// Longest bookable stay, in nights.
pub const MAX_STAY_NIGHTS: i64 = 90;

/// Most removals plus additions in a single block-edit submission.
pub const MAX_BLOCK_BATCH: usize = 100;

/// Longest accepted name or contact field, in bytes.
pub const MAX_FIELD_LEN: usize = 256;

/// How long an in-progress reservation draft stays alive.
pub const DRAFT_TTL: Duration = Duration::from_secs(30 * 60);
