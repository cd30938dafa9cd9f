use std::time::Duration;

/// Delay between page-load-complete and classification.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(5);
