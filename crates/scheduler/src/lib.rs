pub mod debounce;
pub mod error;
pub mod metrics;
pub mod model;

pub use debounce::DebounceRegistry;
pub use error::SchedulerError;
pub use model::DEFAULT_QUIET_PERIOD;
