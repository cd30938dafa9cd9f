use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no tokio runtime available to drive debounce timers")]
    NoRuntime,
}

impl From<SchedulerError> for tabguard_core_types::GateError {
    fn from(value: SchedulerError) -> Self {
        tabguard_core_types::GateError::internal(value.to_string())
    }
}
