pub mod classify;
pub mod config;
pub mod runtime;
pub mod serve;

pub use classify::{cmd_classify, ClassifyArgs};
pub use config::{cmd_config, ConfigArgs};
pub use runtime::{init_logging, load_config, LogFormat};
pub use serve::{cmd_serve, ServeArgs};
