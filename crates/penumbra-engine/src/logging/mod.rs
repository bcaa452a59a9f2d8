//! Process-wide logger setup over the `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
