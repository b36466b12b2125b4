//! Built-in middleware

pub mod logger;

pub use logger::{logger, logger_with_config, LoggerConfig};
