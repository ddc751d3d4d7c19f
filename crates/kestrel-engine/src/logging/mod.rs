//! Logging setup.
//!
//! Everything in the engine logs through the `log` facade. This module only
//! installs the `env_logger` backend, once, early in `main`.

mod init;

pub use init::{init_logging, LoggingConfig};
