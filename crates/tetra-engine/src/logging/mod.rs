//! Logging utilities.
//!
//! Everything in the engine reports through the `log` facade. Resource
//! managers degrade instead of failing, so these logs are the only trace of a
//! skipped draw or a rejected handle.

mod init;

pub use init::{init_logging, LoggingConfig};
