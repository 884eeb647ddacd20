//! Server startup: logging and graceful shutdown

pub mod logging;
pub mod shutdown;

pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::{GracefulShutdown, shutdown_requested};
