//! Infrastructure modules.
//!
//! - **Logging**: subscriber setup and component log targets

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};
