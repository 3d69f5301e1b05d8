//! # Built-in listeners
//!
//! - [`LogWriter`]: logs delivered events through `tracing` (demo/debug).

mod log;

pub use log::LogWriter;
