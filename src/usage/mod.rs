//! Directory disk usage, measured by a bounded external command.

mod error;
mod probe;

pub use error::{Error, Result};
pub use probe::DirectoryUsageProbe;
