mod error;
mod parser;
mod table;

pub use error::{Error, Result};
pub use parser::{MountInfo, MountInfoField, ParseError, parse_mount_info_line, unescape};
pub use table::{MountEntry, read_mount_table};
