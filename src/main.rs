/// Entry point for the fsinfo filesystem inventory tool.
///
/// Prints the tracked filesystems of the host as JSON. Configuration is read
/// from `FSINFO_*` environment variables (see [`fsinfo::config`]); logging is
/// controlled with `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the mount table cannot
/// be read.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info FSINFO_WITH_IO_STATS=1 FSINFO_USAGE_DIR=/var/lib cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    fsinfo::run().await
}
