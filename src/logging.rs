use anyhow::Result;
use std::io;
use tracing::Level;
use tracing_subscriber::fmt;

/// Installs the stderr subscriber when `verbose` is set; stdout stays reserved
/// for the JSON result.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    let _ = fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .with_level(true)
        .try_init();
    Ok(())
}
