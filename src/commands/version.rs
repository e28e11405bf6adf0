//! Version command implementation

use anyhow::Result;

/// Print the mkrepo version
pub fn execute() -> Result<()> {
    println!("{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
