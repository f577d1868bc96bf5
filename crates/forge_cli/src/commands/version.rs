//! Version command - Print version information.

use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("kubeforge {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
