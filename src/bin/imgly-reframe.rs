//! IMG.LY Batch Reframing CLI Tool
//!
//! Command-line interface for fitting, cutting out and renaming batches of
//! images with the imgly-reframe library.

#[cfg(feature = "cli")]
use imgly_reframe::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
