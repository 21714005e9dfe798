//! Background Removal CLI Tool
//!
//! Command-line front end for the bgremove-app flow: validates one image,
//! runs it through the configured background removal program and saves the
//! transparent result.

#[cfg(feature = "cli")]
use bgremove_app::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
