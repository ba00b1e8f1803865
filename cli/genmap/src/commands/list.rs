//! `genmap list`: built-in architectures, applications and artifacts.

use anyhow::Result;

use genmap_export::available_exports;
use genmap_platforms::{available_applications, TEMPLATE_NAME};

use super::build::BLOB_FILE;

pub fn run() -> Result<()> {
    println!("Architectures:");
    println!("  {TEMPLATE_NAME:<12} clustered TSAR grid with an I/O cluster");
    println!();
    println!("Applications:");
    for app in available_applications() {
        println!("  {:<12} {}", app.name(), app.description());
    }
    println!();
    println!("Artifacts:");
    println!("  {:<12} {BLOB_FILE}", "bin");
    for kind in available_exports() {
        println!("  {:<12} {}", kind.name(), kind.file_name());
    }
    Ok(())
}
