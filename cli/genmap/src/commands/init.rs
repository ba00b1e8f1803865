//! `genmap init`: write a default configuration file.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config::{GenmapConfig, CONFIG_FILE};

/// Create `genmap.toml` in `dir`.
pub fn run(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    fs::write(&path, GenmapConfig::template())
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}
