//! `genmap.toml` parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use genmap_platforms::ArchConfig;

/// Name of the configuration file searched for by every command.
pub const CONFIG_FILE: &str = "genmap.toml";

/// The top-level configuration of a genmap project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenmapConfig {
    /// Architecture template knobs.
    #[serde(default)]
    pub platform: ArchConfig,
    #[serde(default)]
    pub applications: ApplicationsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Applications mapped on the platform, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationsConfig {
    #[serde(default)]
    pub names: Vec<String>,
}

impl Default for ApplicationsConfig {
    fn default() -> Self {
        Self {
            names: vec!["shell".to_string()],
        }
    }
}

/// Where artifacts go and which ones are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_out_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_emit")]
    pub emit: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_out_dir(),
            emit: default_emit(),
        }
    }
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_emit() -> Vec<String> {
    [
        "bin",
        "xml",
        "header",
        "ld",
        "linux-dts",
        "netbsd-dts",
        "arch-info",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl GenmapConfig {
    /// Read and parse one configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Search upward from `start_dir` for a `genmap.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Default configuration file written by `genmap init`.
    pub fn template() -> String {
        r#"[platform]
name = "tsar"
x-size = 2
y-size = 2
nprocs = 4
ram-size = 0x4000000
ioc = "BDV"
use-ramdisk = false
nb-ttys = 1

[applications]
names = ["shell", "sort"]

[output]
dir = "out"
emit = ["bin", "xml", "header", "ld", "linux-dts", "netbsd-dts", "arch-info"]
"#
        .to_string()
    }
}
