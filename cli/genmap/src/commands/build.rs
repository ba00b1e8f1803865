//! `genmap build`: instantiate the platform, map the applications and
//! write every requested artifact.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::info;

use genmap_blob::MapBlob;
use genmap_core::mapping::Mapping;
use genmap_export::{exporter, ExportKind};
use genmap_platforms::{build_platform, AppKind};

use crate::config::GenmapConfig;

/// File name of the binary descriptor.
pub const BLOB_FILE: &str = "map.bin";

/// Command-line overrides of the configuration file.
#[derive(Debug, Default)]
pub struct BuildOptions {
    pub out: Option<PathBuf>,
    pub emit: Option<Vec<String>>,
    pub x_size: Option<u32>,
    pub y_size: Option<u32>,
    pub nprocs: Option<u32>,
    pub apps: Vec<String>,
}

/// An artifact selected with `--emit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Artifact {
    Blob,
    Text(ExportKind),
}

impl Artifact {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "bin" | BLOB_FILE => Ok(Artifact::Blob),
            _ => Ok(Artifact::Text(ExportKind::parse(s)?)),
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            Artifact::Blob => BLOB_FILE,
            Artifact::Text(kind) => kind.file_name(),
        }
    }

    fn render(&self, mapping: &Mapping) -> Result<(Vec<u8>, Vec<String>)> {
        match self {
            Artifact::Blob => Ok((MapBlob::new(mapping).to_bytes()?, Vec::new())),
            Artifact::Text(kind) => {
                let out = exporter(*kind)
                    .export(mapping)
                    .with_context(|| format!("generating {}", kind.file_name()))?;
                Ok((out.text.into_bytes(), out.warnings))
            }
        }
    }
}

/// One written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub path: PathBuf,
    pub size: usize,
    /// Hex SHA-256 of the file content.
    pub digest: String,
    pub warnings: Vec<String>,
}

/// Run the build and print the artifact report.
pub fn run(project_dir: &Path, config: GenmapConfig, options: &BuildOptions) -> Result<()> {
    let reports = build(project_dir, config, options)?;

    println!("{:<16} {:>8}  sha256", "artifact", "bytes");
    for report in &reports {
        let name = report
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("{name:<16} {:>8}  {}", report.size, report.digest);
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
    }
    Ok(())
}

/// Build the mapping and write the artifacts. Every artifact is rendered
/// before the first file is written, so a failure leaves the output
/// directory untouched.
pub fn build(
    project_dir: &Path,
    mut config: GenmapConfig,
    options: &BuildOptions,
) -> Result<Vec<ArtifactReport>> {
    if let Some(x) = options.x_size {
        config.platform.x_size = x;
    }
    if let Some(y) = options.y_size {
        config.platform.y_size = y;
    }
    if let Some(p) = options.nprocs {
        config.platform.nprocs = p;
    }
    let app_names = if options.apps.is_empty() {
        &config.applications.names
    } else {
        &options.apps
    };
    let apps = app_names
        .iter()
        .map(|name| AppKind::parse(name))
        .collect::<Result<Vec<_>, _>>()?;
    let emit = options.emit.as_ref().unwrap_or(&config.output.emit);
    let artifacts = emit
        .iter()
        .map(|name| Artifact::parse(name))
        .collect::<Result<Vec<_>>>()?;

    let mapping = build_platform(&config.platform, &apps).context("building the mapping")?;

    let mut rendered = Vec::with_capacity(artifacts.len());
    for artifact in &artifacts {
        rendered.push((artifact.file_name(), artifact.render(&mapping)?));
    }

    let out_dir = project_dir.join(options.out.as_ref().unwrap_or(&config.output.dir));
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut reports = Vec::with_capacity(rendered.len());
    for (file_name, (bytes, warnings)) in rendered {
        let path = out_dir.join(file_name);
        fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "artifact written");
        reports.push(ArtifactReport {
            path,
            size: bytes.len(),
            digest: hex_digest(&bytes),
            warnings,
        });
    }
    Ok(reports)
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
