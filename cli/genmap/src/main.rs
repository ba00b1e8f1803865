//! genmap CLI: builds a platform mapping and writes the boot blob and the
//! textual artifacts derived from it.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::build::BuildOptions;
use config::GenmapConfig;

#[derive(Parser)]
#[command(name = "genmap", version, about = "GIET-VM platform descriptor generator")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the platform and write the selected artifacts
    Build {
        /// Configuration file (default: genmap.toml, searched upward)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Artifacts to emit (bin, xml, header, ld, linux-dts, netbsd-dts, arch-info)
        #[arg(long, value_delimiter = ',')]
        emit: Option<Vec<String>>,
        /// Clusters in a row
        #[arg(short = 'x', long)]
        x_size: Option<u32>,
        /// Clusters in a column
        #[arg(short = 'y', long)]
        y_size: Option<u32>,
        /// Processors per cluster
        #[arg(short = 'p', long)]
        nprocs: Option<u32>,
        /// Application to map (repeatable)
        #[arg(long = "app")]
        apps: Vec<String>,
    },
    /// Decode a map.bin file
    Inspect {
        /// Blob to decode
        file: PathBuf,
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List architectures, applications and artifact kinds
    List,
    /// Write a default genmap.toml in the current directory
    Init,
    /// Remove the output directory
    Clean {
        /// Output directory (default: from genmap.toml, else out/)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Build {
            config,
            out,
            emit,
            x_size,
            y_size,
            nprocs,
            apps,
        } => {
            let (config, project_dir) = load_config(&cwd, config.as_deref())?;
            let options = BuildOptions {
                out,
                emit,
                x_size,
                y_size,
                nprocs,
                apps,
            };
            commands::build::run(&project_dir, config, &options)
        }

        Commands::Inspect { file, format } => commands::inspect::run(&file, &format),

        Commands::List => commands::list::run(),

        Commands::Init => commands::init::run(&cwd),

        Commands::Clean { out } => {
            let (config, project_dir) = load_config(&cwd, None)?;
            let out_dir = out.unwrap_or_else(|| project_dir.join(&config.output.dir));
            commands::clean::run(&project_dir, &out_dir)
        }
    }
}

/// Load an explicit configuration file, or search upward from `cwd`.
/// Defaults apply when no file is found.
fn load_config(cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<(GenmapConfig, PathBuf)> {
    if let Some(path) = explicit {
        let config = GenmapConfig::load(path)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);
        return Ok((config, dir));
    }
    match GenmapConfig::find_and_load(cwd)? {
        Some((config, dir)) => Ok((config, dir)),
        None => Ok((GenmapConfig::default(), cwd.to_path_buf())),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Full workflow: init → build → inspect → clean.
    #[test]
    fn init_build_inspect_clean_workflow() {
        let dir = tempfile::tempdir().unwrap();

        commands::init::run(dir.path()).unwrap();
        let (config, project_dir) = load_config(dir.path(), None).unwrap();
        assert_eq!(project_dir, dir.path());

        let options = BuildOptions::default();
        commands::build::run(&project_dir, config, &options).unwrap();
        let out = dir.path().join("out");
        for name in [
            "map.bin",
            "map.xml",
            "hard_config.h",
            "giet_vsegs.ld",
            "linux.dts",
            "netbsd.dts",
            "arch.info",
        ] {
            assert!(out.join(name).is_file(), "{name} missing");
        }

        commands::inspect::run(&out.join("map.bin"), "json").unwrap();

        commands::clean::run(&project_dir, &out).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn clean_keeps_project_when_output_is_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(config::CONFIG_FILE),
            "[output]\ndir = \".\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let (config, project_dir) = load_config(dir.path(), None).unwrap();
        let out_dir = project_dir.join(&config.output.dir);
        assert!(commands::clean::run(&project_dir, &out_dir).is_err());
        assert!(dir.path().join(config::CONFIG_FILE).is_file());
        assert!(dir.path().join("notes.txt").is_file());
    }

    #[test]
    fn explicit_config_sets_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[platform]\nname = \"custom\"\n").unwrap();

        let (config, project_dir) = load_config(Path::new("/"), Some(&path)).unwrap();
        assert_eq!(config.platform.name, "custom");
        assert_eq!(project_dir, dir.path());
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, project_dir) = load_config(dir.path(), None).unwrap();
        assert_eq!(config.platform.x_size, 2);
        assert_eq!(project_dir, dir.path());
    }
}
