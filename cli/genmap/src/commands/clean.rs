//! `genmap clean`: remove generated artifacts.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Remove the output directory of the project rooted at `project_dir`.
///
/// Refuses an output directory that is the project itself or one of its
/// ancestors, since removing it would take `genmap.toml` along.
pub fn run(project_dir: &Path, out_dir: &Path) -> Result<()> {
    if !out_dir.exists() {
        println!("Already clean: {} does not exist", out_dir.display());
        return Ok(());
    }

    let out = out_dir
        .canonicalize()
        .with_context(|| format!("resolving {}", out_dir.display()))?;
    let project = project_dir
        .canonicalize()
        .with_context(|| format!("resolving {}", project_dir.display()))?;
    if project.starts_with(&out) {
        bail!(
            "refusing to remove {}: it contains the project directory {}",
            out_dir.display(),
            project_dir.display()
        );
    }

    fs::remove_dir_all(out_dir).with_context(|| format!("removing {}", out_dir.display()))?;
    println!("Removed {}", out_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_removes_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("map.bin"), b"data").unwrap();

        run(dir.path(), &out).unwrap();
        assert!(!out.exists());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn clean_handles_already_clean() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &dir.path().join("out")).unwrap();
    }

    #[test]
    fn clean_refuses_project_dir_and_ancestors() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("project");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("genmap.toml"), "").unwrap();

        for out in [project.join("."), project.join(".."), root.path().to_path_buf()] {
            let err = run(&project, &out).unwrap_err();
            assert!(err.to_string().contains("refusing to remove"), "{err}");
        }
        assert!(project.join("genmap.toml").is_file());
    }
}
