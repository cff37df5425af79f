use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::config::DirectoryConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub db_path: PathBuf,
}

pub fn ensure_directories(cfg: &DirectoryConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(Path::new(&cfg.logs_dir))?;
    let data_dir = ensure_dir(Path::new(&cfg.data_dir))?;
    ensure_writable(&data_dir)?;

    Ok(ResolvedPaths {
        logs_dir,
        db_path: data_dir.join(&cfg.db_filename),
    })
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;
    Ok(dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()))
}

fn ensure_writable(dir: &Path) -> Result<()> {
    let marker = dir.join(".write-test");
    fs::write(&marker, b"ok")
        .with_context(|| format!("data directory {} is not writable", dir.display()))?;
    fs::remove_file(&marker)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_directories() {
        let root = std::env::temp_dir().join(format!("safesurf-dirs-{}", std::process::id()));
        let cfg = DirectoryConfig {
            logs_dir: root.join("logs").display().to_string(),
            data_dir: root.join("state/data").display().to_string(),
            db_filename: "guard.db".into(),
        };

        let paths = ensure_directories(&cfg).unwrap();
        assert!(paths.logs_dir.is_dir());
        assert!(paths.db_path.ends_with("guard.db"));
        assert!(paths.db_path.parent().unwrap().is_dir());

        fs::remove_dir_all(&root).unwrap();
    }
}
