pub mod read;
pub mod samples;

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Absolute, canonical directory that every served file must resolve under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDirectory(PathBuf);

impl BaseDirectory {
    /// Create `dir` if missing and canonicalize it.
    pub fn establish(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating base directory {}", dir.display()))?;
        let canon = dunce::canonicalize(dir)
            .with_context(|| format!("canonicalizing base directory {}", dir.display()))?;
        if !canon.is_dir() {
            anyhow::bail!("base directory is not a directory: {}", canon.display());
        }
        Ok(Self(canon))
    }

    /// Take an already-canonical absolute path as-is, without touching disk.
    pub fn assume(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        if !dir.is_absolute() {
            anyhow::bail!("base directory must be absolute: {}", dir.display());
        }
        Ok(Self(dir))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
