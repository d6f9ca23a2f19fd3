use crate::{
    errors::{AppError, AppResult},
    security::PathGuard,
};
use std::path::PathBuf;

pub const SAMPLES: &[(&str, &str)] = &[
    ("hello.txt", "Hello from safe file!\n"),
    ("notes/readme.md", "# Readme\nSample readme file"),
];

/// Write the demo files under the base directory, overwriting existing ones.
pub async fn write_samples(guard: &PathGuard) -> AppResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(SAMPLES.len());
    for (name, content) in SAMPLES {
        let target = guard.check(name)?.path;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| AppError::Internal(e.to_string()))?;
        }
        tokio::fs::write(&target, content).await.map_err(|e| AppError::Internal(e.to_string()))?;
        tracing::debug!(path = %target.display(), "sample written");
        written.push(target);
    }
    Ok(written)
}
