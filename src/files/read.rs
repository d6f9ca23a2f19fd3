use crate::{
    errors::{AppError, AppResult},
    security::{DecodeAnomaly, PathGuard},
};
use base64::Engine;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Utf8,
    Base64,
}

#[derive(Debug)]
pub struct FileContents {
    pub path: PathBuf,
    pub content: String,
    pub encoding: Encoding,
    pub anomaly: Option<DecodeAnomaly>,
}

/// Read `filename` from under the guard's base directory. Nothing is touched
/// on disk until the containment check has passed.
pub async fn read_contained(guard: &PathGuard, filename: &str) -> AppResult<FileContents> {
    let resolved = guard.check(filename)?;

    match tokio::fs::metadata(&resolved.path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(AppError::NotFound),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(AppError::Internal(e.to_string())),
    }

    let data = tokio::fs::read(&resolved.path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound { AppError::NotFound } else { AppError::Internal(e.to_string()) }
    })?;
    let (content, encoding) = match String::from_utf8(data) {
        Ok(text) => (text, Encoding::Utf8),
        Err(e) => (
            base64::engine::general_purpose::STANDARD.encode(e.into_bytes()),
            Encoding::Base64,
        ),
    };

    Ok(FileContents {
        path: resolved.path,
        content,
        encoding,
        anomaly: resolved.anomaly,
    })
}
