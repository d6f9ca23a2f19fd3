//! Path containment checks for client-supplied file names.
//!
//! A candidate goes through four stages, in this order: percent-decoding,
//! control-byte rejection, structural resolution against the base, and the
//! containment test. Decoding always runs first so that encoded traversal
//! sequences are seen by every later stage.

use crate::files::BaseDirectory;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// How a candidate carrying a root or drive marker is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsoluteCandidates {
    /// Refuse the candidate as a traversal attempt.
    #[default]
    Reject,
    /// Drop the root marker and resolve the rest under the base.
    Strip,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("null byte not allowed")]
    NullByte,
    #[error("path traversal detected: {} is outside the base directory", .resolved.display())]
    TraversalEscape { resolved: PathBuf },
}

/// Percent-decoding failed and the raw candidate was used instead.
/// Not a rejection on its own; the structural stages still run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeAnomaly {
    /// `%` at `offset` is not followed by two hex digits.
    MalformedEscape { offset: usize },
    /// The decoded octets are not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for DecodeAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeAnomaly::MalformedEscape { offset } => {
                write!(f, "malformed percent escape at byte {offset}")
            }
            DecodeAnomaly::InvalidUtf8 => write!(f, "decoded bytes are not valid utf-8"),
        }
    }
}

#[derive(Debug)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    pub anomaly: Option<DecodeAnomaly>,
}

/// Outcome of a successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    pub anomaly: Option<DecodeAnomaly>,
}

/// Decode percent escapes once. Falls back to `raw` when decoding fails.
pub fn decode_candidate(raw: &str) -> Decoded<'_> {
    let bytes = raw.as_bytes();
    for (offset, b) in bytes.iter().enumerate() {
        if *b != b'%' {
            continue;
        }
        let well_formed = bytes
            .get(offset + 1..offset + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Decoded {
                text: Cow::Borrowed(raw),
                anomaly: Some(DecodeAnomaly::MalformedEscape { offset }),
            };
        }
    }
    match percent_decode_str(raw).decode_utf8() {
        Ok(text) => Decoded { text, anomaly: None },
        Err(_) => Decoded {
            text: Cow::Borrowed(raw),
            anomaly: Some(DecodeAnomaly::InvalidUtf8),
        },
    }
}

pub fn reject_control_bytes(candidate: &str) -> Result<(), Rejection> {
    if candidate.contains('\0') {
        return Err(Rejection::NullByte);
    }
    Ok(())
}

fn has_root_marker(candidate: &Path) -> bool {
    candidate
        .components()
        .next()
        .is_some_and(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
}

/// Join `candidate` onto `base` and collapse `.` and `..` over components.
/// Root and drive markers in `candidate` are dropped, never allowed to replace
/// `base`.
pub fn resolve_under(base: &Path, candidate: &Path) -> PathBuf {
    let mut resolved = base.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(segment) => resolved.push(segment),
            Component::ParentDir => {
                // stays at "/" once the root is reached
                resolved.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    resolved
}

/// `resolved` must be `base` or lie below it. Comparison is per component, so
/// `/data/files-evil` is not inside `/data/files`.
pub fn ensure_contained(base: &Path, resolved: &Path) -> Result<(), Rejection> {
    if resolved.starts_with(base) {
        Ok(())
    } else {
        Err(Rejection::TraversalEscape {
            resolved: resolved.to_path_buf(),
        })
    }
}

/// Resolves untrusted file names under a fixed base directory.
#[derive(Debug, Clone)]
pub struct PathGuard {
    base: BaseDirectory,
    absolute: AbsoluteCandidates,
}

impl PathGuard {
    pub fn new(base: BaseDirectory, absolute: AbsoluteCandidates) -> Self {
        Self { base, absolute }
    }

    pub fn base(&self) -> &Path {
        self.base.path()
    }

    pub fn check(&self, candidate: &str) -> Result<Resolved, Rejection> {
        let decoded = decode_candidate(candidate);
        reject_control_bytes(&decoded.text)?;

        let relative = Path::new(decoded.text.as_ref());
        if self.absolute == AbsoluteCandidates::Reject && has_root_marker(relative) {
            return Err(Rejection::TraversalEscape {
                resolved: resolve_under(Path::new("/"), relative),
            });
        }

        let resolved = resolve_under(self.base(), relative);
        ensure_contained(self.base(), &resolved)?;
        Ok(Resolved {
            path: resolved,
            anomaly: decoded.anomaly,
        })
    }
}
