use crate::security::AbsoluteCandidates;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub files: Files,
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}
fn default_bind_addr() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }

impl Default for Server {
    fn default() -> Self { Self { bind_addr: default_bind_addr(), port: default_port() } }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Files {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default)]
    pub absolute_candidates: AbsoluteCandidates,
}
fn default_base_dir() -> PathBuf { PathBuf::from("files") }

impl Default for Files {
    fn default() -> Self { Self { base_dir: default_base_dir(), absolute_candidates: AbsoluteCandidates::default() } }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Limits {
    #[serde(default = "default_max_request_kb")]
    pub max_request_kb: usize,
}
fn default_max_request_kb() -> usize { 64 }

impl Default for Limits {
    fn default() -> Self { Self { max_request_kb: default_max_request_kb() } }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw, path.extension().map(|e| e == "json").unwrap_or(false))
    }

    pub fn parse(raw: &str, json: bool) -> anyhow::Result<Self> {
        if json {
            Ok(serde_json::from_str(raw)?)
        } else {
            Ok(toml::from_str(raw)?)
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.files.base_dir.as_os_str().is_empty() { anyhow::bail!("base_dir must not be empty"); }
        if self.server.bind_addr.trim().is_empty() { anyhow::bail!("bind_addr must not be empty"); }
        if self.limits.max_request_kb == 0 { anyhow::bail!("max_request_kb must be > 0"); }
        Ok(())
    }
}
