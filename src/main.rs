mod config;
mod errors;
mod files;
mod logging;
mod security;
mod server;


use crate::config::Config;
use crate::files::BaseDirectory;
use crate::security::PathGuard;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_CONFIG: &str = "pathguard.toml";

#[derive(Parser)]
#[command(name = "pathguard")]
#[command(about = "File-read endpoint with path containment checks")]
struct Cli {
    /// TOML or JSON config file. `pathguard.toml` is used when present.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    bind: Option<String>,

    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Directory files are served from; created if missing.
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None if std::path::Path::new(DEFAULT_CONFIG).is_file() => {
            Config::load(std::path::Path::new(DEFAULT_CONFIG)).context("loading pathguard.toml")?
        }
        None => Config::default(),
    };
    if let Some(bind) = &cli.bind { cfg.server.bind_addr = bind.clone(); }
    if let Some(port) = cli.port { cfg.server.port = port; }
    if let Some(dir) = &cli.base_dir { cfg.files.base_dir = dir.clone(); }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    cfg.validate().context("validating config")?;

    let base = BaseDirectory::establish(&cfg.files.base_dir)?;
    let guard = PathGuard::new(base, cfg.files.absolute_candidates);

    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);
    info!(addr = %addr, base_dir = %guard.base().display(), absolute_candidates = ?cfg.files.absolute_candidates, "pathguard ready");
    println!("Server listening on http://{addr}");

    server::serve(cfg, guard).await
}
