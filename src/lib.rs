//! # Lithograph
//!
//! A static site generator with data-driven pre-rendering: every page
//! renders twice, so the data it fetches ships inside the HTML.
//!
//! # Architecture
//!
//! The build pipeline has three stages:
//!
//! ```text
//! 1. Generate   posts/        →  public/generate/   (content → JSON data)
//! 2. Bundle     (external)    →  dist/index.html    (template + hydration bundle)
//! 3. Pre-render page registry →  dist/**/index.html (one file per page instance)
//! ```
//!
//! Stage 3 is the core. For every page module it resolves the set of
//! concrete output pathnames, expanding `{placeholder}` segments through
//! the module's parameter hook, parent directory first, with per-path
//! memoization. Each instance then renders twice: a discovery pass that
//! collects the page's preload requests, and a finalization pass with the
//! fetched data injected. The markup and serialized data are spliced into
//! the shared template and written out.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pages`] | Registry seams, placeholder parsing, parameter expansion, output-path resolution |
//! | [`render`] | Dual-pass renderer, render context, template splicing |
//! | [`generate`] | Content pipeline: front matter, post ordering, chunked JSON data |
//! | [`fetch`] | Preload resolution: network for absolute URLs, public assets for relative paths |
//! | [`build`] | Orchestration of the three stages |
//! | [`config`] | `lithograph.toml` loading, CLI merging, validation |
//! | [`cli`] | clap argument definitions |
//!
//! # Embedding
//!
//! The page registry is produced by the bundler collaborator, so site
//! binaries embed lithograph and hand [`run`] their registry:
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     lithograph::run(&my_site::pages())
//! }
//! ```
//!
//! The build runs on a current-thread runtime: pages render strictly one
//! at a time, suspending only at I/O boundaries.

pub mod build;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod generate;
pub mod logger;
pub mod pages;
pub mod render;
pub mod utils;

use anyhow::{Result, bail};
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use pages::PageRegistry;
use std::path::Path;

/// Parse the CLI, load the config, and run the requested command against
/// the given page registry.
///
/// The stock `lithograph` binary passes an empty registry; site binaries
/// pass the registry their bundler produced.
pub fn run(registry: &dyn PageRegistry) -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(load_config(cli)?));

    match &cli.command {
        Commands::Generate => generate::generate(config),
        Commands::Build { .. } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(build::build_site(config, registry))
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    if !config_path.exists() {
        bail!("Config file not found.");
    }

    let mut config = SiteConfig::from_path(&config_path)?;
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
