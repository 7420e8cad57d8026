//! `[build]` section configuration.
//!
//! Contains build settings: paths for content, public assets, and output,
//! plus the external bundler invocation.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in lithograph.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// content = "posts"        # Markdown posts directory
/// public = "public"        # Public assets directory
/// output = "dist"          # Output directory
///
/// [build.bundler]
/// command = ["npx", "vite", "build"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Markdown posts source directory.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Public assets directory. Relative preload fetches read from here,
    /// and generated content data is written beneath it.
    #[serde(default = "defaults::build::public")]
    #[educe(Default = defaults::build::public())]
    pub public: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// HTML template file, relative to the output directory (the bundler
    /// writes it there before pages are pre-rendered).
    #[serde(default = "defaults::build::template")]
    #[educe(Default = defaults::build::template())]
    pub template: PathBuf,

    /// Directory name under `public` for generated content data.
    #[serde(default = "defaults::build::generate")]
    #[educe(Default = defaults::build::generate())]
    pub generate: PathBuf,

    /// External bundler configuration.
    #[serde(default)]
    pub bundler: BundlerConfig,
}

/// `[build.bundler]` section - the external bundler command.
///
/// The bundler is an external collaborator: it compiles the hydration
/// bundle and emits the HTML template into the output directory. An empty
/// command list disables the step.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BundlerConfig {
    /// Command line to run, e.g. `["npx", "vite", "build"]`.
    #[serde(default = "defaults::build::bundler::command")]
    #[educe(Default = defaults::build::bundler::command())]
    pub command: Vec<String>,
}
