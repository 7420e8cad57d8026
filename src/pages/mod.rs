//! Page modules and the registry seam.
//!
//! The bundler collaborator exposes the site's pages as a registry: a
//! mapping from canonical module path (rooted at `/pages`) to a lazily
//! loaded [`PageModule`]. The core never assumes a concrete module-loading
//! mechanism, only that lookups are idempotent and cacheable.
//!
//! - **params**: placeholder parsing and combination expansion
//! - **resolve**: memoized output-pathname resolution

pub mod params;
pub mod resolve;

use crate::render::Component;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use params::ParamSpec;

/// Prefix all canonical module paths are rooted at.
pub const PAGES_PREFIX: &str = "/pages";

/// Configuration and resolution errors for page modules.
///
/// All of these abort the build; they indicate an inconsistency between a
/// page's path placeholders and the parameters its module provides.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid filename {0}: brackets do not match")]
    UnmatchedBracket(String),

    #[error("unable to find the page corresponding to the directory '{0}' containing parameters")]
    MissingModule(String),

    #[error("page '{0}' has parameters but does not provide a page_params hook")]
    MissingParamsFn(String),

    #[error("unable to create the directory {0} that satisfies all parameters")]
    NoCombinations(String),

    #[error("the page_params hook of page '{page}' does not return the values of parameter '{param}'")]
    MissingParamKey { page: String, param: String },
}

// ============================================================================
// Seams
// ============================================================================

/// The page registry provided by the bundler collaborator.
#[async_trait]
pub trait PageRegistry: Send + Sync {
    /// All canonical module paths, rooted at [`PAGES_PREFIX`].
    fn module_paths(&self) -> Vec<String>;

    /// Load a module by canonical path. Lookups are idempotent;
    /// implementations cache the loaded module.
    async fn load(&self, module_path: &str) -> Result<Option<Arc<dyn PageModule>>>;

    /// File extensions tried when locating the module behind a
    /// parameterized directory.
    fn extensions(&self) -> &[&str] {
        &["rs"]
    }
}

/// One page module: a renderable component plus optional parameter logic.
pub trait PageModule: Send + Sync {
    /// The page component, if the module exports one. Modules without a
    /// component are skipped by the build.
    fn component(&self) -> Option<Arc<dyn Component>>;

    /// The parameter hook, if the module exports one. Required whenever the
    /// module's path carries placeholders.
    fn params_fn(&self) -> Option<&dyn PageParamsFn> {
        None
    }
}

/// Parameter-producing capability of a page module.
#[async_trait]
pub trait PageParamsFn: Send + Sync {
    /// Produce the parameter spec for one concrete parent segment value.
    async fn page_params(&self, parent: &str) -> Result<ParamSpec>;
}

/// Adapter implementing [`PageParamsFn`] for synchronous closures.
pub struct ParamsFn<F>(pub F);

#[async_trait]
impl<F> PageParamsFn for ParamsFn<F>
where
    F: Fn(&str) -> Result<ParamSpec> + Send + Sync,
{
    async fn page_params(&self, parent: &str) -> Result<ParamSpec> {
        (self.0)(parent)
    }
}

// ============================================================================
// In-memory registry
// ============================================================================

/// A registry backed by a map, for site binaries and tests.
#[derive(Default)]
pub struct StaticRegistry {
    modules: BTreeMap<String, Arc<dyn PageModule>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its canonical path.
    pub fn insert(&mut self, module_path: impl Into<String>, module: Arc<dyn PageModule>) {
        self.modules.insert(module_path.into(), module);
    }
}

#[async_trait]
impl PageRegistry for StaticRegistry {
    fn module_paths(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    async fn load(&self, module_path: &str) -> Result<Option<Arc<dyn PageModule>>> {
        Ok(self.modules.get(module_path).cloned())
    }
}

/// A [`PageModule`] assembled from parts, for site binaries and tests.
#[derive(Default)]
pub struct StaticModule {
    component: Option<Arc<dyn Component>>,
    params: Option<Box<dyn PageParamsFn>>,
}

impl StaticModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, component: Arc<dyn Component>) -> Self {
        self.component = Some(component);
        self
    }

    pub fn with_params(mut self, params: impl PageParamsFn + 'static) -> Self {
        self.params = Some(Box::new(params));
        self
    }
}

impl PageModule for StaticModule {
    fn component(&self) -> Option<Arc<dyn Component>> {
        self.component.clone()
    }

    fn params_fn(&self) -> Option<&dyn PageParamsFn> {
        self.params.as_deref()
    }
}

// ============================================================================
// Pathname helpers
// ============================================================================

/// Map a canonical module path to its site pathname.
///
/// `/pages/blog/{slug}.rs` becomes `/blog/{slug}.rs`; the extension rides
/// along until output-file derivation strips it.
pub fn site_pathname(module_path: &str) -> Result<String> {
    let stripped = module_path
        .strip_prefix(PAGES_PREFIX)
        .filter(|rest| rest.starts_with('/'))
        .ok_or_else(|| {
            anyhow::anyhow!("module path `{module_path}` is not rooted at {PAGES_PREFIX}")
        })?;
    Ok(stripped.to_string())
}

/// Parent of a site pathname; the parent of a top-level entry is `/`.
pub fn parent_pathname(pathname: &str) -> &str {
    match pathname.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &pathname[..idx],
    }
}

/// Terminal segment of a site pathname; empty for the root.
pub fn terminal_segment(pathname: &str) -> &str {
    pathname.rsplit('/').next().unwrap_or_default()
}

/// Join a parent pathname with a child segment.
pub fn join_pathname(parent: &str, basename: &str) -> String {
    if parent == "/" {
        format!("/{basename}")
    } else {
        format!("{parent}/{basename}")
    }
}

/// Derive the output file path for a resolved pathname.
///
/// `index` maps to `<dir>/index.html`, a leading underscore maps to a flat
/// `<dir>/<name>.html`, anything else to `<dir>/<name>/index.html`.
pub fn output_file_path(output_root: &Path, pathname: &str) -> PathBuf {
    let joined = output_root.join(pathname.trim_start_matches('/'));
    let stem = joined
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_string();
    let dir = joined.parent().unwrap_or(output_root).to_path_buf();

    if stem == "index" {
        dir.join("index.html")
    } else if let Some(flat) = stem.strip_prefix('_') {
        dir.join(format!("{flat}.html"))
    } else {
        dir.join(stem).join("index.html")
    }
}
