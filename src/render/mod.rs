//! Page rendering.
//!
//! Every concrete page instance renders twice. The **discovery pass** runs
//! the component with no data available; its only effect is to populate the
//! render context with the preload requests the page needs. The collected
//! requests are then resolved one by one, and the **finalization pass**
//! re-renders with the data map filled in. The finalization markup is
//! spliced into the shared template and written out.
//!
//! The render context is an explicit per-page object: it is created before
//! the discovery pass, drained after it, and never shared across pages, so
//! no global collector state exists.

pub mod template;

use crate::config::SiteConfig;
use crate::fetch::{FetchInit, FetchResponse, Fetcher};
use crate::pages::params::ParamMap;
use crate::pages::output_file_path;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::sync::Arc;

pub use template::{DATA_SCRIPT_ID, DataMap, MOUNT_ID};

/// Converts a fully-read response into the page data value stored under the
/// request's identifier.
pub type Transform = Arc<dyn Fn(FetchResponse) -> Result<Value> + Send + Sync>;

/// One data fetch declared during a discovery pass.
#[derive(Clone)]
pub struct PreloadRequest {
    /// Absolute URL or site-relative public asset path.
    pub target: String,
    /// Request options (method, headers, body).
    pub init: FetchInit,
    /// Response-to-data conversion.
    pub transform: Transform,
}

impl PreloadRequest {
    /// A GET request whose response is parsed as JSON.
    pub fn json(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            init: FetchInit::default(),
            transform: Arc::new(|response| response.json()),
        }
    }

    /// A GET request whose response is kept as a text value.
    pub fn text(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            init: FetchInit::default(),
            transform: Arc::new(|response| Ok(Value::String(response.text()?.to_string()))),
        }
    }
}

/// A renderable page component.
///
/// Components read path parameters and preloaded data from the context and
/// declare their data requirements on it during the discovery pass.
pub trait Component: Send + Sync {
    fn render(&self, ctx: &mut RenderContext) -> Result<String>;
}

/// Per-page rendering state: the concrete pathname, the filled path
/// parameters, the resolved data (finalization pass only), and the preload
/// collector (read after the discovery pass).
pub struct RenderContext<'a> {
    pathname: &'a str,
    params: &'a ParamMap,
    data: Option<&'a DataMap>,
    preloads: Vec<(String, PreloadRequest)>,
}

impl<'a> RenderContext<'a> {
    /// Context for the discovery pass: no data, empty collector.
    pub fn discovery(pathname: &'a str, params: &'a ParamMap) -> Self {
        Self {
            pathname,
            params,
            data: None,
            preloads: Vec::new(),
        }
    }

    /// Context for the finalization pass, with the resolved data map.
    pub fn finalization(pathname: &'a str, params: &'a ParamMap, data: &'a DataMap) -> Self {
        Self {
            pathname,
            params,
            data: Some(data),
            preloads: Vec::new(),
        }
    }

    /// The concrete output pathname being rendered.
    pub fn pathname(&self) -> &str {
        self.pathname
    }

    /// All filled path parameters for this page instance.
    pub fn params(&self) -> &ParamMap {
        self.params
    }

    /// One filled path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// True during the discovery pass, before data is available.
    pub fn is_discovery(&self) -> bool {
        self.data.is_none()
    }

    /// Declare a data requirement under `id`.
    ///
    /// Recording the same identifier twice keeps the first position and
    /// replaces the request, so a component rendered repeatedly within one
    /// pass still yields one fetch.
    pub fn preload(&mut self, id: impl Into<String>, request: PreloadRequest) {
        let id = id.into();
        match self.preloads.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, existing)) => *existing = request,
            None => self.preloads.push((id, request)),
        }
    }

    /// Resolved data for `id`; `None` during the discovery pass.
    pub fn data(&self, id: &str) -> Option<&Value> {
        self.data.and_then(|data| data.get(id))
    }

    /// Drain the collected requests, in collection order.
    fn into_preloads(self) -> Vec<(String, PreloadRequest)> {
        self.preloads
    }
}

/// Renders concrete page instances into output files.
pub struct PageRenderer<'a> {
    config: &'a SiteConfig,
    fetcher: Fetcher,
    template: String,
}

impl<'a> PageRenderer<'a> {
    /// Load the shared template and set up the fetch seam.
    pub fn new(config: &'a SiteConfig) -> Result<Self> {
        let template_path = config.template_path();
        let template = fs::read_to_string(&template_path)
            .with_context(|| format!("reading template {}", template_path.display()))?;

        Ok(Self {
            config,
            fetcher: Fetcher::new(config.build.public.clone()),
            template,
        })
    }

    /// Render one concrete page instance and write its output file.
    pub async fn render_page(
        &self,
        pathname: &str,
        component: &dyn Component,
        params: &ParamMap,
    ) -> Result<()> {
        // Discovery pass: output discarded, collector populated.
        let mut ctx = RenderContext::discovery(pathname, params);
        component
            .render(&mut ctx)
            .with_context(|| format!("discovery render of {pathname}"))?;
        let requests = ctx.into_preloads();

        // Resolve every collected request before the next pass, in order.
        let mut data = DataMap::new();
        for (id, request) in requests {
            let response = self
                .fetcher
                .fetch(&request.target, &request.init)
                .await
                .with_context(|| format!("preload '{id}' of page {pathname}"))?;
            let value = (request.transform)(response)
                .with_context(|| format!("transforming preload '{id}' of page {pathname}"))?;
            data.insert(id, value);
        }

        // Finalization pass: this markup is the one that ships.
        let mut ctx = RenderContext::finalization(pathname, params, &data);
        let markup = component
            .render(&mut ctx)
            .with_context(|| format!("finalization render of {pathname}"))?;

        let html = template::splice(&self.template, &markup, &data)
            .with_context(|| format!("splicing {pathname} into the template"))?;
        let out_path = output_file_path(&self.config.build.output, pathname);
        template::write_page(&self.config.build.output, &out_path, &html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_discovery_has_no_data() {
        let params = ParamMap::new();
        let ctx = RenderContext::discovery("/blog/a", &params);
        assert!(ctx.is_discovery());
        assert!(ctx.data("posts").is_none());
        assert_eq!(ctx.pathname(), "/blog/a");
    }

    #[test]
    fn test_context_finalization_exposes_data() {
        let params = ParamMap::from([("slug".to_string(), "a".to_string())]);
        let mut data = DataMap::new();
        data.insert("posts".into(), json!([1, 2]));

        let ctx = RenderContext::finalization("/blog/a", &params, &data);
        assert!(!ctx.is_discovery());
        assert_eq!(ctx.param("slug"), Some("a"));
        assert_eq!(ctx.data("posts"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_preload_collects_in_order() {
        let params = ParamMap::new();
        let mut ctx = RenderContext::discovery("/", &params);
        ctx.preload("b", PreloadRequest::json("/b.json"));
        ctx.preload("a", PreloadRequest::json("/a.json"));

        let collected = ctx.into_preloads();
        let ids: Vec<_> = collected.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_preload_same_id_replaces_in_place() {
        let params = ParamMap::new();
        let mut ctx = RenderContext::discovery("/", &params);
        ctx.preload("posts", PreloadRequest::json("/one.json"));
        ctx.preload("other", PreloadRequest::json("/other.json"));
        ctx.preload("posts", PreloadRequest::json("/two.json"));

        let collected = ctx.into_preloads();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].0, "posts");
        assert_eq!(collected[0].1.target, "/two.json");
        assert_eq!(collected[1].0, "other");
    }
}
