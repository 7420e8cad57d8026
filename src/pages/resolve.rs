//! Output pathname resolution.
//!
//! A page's unresolved directory path (`/blog/{slug}`) expands into the
//! full set of concrete output pathnames (`/blog/a`, `/blog/b`, ...) by
//! walking parent-first from the site root and expanding every segment
//! that carries placeholders. Sibling and descendant pages recompute the
//! same parent expansions, so results are memoized per unresolved input
//! path for the lifetime of one build.

use super::params::{expand, fill_path_params, segment_params};
use super::{
    PAGES_PREFIX, PageError, PageModule, PageRegistry, join_pathname, terminal_segment,
};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves unresolved directory paths to concrete output pathnames,
/// memoizing per input path. One resolver lives for one build invocation.
pub struct PathResolver<'a> {
    registry: &'a dyn PageRegistry,
    cache: HashMap<String, Arc<[String]>>,
}

impl<'a> PathResolver<'a> {
    pub fn new(registry: &'a dyn PageRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// Resolve every concrete output pathname for an unresolved directory
    /// path. The site root resolves to `["/"]`.
    ///
    /// Resolution is parent-first: each ancestor prefix is resolved (or
    /// served from cache) before its child segment is expanded, so a cached
    /// prefix never re-invokes a page_params hook.
    pub async fn resolve(&mut self, pathname: &str) -> Result<Arc<[String]>> {
        if pathname == "/" {
            return Ok(Arc::from(vec!["/".to_string()]));
        }

        let mut parents: Arc<[String]> = Arc::from(vec!["/".to_string()]);
        let mut prefix = String::new();

        for segment in pathname.trim_matches('/').split('/') {
            prefix.push('/');
            prefix.push_str(segment);

            if let Some(cached) = self.cache.get(&prefix) {
                parents = cached.clone();
                continue;
            }

            let resolved: Arc<[String]> = self
                .resolve_segment(&prefix, segment, &parents)
                .await?
                .into();
            self.cache.insert(prefix.clone(), resolved.clone());
            parents = resolved;
        }

        Ok(parents)
    }

    /// Expand one directory segment against every concrete parent pathname.
    async fn resolve_segment(
        &self,
        pathname: &str,
        basename: &str,
        parents: &[String],
    ) -> Result<Vec<String>> {
        let names = segment_params(basename)?;

        if names.is_empty() {
            return Ok(parents
                .iter()
                .map(|parent| join_pathname(parent, basename))
                .collect());
        }

        let module = self.locate_module(pathname).await?;
        let params_fn = module
            .params_fn()
            .ok_or_else(|| PageError::MissingParamsFn(pathname.to_string()))?;

        let mut result = Vec::new();
        for parent in parents {
            let spec = params_fn.page_params(terminal_segment(parent)).await?;
            let combinations = expand(&spec);

            // Every parent must yield at least one child here; an empty
            // expansion would leave descendants of this directory with no
            // pathname under `parent`.
            if combinations.is_empty() {
                return Err(PageError::NoCombinations(pathname.to_string()).into());
            }

            for name in &names {
                if !combinations[0].contains_key(name) {
                    return Err(PageError::MissingParamKey {
                        page: pathname.to_string(),
                        param: name.clone(),
                    }
                    .into());
                }
            }

            for combination in &combinations {
                result.push(join_pathname(parent, &fill_path_params(basename, combination)));
            }
        }

        Ok(result)
    }

    /// Locate the module backing a parameterized directory by trying the
    /// canonical candidate paths against the registry.
    async fn locate_module(&self, pathname: &str) -> Result<Arc<dyn PageModule>> {
        for ext in self.registry.extensions() {
            let candidates = [
                format!("{PAGES_PREFIX}{pathname}/index.{ext}"),
                format!("{PAGES_PREFIX}{pathname}.{ext}"),
            ];
            for candidate in candidates {
                if let Some(module) = self.registry.load(&candidate).await? {
                    return Ok(module);
                }
            }
        }

        Err(PageError::MissingModule(pathname.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::params::ParamSpec;
    use crate::pages::{ParamsFn, StaticModule, StaticRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn block_on<F: Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    /// Counts hook invocations so memoization is observable.
    struct CountingParams {
        calls: Arc<AtomicUsize>,
        slugs: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl crate::pages::PageParamsFn for CountingParams {
        async fn page_params(&self, _parent: &str) -> anyhow::Result<ParamSpec> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ParamSpec::new().values("slug", self.slugs.clone()))
        }
    }

    fn registry_with_blog(calls: Arc<AtomicUsize>) -> StaticRegistry {
        let mut registry = StaticRegistry::new();
        registry.insert(
            "/pages/blog/{slug}.rs",
            Arc::new(StaticModule::new().with_params(CountingParams {
                calls,
                slugs: vec!["a", "b"],
            })),
        );
        registry
    }

    #[test]
    fn test_resolve_root() {
        let registry = StaticRegistry::new();
        let mut resolver = PathResolver::new(&registry);
        let resolved = block_on(resolver.resolve("/")).unwrap();
        assert_eq!(&*resolved, &["/".to_string()]);
    }

    #[test]
    fn test_resolve_plain_directory() {
        let registry = StaticRegistry::new();
        let mut resolver = PathResolver::new(&registry);
        let resolved = block_on(resolver.resolve("/blog")).unwrap();
        assert_eq!(&*resolved, &["/blog".to_string()]);
    }

    #[test]
    fn test_resolve_parameterized_directory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_blog(calls.clone());
        let mut resolver = PathResolver::new(&registry);

        let resolved = block_on(resolver.resolve("/blog/{slug}")).unwrap();
        assert_eq!(
            &*resolved,
            &["/blog/a".to_string(), "/blog/b".to_string()]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_memoizes_per_input() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_blog(calls.clone());
        let mut resolver = PathResolver::new(&registry);

        let first = block_on(resolver.resolve("/blog/{slug}")).unwrap();
        let second = block_on(resolver.resolve("/blog/{slug}")).unwrap();

        assert_eq!(first, second);
        // The hook ran once; the second resolution was served from cache.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_missing_module_is_fatal() {
        let registry = StaticRegistry::new();
        let mut resolver = PathResolver::new(&registry);

        let err = block_on(resolver.resolve("/blog/{slug}")).unwrap_err();
        assert!(err.to_string().contains("unable to find the page"));
    }

    #[test]
    fn test_resolve_missing_hook_is_fatal() {
        let mut registry = StaticRegistry::new();
        registry.insert("/pages/blog/{slug}.rs", Arc::new(StaticModule::new()));
        let mut resolver = PathResolver::new(&registry);

        let err = block_on(resolver.resolve("/blog/{slug}")).unwrap_err();
        assert!(err.to_string().contains("page_params"));
    }

    #[test]
    fn test_resolve_empty_expansion_is_fatal() {
        let mut registry = StaticRegistry::new();
        registry.insert(
            "/pages/blog/{slug}.rs",
            Arc::new(
                StaticModule::new()
                    .with_params(ParamsFn(|_: &str| Ok(ParamSpec::new()))),
            ),
        );
        let mut resolver = PathResolver::new(&registry);

        let err = block_on(resolver.resolve("/blog/{slug}")).unwrap_err();
        assert!(err.to_string().contains("satisfies all parameters"));
    }

    #[test]
    fn test_resolve_missing_param_key_is_fatal() {
        let mut registry = StaticRegistry::new();
        registry.insert(
            "/pages/blog/{slug}.rs",
            Arc::new(StaticModule::new().with_params(ParamsFn(|_: &str| {
                Ok(ParamSpec::new().values("other", ["x"]))
            }))),
        );
        let mut resolver = PathResolver::new(&registry);

        let err = block_on(resolver.resolve("/blog/{slug}")).unwrap_err();
        assert!(err.to_string().contains("parameter 'slug'"));
    }

    #[test]
    fn test_resolve_index_module_candidate() {
        // The module may live at `{dir}/index.rs` instead of `{dir}.rs`.
        let mut registry = StaticRegistry::new();
        registry.insert(
            "/pages/blog/{slug}/index.rs",
            Arc::new(
                StaticModule::new()
                    .with_params(ParamsFn(|_: &str| Ok(ParamSpec::new().values("slug", ["x"])))),
            ),
        );
        let mut resolver = PathResolver::new(&registry);

        let resolved = block_on(resolver.resolve("/blog/{slug}")).unwrap();
        assert_eq!(&*resolved, &["/blog/x".to_string()]);
    }

    #[test]
    fn test_resolve_nested_parent_dependent_params() {
        // /docs/{chapter}/{section}: sections depend on which chapter they
        // nest under.
        let mut registry = StaticRegistry::new();
        registry.insert(
            "/pages/docs/{chapter}.rs",
            Arc::new(StaticModule::new().with_params(ParamsFn(|_: &str| {
                Ok(ParamSpec::new().values("chapter", ["intro", "api"]))
            }))),
        );
        registry.insert(
            "/pages/docs/{chapter}/{section}.rs",
            Arc::new(StaticModule::new().with_params(ParamsFn(|chapter: &str| {
                let sections = if chapter == "intro" {
                    vec!["install"]
                } else {
                    vec!["types", "traits"]
                };
                Ok(ParamSpec::new().values("section", sections))
            }))),
        );
        let mut resolver = PathResolver::new(&registry);

        let resolved = block_on(resolver.resolve("/docs/{chapter}/{section}")).unwrap();
        assert_eq!(
            &*resolved,
            &[
                "/docs/intro/install".to_string(),
                "/docs/api/types".to_string(),
                "/docs/api/traits".to_string(),
            ]
        );
    }
}
