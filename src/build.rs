//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── generate()           Content data files under <public>/generate/
//!     │
//!     ├── run_bundler()        External bundler emits the template and the
//!     │                        hydration bundle into the output directory
//!     │
//!     └── build_static_pages() One module at a time: resolve every concrete
//!                              output pathname, render each instance twice,
//!                              splice it into the template, write the file
//! ```
//!
//! Pages are processed strictly one at a time; within a page, parent
//! pathnames and parameter combinations are processed in nested order.
//! Suspension happens only at I/O boundaries (module loads, preload
//! fetches, file writes).

use crate::config::SiteConfig;
use crate::generate;
use crate::log;
use crate::pages::params::{ParamMap, expand, fill_path_params, segment_params};
use crate::pages::resolve::PathResolver;
use crate::pages::{
    PageError, PageRegistry, join_pathname, parent_pathname, site_pathname, terminal_segment,
};
use crate::render::PageRenderer;
use crate::utils::exec::run_command;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Build the entire site: content data, bundle, then pre-rendered pages.
pub async fn build_site(config: &SiteConfig, registry: &dyn PageRegistry) -> Result<()> {
    generate::generate(config)?;
    run_bundler(config)?;

    let count = build_static_pages(config, registry).await?;
    log!("build"; "{count} pages rendered");

    log_build_result(&config.build.output);
    Ok(())
}

/// Run the configured bundler command, if any.
fn run_bundler(config: &SiteConfig) -> Result<()> {
    let command = &config.build.bundler.command;
    if command.is_empty() || config.skip_bundle() {
        return Ok(());
    }

    log!("bundle"; "{}", command.join(" "));
    run_command(command, config.get_root()).context("bundler failed")
}

/// Pre-render every page module in the registry.
///
/// Module paths are processed in sorted order so repeated builds against an
/// unchanged registry produce byte-identical output.
async fn build_static_pages(config: &SiteConfig, registry: &dyn PageRegistry) -> Result<usize> {
    let mut module_paths = registry.module_paths();
    if module_paths.is_empty() {
        log!("build"; "no page modules registered");
        return Ok(0);
    }
    module_paths.sort();

    let renderer = PageRenderer::new(config)?;
    let mut resolver = PathResolver::new(registry);

    let mut count = 0;
    for module_path in &module_paths {
        count += build_page(registry, &mut resolver, &renderer, module_path)
            .await
            .with_context(|| format!("building page module {module_path}"))?;
    }

    Ok(count)
}

/// Render every concrete instance of one page module.
async fn build_page(
    registry: &dyn PageRegistry,
    resolver: &mut PathResolver<'_>,
    renderer: &PageRenderer<'_>,
    module_path: &str,
) -> Result<usize> {
    let Some(module) = registry.load(module_path).await? else {
        return Ok(0);
    };
    let Some(component) = module.component() else {
        return Ok(0);
    };

    let pathname = site_pathname(module_path)?;
    let basename = terminal_segment(&pathname).to_string();
    let parents = resolver.resolve(parent_pathname(&pathname)).await?;

    let names = segment_params(&basename)?;
    let mut count = 0;

    if names.is_empty() {
        for parent in parents.iter() {
            let instance = join_pathname(parent, &basename);
            renderer
                .render_page(&instance, component.as_ref(), &ParamMap::new())
                .await?;
            count += 1;
        }
        return Ok(count);
    }

    let params_fn = module
        .params_fn()
        .ok_or_else(|| PageError::MissingParamsFn(pathname.clone()))?;

    for parent in parents.iter() {
        let spec = params_fn.page_params(terminal_segment(parent)).await?;
        let combinations = expand(&spec);

        // This parent has no applicable instance of the page; unlike an
        // intermediate directory, that is not structural, so move on.
        if combinations.is_empty() {
            continue;
        }

        for name in &names {
            if !combinations[0].contains_key(name) {
                return Err(PageError::MissingParamKey {
                    page: pathname.clone(),
                    param: name.clone(),
                }
                .into());
            }
        }

        for combination in &combinations {
            let instance = join_pathname(parent, &fill_path_params(&basename, combination));
            renderer
                .render_page(&instance, component.as_ref(), combination)
                .await?;
            count += 1;
        }
    }

    Ok(count)
}

/// Log build result based on output directory contents
fn log_build_result(output: &Path) {
    let file_count = fs::read_dir(output)
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0);

    if file_count == 0 {
        log!("warn"; "output is empty, check if any page modules are registered");
    } else {
        log!("build"; "done");
    }
}
