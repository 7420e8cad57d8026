//! Command-line entry point.
//!
//! Site crates embed lithograph as a library and call [`lithograph::run`]
//! with the page registry their bundler produced. The stock binary drives
//! the content pipeline and the bundler with no pages registered.

use lithograph::pages::StaticRegistry;

fn main() -> anyhow::Result<()> {
    lithograph::run(&StaticRegistry::new())
}
