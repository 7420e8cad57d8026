//! Content data generation.
//!
//! Produces the JSON data files the page bundle fetches at render time:
//! the client-visible site config, a paginated post index, and the raw
//! posts themselves. Everything lands under `<public>/generate/`, which is
//! recreated from scratch on every run.

use crate::config::{BaseConfig, PostsConfig, SiteConfig};
use crate::log;
use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// One post, as exposed to the page bundle.
#[derive(Debug, Clone, Serialize)]
pub struct PostInfo {
    pub filename: String,
    pub metadata: BTreeMap<String, toml::Value>,
    pub synopsis: String,
}

/// The slice of the site config the client bundle may see.
#[derive(Serialize)]
struct ClientConfig<'a> {
    base: &'a BaseConfig,
    posts: &'a PostsConfig,
    extra: &'a HashMap<String, toml::Value>,
}

#[derive(Serialize)]
struct PostsIndex {
    num_pages: usize,
}

/// Regenerate `<public>/generate/` from the posts directory.
pub fn generate(config: &SiteConfig) -> Result<()> {
    let generate_dir = config.generate_dir();
    let data_dir = generate_dir.join("data");

    if generate_dir.exists() {
        fs::remove_dir_all(&generate_dir).with_context(|| {
            format!("clearing generate directory {}", generate_dir.display())
        })?;
    }
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;

    log!("generate"; "writing site config");
    write_client_config(config, &generate_dir)?;

    log!("generate"; "collecting posts");
    let posts = collect_posts(config)?;
    write_post_data(config, &data_dir, &posts)?;
    copy_posts(config, &generate_dir)?;

    log!("generate"; "{} posts", posts.len());
    Ok(())
}

/// Write the client-visible config as JSON.
fn write_client_config(config: &SiteConfig, generate_dir: &Path) -> Result<()> {
    let client = ClientConfig {
        base: &config.base,
        posts: &config.posts,
        extra: &config.extra,
    };
    let json = serde_json::to_string(&client)?;
    fs::write(generate_dir.join("config.json"), json)
        .context("writing generated config.json")?;
    Ok(())
}

/// Collect all posts, newest first.
fn collect_posts(config: &SiteConfig) -> Result<Vec<PostInfo>> {
    let content = &config.build.content;
    if !content.exists() {
        log!("generate"; "no posts directory at {}", content.display());
        return Ok(Vec::new());
    }

    let mut posts = Vec::new();
    for entry in WalkDir::new(content)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading post {}", path.display()))?;
        let (metadata, body) = split_front_matter(&raw)
            .with_context(|| format!("parsing front matter of {}", path.display()))?;

        let filename = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_string();

        posts.push(PostInfo {
            filename,
            metadata,
            synopsis: synopsis(body, config.posts.synopsis_max_length),
        });
    }

    posts.sort_by(compare_posts);
    Ok(posts)
}

/// Write the paginated post index: `posts.json` with the page count, plus
/// one `posts/<n>.json` per chunk (1-based).
fn write_post_data(config: &SiteConfig, data_dir: &Path, posts: &[PostInfo]) -> Result<()> {
    let chunks: Vec<&[PostInfo]> = posts.chunks(config.posts.num_per_page.max(1)).collect();

    let index_json = serde_json::to_string(&PostsIndex {
        num_pages: chunks.len(),
    })?;
    fs::write(data_dir.join("posts.json"), index_json).context("writing posts.json")?;

    let pages_dir = data_dir.join("posts");
    fs::create_dir_all(&pages_dir)?;
    for (index, chunk) in chunks.iter().enumerate() {
        let path = pages_dir.join(format!("{}.json", index + 1));
        fs::write(&path, serde_json::to_string(chunk)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(())
}

/// Copy the raw posts into `<generate>/posts/` for client-side fetching.
fn copy_posts(config: &SiteConfig, generate_dir: &Path) -> Result<()> {
    let content = &config.build.content;
    if !content.exists() {
        return Ok(());
    }
    copy_dir_recursively(content, &generate_dir.join("posts"))
}

fn copy_dir_recursively(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)
            .with_context(|| format!("creating directory {}", dst.display()))?;
    }

    for entry in fs::read_dir(src).with_context(|| format!("reading {}", src.display()))? {
        let entry = entry?;
        let entry_path = entry.path();
        let dest_path = dst.join(entry.file_name());

        if entry_path.is_dir() {
            copy_dir_recursively(&entry_path, &dest_path)?;
        } else {
            fs::copy(&entry_path, &dest_path).with_context(|| {
                format!("copying {} to {}", entry_path.display(), dest_path.display())
            })?;
        }
    }

    Ok(())
}

// ============================================================================
// Front matter
// ============================================================================

/// Split a post into TOML front matter and body.
///
/// Front matter sits between `+++` fences at the top of the file. A post
/// without a fence has empty metadata; an opened fence that never closes,
/// or unparsable TOML between the fences, is fatal.
fn split_front_matter(raw: &str) -> Result<(BTreeMap<String, toml::Value>, &str)> {
    let Some(rest) = raw.strip_prefix("+++") else {
        return Ok((BTreeMap::new(), raw));
    };

    let Some(end) = rest.find("\n+++") else {
        bail!("front matter fence is never closed");
    };

    let matter = &rest[..end];
    let body = rest[end + "\n+++".len()..].trim_start_matches(['\r', '\n']);
    let metadata = toml::from_str(matter).context("front matter is not valid TOML")?;

    Ok((metadata, body))
}

/// Trim a synopsis from the post body, on a char boundary.
fn synopsis(body: &str, max_length: usize) -> String {
    let body = body.trim();
    if body.chars().count() <= max_length {
        return body.to_string();
    }
    let cut: String = body.chars().take(max_length.saturating_sub(3)).collect();
    format!("{cut}...")
}

// ============================================================================
// Ordering
// ============================================================================

/// Compare posts newest-first; posts without a date sort last, ties fall
/// back to the filename.
fn compare_posts(a: &PostInfo, b: &PostInfo) -> Ordering {
    match (post_date(b), post_date(a)) {
        (Some(date_b), Some(date_a)) => date_a.cmp(&date_b).reverse(),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.filename.cmp(&b.filename),
    }
}

fn post_date(post: &PostInfo) -> Option<NaiveDate> {
    match post.metadata.get("date")? {
        toml::Value::Datetime(datetime) => parse_date(&datetime.to_string()),
        toml::Value::String(s) => parse_date(s),
        _ => None,
    }
}

/// Parse "YYYY-MM-DD", RFC 3339, or a bare datetime without offset.
fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(datetime.date_naive());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(datetime.date());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

// ============================================================================
// Tests
// ============================================================================
