//! HTML template splicing.
//!
//! The bundler emits one shared HTML template; every pre-rendered page is
//! that template with the mount element's content replaced by the page's
//! markup and, when the page preloaded data, an inline script carrying the
//! serialized data map so the hydration bundle can pick it up without
//! re-fetching.

use crate::log;
use anyhow::{Context, Result, bail};
use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Resolved preload data, keyed by request identifier.
pub type DataMap = BTreeMap<String, Value>;

/// Well-known id of the mount element the markup replaces.
pub const MOUNT_ID: &str = "root";

/// Well-known id of the injected data script element.
pub const DATA_SCRIPT_ID: &str = "preload-data";

/// Global variable the injected script assigns the data map to.
const DATA_GLOBAL: &str = "window.__PRELOADED_DATA__";

/// Create a configured XML reader from template bytes
#[inline]
fn create_reader(content: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(false);
    reader.config_mut().enable_all_checks(false);
    reader
}

/// Serialize the data map for inline embedding.
///
/// `<` is escaped as `\u003c` so embedded strings cannot prematurely close
/// the script context.
fn serialize_data(data: &DataMap) -> Result<String> {
    let json = serde_json::to_string(data)?;
    Ok(format!("{DATA_GLOBAL}={}", json.replace('<', "\\u003c")))
}

/// Write the `<script id="preload-data">` element.
fn write_data_script(writer: &mut Writer<Cursor<Vec<u8>>>, body: &str) -> Result<()> {
    let mut script = BytesStart::new("script");
    script.push_attribute(("id", DATA_SCRIPT_ID));
    writer.write_event(Event::Start(script))?;
    writer.write_event(Event::Text(BytesText::from_escaped(body)))?;
    writer.write_event(Event::End(BytesEnd::new("script")))?;
    Ok(())
}

/// Check whether an element is the mount point.
fn is_mount(elem: &BytesStart) -> Result<bool> {
    Ok(elem
        .try_get_attribute("id")?
        .is_some_and(|attr| attr.value.as_ref() == MOUNT_ID.as_bytes()))
}

/// Discard whatever children the mount element carried in the template.
fn skip_subtree(reader: &mut Reader<&[u8]>, name: &[u8]) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(elem) if elem.name().as_ref() == name => depth += 1,
            Event::End(elem) if elem.name().as_ref() == name => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            Event::Eof => bail!("template ended before the mount element closed"),
            _ => {}
        }
    }
}

/// Splice rendered markup and serialized data into the template.
///
/// The mount element is located by its well-known id; its inner content is
/// replaced with `markup`. A non-empty `data` map is injected as a script
/// element immediately before the first pre-existing script in `<head>`,
/// or appended at the end of `<head>` when none exists.
pub fn splice(template: &str, markup: &str, data: &DataMap) -> Result<String> {
    let mut reader = create_reader(template.as_bytes());
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let script_body = if data.is_empty() {
        None
    } else {
        Some(serialize_data(data)?)
    };
    let mut injected = script_body.is_none();
    let mut in_head = false;
    let mut found_mount = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(elem) => {
                let name = elem.name().as_ref().to_ascii_lowercase();

                if !injected && in_head && name == b"script" {
                    if let Some(body) = &script_body {
                        write_data_script(&mut writer, body)?;
                    }
                    injected = true;
                }
                if name == b"head" {
                    in_head = true;
                }

                if is_mount(&elem)? {
                    found_mount = true;
                    let raw_name = elem.name().as_ref().to_vec();
                    let end = elem.to_end().into_owned();
                    writer.write_event(Event::Start(elem))?;
                    writer.write_event(Event::Text(BytesText::from_escaped(markup)))?;
                    skip_subtree(&mut reader, &raw_name)?;
                    writer.write_event(Event::End(end))?;
                } else {
                    writer.write_event(Event::Start(elem))?;
                }
            }
            Event::Empty(elem) => {
                if is_mount(&elem)? {
                    found_mount = true;
                    let end = elem.to_end().into_owned();
                    writer.write_event(Event::Start(elem))?;
                    writer.write_event(Event::Text(BytesText::from_escaped(markup)))?;
                    writer.write_event(Event::End(end))?;
                } else {
                    writer.write_event(Event::Empty(elem))?;
                }
            }
            Event::End(elem) => {
                if elem.name().as_ref().to_ascii_lowercase() == b"head" {
                    if !injected {
                        if let Some(body) = &script_body {
                            write_data_script(&mut writer, body)?;
                        }
                        injected = true;
                    }
                    in_head = false;
                }
                writer.write_event(Event::End(elem))?;
            }
            other => writer.write_event(other)?,
        }
    }

    if !found_mount {
        bail!("cannot find root element");
    }
    if !injected {
        bail!("template has no <head> element to carry the preload data script");
    }

    let html = writer.into_inner().into_inner();
    String::from_utf8(html).context("spliced template is not valid UTF-8")
}

/// Write one rendered page, creating parent directories as needed, and emit
/// the build-log line (relative path + size).
pub fn write_page(output_root: &Path, out_path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    fs::write(out_path, html)
        .with_context(|| format!("writing page {}", out_path.display()))?;

    let relative = out_path.strip_prefix(output_root).unwrap_or(out_path);
    let size_kib = html.len() as f64 / 1024.0;
    log!("dist"; "{:<45} {:.2} KiB", relative.display(), size_kib);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEMPLATE: &str = concat!(
        "<!DOCTYPE html>",
        "<html><head>",
        "<meta charset=\"utf-8\"/>",
        "<title>site</title>",
        "<script type=\"module\" src=\"/bundle.js\"></script>",
        "</head><body>",
        "<div id=\"root\"></div>",
        "</body></html>",
    );

    #[test]
    fn test_splice_replaces_mount_content() {
        let html = splice(TEMPLATE, "<h1>Hello</h1>", &DataMap::new()).unwrap();
        assert!(html.contains("<div id=\"root\"><h1>Hello</h1></div>"));
        assert!(html.contains("<title>site</title>"));
    }

    #[test]
    fn test_splice_discards_previous_mount_content() {
        let template = TEMPLATE.replace(
            "<div id=\"root\"></div>",
            "<div id=\"root\"><p>placeholder</p></div>",
        );
        let html = splice(&template, "<h1>New</h1>", &DataMap::new()).unwrap();
        assert!(html.contains("<div id=\"root\"><h1>New</h1></div>"));
        assert!(!html.contains("placeholder"));
    }

    #[test]
    fn test_splice_missing_mount_is_fatal() {
        let template = "<html><head></head><body><div id=\"app\"></div></body></html>";
        let err = splice(template, "<h1>x</h1>", &DataMap::new()).unwrap_err();
        assert!(err.to_string().contains("cannot find root element"));
    }

    #[test]
    fn test_splice_no_data_no_script() {
        let html = splice(TEMPLATE, "<h1>x</h1>", &DataMap::new()).unwrap();
        assert!(!html.contains(DATA_SCRIPT_ID));
    }

    #[test]
    fn test_splice_injects_data_before_first_head_script() {
        let mut data = DataMap::new();
        data.insert("posts".into(), json!({"num_pages": 2}));

        let html = splice(TEMPLATE, "<h1>x</h1>", &data).unwrap();
        let injected = html.find("id=\"preload-data\"").unwrap();
        let bundle = html.find("/bundle.js").unwrap();
        assert!(injected < bundle);
        assert!(html.contains("window.__PRELOADED_DATA__={\"posts\":{\"num_pages\":2}}"));
    }

    #[test]
    fn test_splice_appends_data_when_head_has_no_script() {
        let template = TEMPLATE.replace(
            "<script type=\"module\" src=\"/bundle.js\"></script>",
            "",
        );
        let mut data = DataMap::new();
        data.insert("greeting".into(), json!("hi"));

        let html = splice(&template, "<h1>x</h1>", &data).unwrap();
        let injected = html.find("id=\"preload-data\"").unwrap();
        let head_end = html.find("</head>").unwrap();
        assert!(injected < head_end);
    }

    #[test]
    fn test_splice_escapes_angle_brackets_in_data() {
        let mut data = DataMap::new();
        data.insert("html".into(), json!("</script><script>alert(1)"));

        let html = splice(TEMPLATE, "<h1>x</h1>", &data).unwrap();
        assert!(html.contains("\\u003c/script>"));
        assert!(!html.contains("</script><script>alert(1)"));
    }

    #[test]
    fn test_splice_self_closed_mount() {
        let template = TEMPLATE.replace("<div id=\"root\"></div>", "<div id=\"root\"/>");
        let html = splice(&template, "<h1>x</h1>", &DataMap::new()).unwrap();
        assert!(html.contains("<div id=\"root\"><h1>x</h1></div>"));
    }

    #[test]
    fn test_splice_deterministic_for_same_input() {
        let mut data = DataMap::new();
        data.insert("b".into(), json!(2));
        data.insert("a".into(), json!(1));

        let first = splice(TEMPLATE, "<h1>x</h1>", &data).unwrap();
        let second = splice(TEMPLATE, "<h1>x</h1>", &data).unwrap();
        assert_eq!(first, second);
        // BTreeMap keys serialize sorted
        assert!(first.contains("{\"a\":1,\"b\":2}"));
    }

    #[test]
    fn test_write_page_creates_parents_and_writes() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("blog").join("a").join("index.html");
        write_page(dir.path(), &out, "<html></html>").unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "<html></html>");
    }
}
