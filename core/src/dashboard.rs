use crate::store::DataStore;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const DASHBOARD_TEMPLATE: &str = include_str!("dashboard_template.html");
const DATA_PLACEHOLDER: &str = "__DATA_PLACEHOLDER__";

pub const INDEX_FILE: &str = "index.html";

pub fn render_dashboard(store: &DataStore) -> Result<String> {
    let json = serde_json::to_string(store).context("serialize store to embed in HTML")?;
    Ok(DASHBOARD_TEMPLATE.replace(DATA_PLACEHOLDER, &escape_script_json(&json)))
}

/// Unicode-escapes markup characters so benchmark names cannot close the
/// script block or inject tags. The result is still valid JSON.
fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            _ => out.push(ch),
        }
    }
    out
}

/// Writes `index.html` into `dir` and returns its path.
pub fn write_dashboard(dir: &Path, store: &DataStore) -> Result<PathBuf> {
    let html = render_dashboard(store)?;
    let path = dir.join(INDEX_FILE);
    fs::write(&path, html.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
