//! Persistent run history. One JSON document per store directory holds every
//! suite's records; the newest record of a suite is its baseline.

use crate::result::{BenchResult, BenchSuite, Tool};
use crate::schedule::Trigger;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DATA_FILE: &str = "data.json";
pub const LATEST_FILE: &str = "latest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub generated_at: String,
    #[serde(default)]
    pub commit: Option<String>,
    pub trigger: Trigger,
    pub tool: Tool,
    #[serde(default)]
    pub notes: Option<String>,
    pub benches: Vec<BenchResult>,
}

impl RunRecord {
    pub fn suite(&self) -> Result<BenchSuite> {
        BenchSuite::new(self.benches.clone()).with_context(|| format!("stored run from {}", self.generated_at))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStore {
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<RunRecord>>,
}

impl DataStore {
    pub fn data_path(dir: &Path) -> PathBuf {
        dir.join(DATA_FILE)
    }

    /// Loads `data.json` from `dir`; a missing file is an empty store.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::data_path(dir);
        if !path.exists() {
            tracing::info!(path = %path.display(), "no stored runs yet");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parse {}", path.display()))
    }

    /// Writes `data.json` through a temp file in the same directory.
    pub fn save(&self, dir: &Path) -> Result<()> {
        write_json_atomic(&Self::data_path(dir), self)
    }

    pub fn runs(&self, suite: &str) -> &[RunRecord] {
        self.entries.get(suite).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn baseline(&self, suite: &str) -> Option<&RunRecord> {
        self.runs(suite).last()
    }

    /// Appends `record` and drops the oldest runs beyond `max_items`.
    pub fn push(&mut self, suite: &str, record: RunRecord, max_items: usize) {
        self.last_update = Some(record.generated_at.clone());
        let runs = self.entries.entry(suite.to_string()).or_default();
        runs.push(record);
        if runs.len() > max_items {
            let excess = runs.len() - max_items;
            runs.drain(..excess);
            tracing::debug!(suite, dropped = excess, "pruned old runs");
        }
    }
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    Ok(())
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;
    let mut tmp = NamedTempFile::new_in(dir).with_context(|| format!("create temp file in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value).with_context(|| format!("write {}", path.display()))?;
        writer.flush()?;
    }
    tmp.persist(path)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// File name for the per-suite CSV, safe on every platform.
pub fn csv_file_name(suite: &str) -> String {
    format!("latest-{}.csv", sanitize_filename::sanitize(suite))
}

pub fn write_csv(path: &Path, benches: &[BenchResult]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path).with_context(|| format!("create {}", path.display()))?);
    writeln!(writer, "name,value,unit,range")?;
    for bench in benches {
        writeln!(
            writer,
            "{},{:.6},{},{}",
            csv_field(&bench.name),
            bench.value,
            csv_field(&bench.unit),
            csv_field(bench.range.as_deref().unwrap_or(""))
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
