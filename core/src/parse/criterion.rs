use crate::result::BenchResult;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Deserialize)]
struct EstimateFile {
    mean: EstimateEntry,
    std_dev: EstimateEntry,
}

#[derive(Deserialize)]
struct EstimateEntry {
    point_estimate: f64,
}

/// Collects every `<case>/new/estimates.json` below a Criterion output
/// directory. Values are mean nanoseconds per iteration.
pub fn load_dir(criterion_dir: &Path) -> Result<Vec<BenchResult>> {
    if !criterion_dir.is_dir() {
        return Err(anyhow!("criterion output {} is not a directory", criterion_dir.display()));
    }
    let mut results = Vec::new();
    walk(criterion_dir, criterion_dir, &mut results)?;
    results.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(results)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<BenchResult>) -> Result<()> {
    let new_dir = dir.join("new");
    if new_dir.join("estimates.json").is_file() {
        let name = case_name(root, dir)?;
        out.push(load_case(&new_dir, name)?);
        return Ok(());
    }

    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("read {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        // file_type does not follow symlinks, so link loops are never walked
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .collect();
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        if entry.file_name() == "report" {
            continue;
        }
        walk(root, &entry.path(), out)?;
    }
    Ok(())
}

fn case_name(root: &Path, dir: &Path) -> Result<String> {
    let rel = dir
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", dir.display(), root.display()))?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return Err(anyhow!("estimates.json found at the criterion root {}", root.display()));
    }
    Ok(parts.join("/"))
}

fn load_case(new_dir: &Path, name: String) -> Result<BenchResult> {
    let estimate_path = new_dir.join("estimates.json");
    let data = fs::read_to_string(&estimate_path).with_context(|| format!("read {}", estimate_path.display()))?;
    let estimates: EstimateFile =
        serde_json::from_str(&data).with_context(|| format!("parse {}", estimate_path.display()))?;

    let raw_path = new_dir.join("raw.csv");
    let extra = if raw_path.is_file() {
        let mut samples = load_samples(&raw_path)?;
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Some(format!(
            "p50: {:.3} ns\np95: {:.3} ns\np99: {:.3} ns",
            quantile(&samples, 0.5),
            quantile(&samples, 0.95),
            quantile(&samples, 0.99)
        ))
    } else {
        None
    };

    Ok(BenchResult {
        name,
        value: estimates.mean.point_estimate,
        unit: "ns".to_string(),
        range: Some(format!("± {:.3}", estimates.std_dev.point_estimate)),
        extra,
    })
}

fn load_samples(raw_path: &Path) -> Result<Vec<f64>> {
    let raw_file = File::open(raw_path).with_context(|| format!("open {}", raw_path.display()))?;
    let mut reader = BufReader::new(raw_file);
    let mut line = String::new();
    let mut samples = Vec::new();
    while reader.read_line(&mut line)? != 0 {
        if line.starts_with("group") || line.trim().is_empty() {
            line.clear();
            continue;
        }
        samples.push(parse_sample_value(&line).with_context(|| format!("parse {}", raw_path.display()))?);
        line.clear();
    }
    Ok(samples)
}

pub(crate) fn parse_sample_value(line: &str) -> Result<f64> {
    let parts: Vec<&str> = line.trim_end().split(',').collect();
    if parts.len() < 8 {
        return Err(anyhow!("raw.csv row had {} columns, expected at least 8", parts.len()));
    }
    let raw_value: f64 = parts[5]
        .parse()
        .context("raw.csv contained a non-numeric sample_measured_value")?;
    let iterations: f64 = parts[7]
        .parse()
        .context("raw.csv contained a non-numeric iteration_count")?;
    if iterations > 0.0 {
        Ok(raw_value / iterations)
    } else {
        Ok(raw_value)
    }
}

pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = pos - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}
