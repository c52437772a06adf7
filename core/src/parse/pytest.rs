use crate::result::BenchResult;
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Deserialize)]
struct PytestOutput {
    benchmarks: Vec<PytestBenchmark>,
}

#[derive(Deserialize)]
struct PytestBenchmark {
    name: String,
    #[serde(default)]
    fullname: Option<String>,
    stats: PytestStats,
}

#[derive(Deserialize)]
struct PytestStats {
    mean: f64,
    #[serde(default)]
    stddev: Option<f64>,
    #[serde(default)]
    median: Option<f64>,
    #[serde(default)]
    rounds: Option<u64>,
}

/// Reads pytest-benchmark `--benchmark-json` output. Values are mean
/// durations in seconds.
pub fn parse(data: &str) -> Result<Vec<BenchResult>> {
    let output: PytestOutput = serde_json::from_str(data).context("pytest-benchmark JSON")?;
    Ok(output.benchmarks.into_iter().map(to_result).collect())
}

fn to_result(bench: PytestBenchmark) -> BenchResult {
    let name = bench.fullname.filter(|f| !f.is_empty()).unwrap_or(bench.name);
    let stats = bench.stats;

    let mut extra = Vec::new();
    if let Some(rounds) = stats.rounds {
        extra.push(format!("rounds: {}", rounds));
    }
    if let Some(median) = stats.median {
        extra.push(format!("median: {:.6} s", median));
    }

    BenchResult {
        name,
        value: stats.mean,
        unit: "s".to_string(),
        range: stats.stddev.map(|sd| format!("± {:.6}", sd)),
        extra: (!extra.is_empty()).then(|| extra.join("\n")),
    }
}
