use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which way is "better" for a benchmark value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    SmallerIsBetter,
    BiggerIsBetter,
}

/// Format of the results file produced by the benchmark command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    Pytest,
    Criterion,
    CustomSmallerIsBetter,
    CustomBiggerIsBetter,
}

impl Tool {
    pub const ALL: [Tool; 4] = [
        Tool::Pytest,
        Tool::Criterion,
        Tool::CustomSmallerIsBetter,
        Tool::CustomBiggerIsBetter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Pytest => "pytest",
            Tool::Criterion => "criterion",
            Tool::CustomSmallerIsBetter => "customSmallerIsBetter",
            Tool::CustomBiggerIsBetter => "customBiggerIsBetter",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Tool::CustomBiggerIsBetter => Direction::BiggerIsBetter,
            Tool::Pytest | Tool::Criterion | Tool::CustomSmallerIsBetter => Direction::SmallerIsBetter,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Tool::ALL.iter().map(Tool::as_str).collect();
                anyhow!("unknown benchmark tool '{}', expected one of {}", s, known.join(", "))
            })
    }
}

/// One measured benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchResult {
    pub name: String,
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl BenchResult {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            range: None,
            extra: None,
        }
    }
}

/// Validated results of one run, keyed by benchmark name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchSuite {
    benches: BTreeMap<String, BenchResult>,
}

impl BenchSuite {
    pub fn new(results: Vec<BenchResult>) -> Result<Self> {
        let mut benches = BTreeMap::new();
        for result in results {
            if result.name.trim().is_empty() {
                bail!("benchmark with empty name");
            }
            if !result.value.is_finite() || result.value < 0.0 {
                bail!("benchmark '{}' has invalid value {}", result.name, result.value);
            }
            if benches.contains_key(&result.name) {
                bail!("duplicate benchmark name '{}'", result.name);
            }
            benches.insert(result.name.clone(), result);
        }
        Ok(Self { benches })
    }

    pub fn get(&self, name: &str) -> Option<&BenchResult> {
        self.benches.get(name)
    }

    pub fn len(&self) -> usize {
        self.benches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.benches.is_empty()
    }

    /// Results in name order.
    pub fn iter(&self) -> impl Iterator<Item = &BenchResult> {
        self.benches.values()
    }

    pub fn into_results(self) -> Vec<BenchResult> {
        self.benches.into_values().collect()
    }
}
