//! Readers for the results files benchmark tools produce.
//!
//! Every reader returns raw [`BenchResult`]s; [`load_suite`] validates them
//! into a [`BenchSuite`].

pub mod criterion;
pub mod custom;
pub mod pytest;

#[cfg(test)]
mod parse_test;

use crate::result::{BenchResult, BenchSuite, Tool};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn load_results(tool: Tool, path: &Path) -> Result<Vec<BenchResult>> {
    match tool {
        Tool::Pytest => {
            let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            pytest::parse(&data).with_context(|| format!("parse pytest-benchmark output {}", path.display()))
        }
        Tool::Criterion => criterion::load_dir(path),
        Tool::CustomSmallerIsBetter | Tool::CustomBiggerIsBetter => {
            let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            custom::parse(&data).with_context(|| format!("parse custom benchmark output {}", path.display()))
        }
    }
}

pub fn load_suite(tool: Tool, path: &Path) -> Result<BenchSuite> {
    let results = load_results(tool, path)?;
    tracing::debug!(tool = %tool, path = %path.display(), count = results.len(), "loaded benchmark results");
    BenchSuite::new(results).with_context(|| format!("validate results from {}", path.display()))
}
