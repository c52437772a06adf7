use crate::result::BenchResult;
use anyhow::{Context, Result};

/// Reads a JSON array of `{name, unit, value, range?, extra?}` objects.
pub fn parse(data: &str) -> Result<Vec<BenchResult>> {
    serde_json::from_str(data).context("custom benchmark JSON must be an array of {name, unit, value} objects")
}
