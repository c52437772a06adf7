use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regression threshold written as a percentage literal such as `200%`.
///
/// A benchmark alerts when its current/baseline ratio is strictly greater
/// than [`Threshold::ratio`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Threshold {
    percent: f64,
}

impl Threshold {
    pub const DEFAULT_PERCENT: f64 = 200.0;

    pub fn from_percent(percent: f64) -> Result<Self> {
        if !percent.is_finite() || percent <= 0.0 {
            return Err(anyhow!("threshold must be a positive percentage, got {}", percent));
        }
        Ok(Self { percent })
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn ratio(&self) -> f64 {
        self.percent / 100.0
    }

    /// Whether `ratio` crosses this threshold.
    pub fn exceeded_by(&self, ratio: f64) -> bool {
        ratio > self.ratio()
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            percent: Self::DEFAULT_PERCENT,
        }
    }
}

impl FromStr for Threshold {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let number = trimmed
            .strip_suffix('%')
            .ok_or_else(|| anyhow!("threshold '{}' must be a percentage like '200%'", trimmed))?;
        let percent: f64 = number
            .trim()
            .parse()
            .map_err(|_| anyhow!("threshold '{}' is not a number followed by '%'", trimmed))?;
        Self::from_percent(percent)
    }
}

impl TryFrom<String> for Threshold {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Threshold> for String {
    fn from(value: Threshold) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent)
    }
}
