use crate::compare::Comparison;
use crate::step::{CommandRunner, Phase, PreparedCommand, StepFailure};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

/// Details shown in the alert comment header.
#[derive(Debug, Clone, Default)]
pub struct ReportContext<'a> {
    pub suite: &'a str,
    pub commit: Option<&'a str>,
    pub baseline_commit: Option<&'a str>,
    pub mentions: &'a [String],
}

pub fn format_value(value: f64, unit: &str) -> String {
    let magnitude = value.abs();
    let number = if value.fract() == 0.0 && magnitude < 1e15 {
        format!("{}", value as i64)
    } else if magnitude >= 100.0 {
        format!("{:.2}", value)
    } else if magnitude >= 1.0 {
        format!("{:.4}", value)
    } else {
        format!("{:.6}", value)
    };
    if unit.is_empty() { number } else { format!("{} {}", number, unit) }
}

fn escape_cell(raw: &str) -> String {
    raw.replace('|', "\\|").replace('\n', " ")
}

/// Markdown table of every compared benchmark.
pub fn render_summary(suite: &str, comparison: &Comparison) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Benchmark results: {}", suite);
    let _ = writeln!(out);
    let _ = writeln!(out, "Alert threshold: {}", comparison.threshold);
    let _ = writeln!(out);
    let _ = writeln!(out, "| Benchmark | Current | Baseline | Ratio | |");
    let _ = writeln!(out, "|---|---|---|---|---|");
    for delta in &comparison.deltas {
        let baseline = delta
            .baseline
            .map(|b| format_value(b, &delta.unit))
            .unwrap_or_else(|| "-".to_string());
        let ratio = delta.ratio.map(|r| format!("{:.2}", r)).unwrap_or_else(|| "-".to_string());
        let marker = if delta.alert {
            "regression"
        } else if delta.baseline.is_none() {
            "new"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {} | {} |",
            escape_cell(&delta.name),
            format_value(delta.current, &delta.unit),
            baseline,
            ratio,
            marker
        );
    }
    if !comparison.missing.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Missing from this run: {}", comparison.missing.join(", "));
    }
    out
}

/// Comment body posted when at least one benchmark crossed the threshold.
pub fn render_alert_comment(ctx: &ReportContext<'_>, comparison: &Comparison) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# :warning: Performance alert: {}", ctx.suite);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Possible performance regression detected. {} benchmark(s) in **{}** exceeded the alert threshold of **{}** against the stored baseline.",
        comparison.alerts.len(),
        ctx.suite,
        comparison.threshold
    );
    if ctx.commit.is_some() || ctx.baseline_commit.is_some() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Commit: `{}` (baseline `{}`)",
            ctx.commit.unwrap_or("unknown"),
            ctx.baseline_commit.unwrap_or("unknown")
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "| Benchmark | Current | Baseline | Ratio |");
    let _ = writeln!(out, "|---|---|---|---|");
    for alert in &comparison.alerts {
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {:.2} |",
            escape_cell(&alert.name),
            format_value(alert.current, &alert.unit),
            format_value(alert.baseline, &alert.unit),
            alert.ratio
        );
    }
    if !ctx.mentions.is_empty() {
        let _ = writeln!(out);
        let mentions: Vec<String> = ctx
            .mentions
            .iter()
            .map(|m| if m.starts_with('@') { m.clone() } else { format!("@{}", m) })
            .collect();
        let _ = writeln!(out, "CC: {}", mentions.join(" "));
    }
    out
}

/// Destination for alert comments.
pub trait Publisher {
    fn describe(&self) -> String;
    fn publish(&self, comment: &str) -> Result<()>;
}

pub struct FilePublisher {
    pub path: PathBuf,
}

impl Publisher for FilePublisher {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn publish(&self, comment: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&self.path, comment).with_context(|| format!("write alert comment to {}", self.path.display()))
    }
}

/// Pipes the comment into a shell command, e.g. `gh pr comment --body-file -`.
pub struct CommandPublisher<'a> {
    pub runner: &'a dyn CommandRunner,
    pub command: PreparedCommand,
}

impl Publisher for CommandPublisher<'_> {
    fn describe(&self) -> String {
        format!("command '{}'", self.command.command)
    }

    fn publish(&self, comment: &str) -> Result<()> {
        let mut command = self.command.clone();
        command.stdin = Some(comment.to_string());
        let status = self
            .runner
            .run(&command)
            .with_context(|| format!("publish step '{}'", command.name))?;
        if !status.success {
            return Err(StepFailure {
                phase: Phase::Publish,
                step: command.name,
                status,
            }
            .into());
        }
        Ok(())
    }
}
