//! The nightly job: fetch fixtures, install, benchmark, compare against the
//! stored baseline, record the run and raise alerts.

use crate::compare::{Comparison, compare};
use crate::config::Config;
use crate::dashboard::write_dashboard;
use crate::parse;
use crate::report::{CommandPublisher, FilePublisher, Publisher, ReportContext, render_alert_comment};
use crate::schedule::Trigger;
use crate::secrets::{REPORT_TOKEN, Secrets};
use crate::step::{CommandRunner, Phase, PreparedCommand, Step, run_phase};
use crate::store::{DataStore, LATEST_FILE, RunRecord, csv_file_name, ensure_dir, write_csv, write_json_atomic};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub trigger: Trigger,
    pub skip_fetch: bool,
    pub skip_setup: bool,
    pub skip_bench: bool,
    pub commit: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

impl RunOptions {
    pub fn new(trigger: Trigger, timestamp: DateTime<Utc>) -> Self {
        Self {
            trigger,
            skip_fetch: false,
            skip_setup: false,
            skip_bench: false,
            commit: None,
            timestamp,
            notes: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub comparison: Comparison,
    pub record: RunRecord,
    /// Whether the run became the new baseline.
    pub saved: bool,
    /// Descriptions of the publishers the alert comment went to.
    pub published: Vec<String>,
    pub dashboard: Option<PathBuf>,
    /// Alerts were raised and the config fails the job on alert.
    pub failed: bool,
}

#[derive(Serialize)]
struct LatestReport<'a> {
    suite: &'a str,
    record: &'a RunRecord,
    comparison: &'a Comparison,
}

type EnvLookup<'a> = Box<dyn Fn(&str) -> Option<String> + 'a>;

pub struct Orchestrator<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    env: EnvLookup<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            env: Box::new(|key: &str| std::env::var(key).ok()),
        }
    }

    /// Replaces the environment used to resolve secrets.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'a,
    {
        self.env = Box::new(lookup);
        self
    }

    pub fn run(&self, opts: &RunOptions) -> Result<RunOutcome> {
        let config = self.config;
        if opts.trigger == Trigger::Manual && !config.schedule.manual {
            bail!("manual dispatch is disabled for suite '{}'", config.suite);
        }
        tracing::info!(suite = %config.suite, trigger = %opts.trigger, "starting benchmark run");

        let secrets = Secrets::resolve(&config.secrets, |key| (self.env)(key))?;
        let base_dir = &config.base_dir;

        if opts.skip_fetch {
            tracing::info!("skipping fetch steps");
        } else {
            run_phase(self.runner, Phase::Fetch, &config.fetch, base_dir, &secrets)?;
        }
        if opts.skip_setup {
            tracing::info!("skipping setup steps");
        } else {
            run_phase(self.runner, Phase::Setup, &config.setup, base_dir, &secrets)?;
        }

        let output = config.output_path();
        match config.benchmark.step() {
            Some(_) if opts.skip_bench => {
                tracing::info!(output = %output.display(), "skipping benchmark; reusing existing results");
            }
            Some(step) => run_phase(self.runner, Phase::Bench, std::slice::from_ref(&step), base_dir, &secrets)?,
            None => tracing::info!(output = %output.display(), "no benchmark command configured; reading results"),
        }

        let tool = config.benchmark.tool;
        let current = parse::load_suite(tool, &output)?;
        if current.is_empty() {
            bail!("no benchmarks found in {}", output.display());
        }

        let store_dir = config.store_dir();
        let mut store = DataStore::load(&store_dir)?;
        let baseline_record = store.baseline(&config.suite).cloned();
        let baseline = match &baseline_record {
            Some(prev) if prev.tool != tool => {
                tracing::warn!(previous = %prev.tool, current = %tool, "baseline was recorded with another tool; ignoring it");
                None
            }
            Some(prev) => Some(prev.suite()?),
            None => None,
        };

        let comparison = compare(&current, baseline.as_ref(), config.benchmark.direction(), config.alert.threshold);
        for alert in &comparison.alerts {
            tracing::warn!(
                bench = %alert.name,
                ratio = alert.ratio,
                current = alert.current,
                baseline = alert.baseline,
                threshold = %comparison.threshold,
                "performance regression"
            );
        }
        tracing::info!(
            benches = comparison.deltas.len(),
            alerts = comparison.alerts.len(),
            new = comparison.new.len(),
            missing = comparison.missing.len(),
            "comparison finished"
        );

        let record = RunRecord {
            generated_at: opts.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            commit: opts.commit.clone(),
            trigger: opts.trigger,
            tool,
            notes: opts.notes.clone(),
            benches: current.into_results(),
        };

        ensure_dir(&store_dir)?;
        let latest = LatestReport {
            suite: &config.suite,
            record: &record,
            comparison: &comparison,
        };
        write_json_atomic(&store_dir.join(LATEST_FILE), &latest)?;
        write_csv(&store_dir.join(csv_file_name(&config.suite)), &record.benches)?;

        let saved = !comparison.has_alerts() || config.store.save_on_alert;
        if saved {
            store.push(&config.suite, record.clone(), config.store.max_items);
            store
                .save(&store_dir)
                .with_context(|| format!("save baseline store in {}", store_dir.display()))?;
        } else {
            tracing::warn!("regression detected; keeping the previous baseline");
        }

        let dashboard = if config.store.dashboard {
            Some(write_dashboard(&store_dir, &store)?)
        } else {
            None
        };

        let published = if comparison.has_alerts() && config.alert.comment_on_alert {
            let ctx = ReportContext {
                suite: &config.suite,
                commit: record.commit.as_deref(),
                baseline_commit: baseline_record.as_ref().and_then(|r| r.commit.as_deref()),
                mentions: &config.alert.mentions,
            };
            let comment = render_alert_comment(&ctx, &comparison);
            self.publish(&comment, &secrets)?
        } else {
            Vec::new()
        };

        let failed = comparison.has_alerts() && config.alert.fail_on_alert;
        Ok(RunOutcome {
            comparison,
            record,
            saved,
            published,
            dashboard,
            failed,
        })
    }

    fn publish(&self, comment: &str, secrets: &Secrets) -> Result<Vec<String>> {
        let config = self.config;
        let mut publishers: Vec<Box<dyn Publisher + '_>> = Vec::new();
        if let Some(path) = &config.alert.comment_file {
            publishers.push(Box::new(FilePublisher {
                path: config.resolve_path(path),
            }));
        }
        if let Some(run) = &config.alert.comment_command {
            let mut step = Step::new("publish alert comment", run.clone());
            if config.secrets.contains_key(REPORT_TOKEN) {
                step.secrets.push(REPORT_TOKEN.to_string());
            }
            publishers.push(Box::new(CommandPublisher {
                runner: self.runner,
                command: PreparedCommand::prepare(&step, &config.base_dir, secrets),
            }));
        }

        let mut published = Vec::with_capacity(publishers.len());
        for publisher in publishers {
            let target = publisher.describe();
            tracing::info!(%target, "publishing alert comment");
            publisher.publish(comment)?;
            published.push(target);
        }
        Ok(published)
    }
}
