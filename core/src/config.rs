use crate::result::{Direction, Tool};
use crate::schedule::{CronSchedule, DEFAULT_CRON};
use crate::secrets::{DOWNLOAD_TOKEN, REPORT_TOKEN, SecretRef};
use crate::step::Step;
use crate::threshold::Threshold;
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "benchwatch.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Name of the series runs are stored under.
    pub suite: String,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default = "default_secrets")]
    pub secrets: BTreeMap<String, SecretRef>,
    #[serde(default)]
    pub fetch: Vec<Step>,
    #[serde(default)]
    pub setup: Vec<Step>,
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Directory relative paths resolve against. Set by [`Config::load`].
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    #[serde(default = "default_cron")]
    pub cron: String,
    #[serde(default = "default_true")]
    pub manual: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            manual: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkConfig {
    pub tool: Tool,
    /// Command producing `output`. Without it the results file must already exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    pub output: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}

impl BenchmarkConfig {
    pub fn step(&self) -> Option<Step> {
        self.run.as_ref().map(|run| Step {
            name: format!("{} benchmark", self.tool),
            run: run.clone(),
            working_dir: self.working_dir.clone(),
            env: self.env.clone(),
            secrets: self.secrets.clone(),
        })
    }

    pub fn direction(&self) -> Direction {
        self.tool.direction()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertConfig {
    #[serde(default)]
    pub threshold: Threshold,
    #[serde(default = "default_true")]
    pub fail_on_alert: bool,
    #[serde(default)]
    pub comment_on_alert: bool,
    /// Shell command receiving the comment on stdin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            fail_on_alert: true,
            comment_on_alert: false,
            comment_command: None,
            comment_file: None,
            mentions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_true")]
    pub save_on_alert: bool,
    #[serde(default = "default_true")]
    pub dashboard: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            max_items: default_max_items(),
            save_on_alert: true,
            dashboard: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cron() -> String {
    DEFAULT_CRON.to_string()
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("benchmarks")
}

fn default_max_items() -> usize {
    100
}

fn default_secrets() -> BTreeMap<String, SecretRef> {
    let mut secrets = BTreeMap::new();
    secrets.insert(DOWNLOAD_TOKEN.to_string(), SecretRef::new("DOWNLOAD_TOKEN", true));
    secrets.insert(REPORT_TOKEN.to_string(), SecretRef::new("REPORT_TOKEN", false));
    secrets
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => Format::Yaml,
            _ => Format::Toml,
        }
    }
}

impl Config {
    /// Reads and validates a TOML or YAML config; the format follows the
    /// file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let mut config = match Format::from_path(path) {
            Format::Yaml => Self::from_yaml_str(&data),
            Format::Toml => Self::from_toml_str(&data),
        }
        .with_context(|| format!("load config {}", path.display()))?;
        config.base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(config)
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        let config: Config = toml::from_str(data).context("parse TOML config")?;
        config.finish()
    }

    pub fn from_yaml_str(data: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(data).context("parse YAML config")?;
        config.finish()
    }

    fn finish(mut self) -> Result<Self> {
        if self.base_dir.as_os_str().is_empty() {
            self.base_dir = PathBuf::from(".");
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.suite.trim().is_empty() {
            bail!("suite name must not be empty");
        }
        self.cron().context("invalid [schedule] cron")?;

        for (name, secret) in &self.secrets {
            if secret.env.trim().is_empty() {
                bail!("secret '{}' has an empty env variable name", name);
            }
        }

        let bench_step = self.benchmark.step();
        let all_steps = self
            .fetch
            .iter()
            .map(|s| ("fetch", s))
            .chain(self.setup.iter().map(|s| ("setup", s)))
            .chain(bench_step.iter().map(|s| ("benchmark", s)));
        for (section, step) in all_steps {
            if step.name.trim().is_empty() {
                bail!("a [{}] step has an empty name", section);
            }
            if step.run.trim().is_empty() {
                bail!("[{}] step '{}' has an empty command", section, step.name);
            }
            for secret in &step.secrets {
                if !self.secrets.contains_key(secret) {
                    bail!("[{}] step '{}' uses unknown secret '{}'", section, step.name, secret);
                }
            }
        }

        if self.benchmark.output.as_os_str().is_empty() {
            bail!("[benchmark] output must not be empty");
        }
        if self.store.max_items == 0 {
            bail!("[store] max_items must be greater than zero");
        }
        if self.alert.comment_on_alert && self.alert.comment_command.is_none() && self.alert.comment_file.is_none() {
            return Err(anyhow!(
                "[alert] comment_on_alert needs comment_command or comment_file"
            ));
        }
        Ok(())
    }

    pub fn cron(&self) -> Result<CronSchedule> {
        CronSchedule::parse(&self.schedule.cron)
    }

    /// Resolves `path` against the config directory unless it is absolute.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve_path(&self.benchmark.output)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.resolve_path(&self.store.dir)
    }
}
