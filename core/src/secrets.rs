use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DOWNLOAD_TOKEN: &str = "download_token";
pub const REPORT_TOKEN: &str = "report_token";

/// Points at the environment variable carrying a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    pub env: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl SecretRef {
    pub fn new(env: impl Into<String>, required: bool) -> Self {
        Self {
            env: env.into(),
            required,
        }
    }
}

/// A resolved secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Secrets resolved from the environment, keyed by their configured name.
#[derive(Debug, Default, Clone)]
pub struct Secrets {
    values: BTreeMap<String, (String, SecretValue)>,
}

impl Secrets {
    /// Resolves every reference through `lookup`. Required secrets that are
    /// unset or empty are reported together.
    pub fn resolve<F>(refs: &BTreeMap<String, SecretRef>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = BTreeMap::new();
        let mut missing = Vec::new();
        for (name, secret) in refs {
            match lookup(&secret.env).filter(|v| !v.is_empty()) {
                Some(value) => {
                    values.insert(name.clone(), (secret.env.clone(), SecretValue(value)));
                }
                None if secret.required => missing.push(format!("{} (${})", name, secret.env)),
                None => {
                    tracing::debug!(secret = %name, env = %secret.env, "optional secret not set");
                }
            }
        }
        if !missing.is_empty() {
            return Err(anyhow!("missing required secrets: {}", missing.join(", ")));
        }
        Ok(Self { values })
    }

    pub fn from_env(refs: &BTreeMap<String, SecretRef>) -> Result<Self> {
        Self::resolve(refs, |key| std::env::var(key).ok())
    }

    pub fn get(&self, name: &str) -> Option<&SecretValue> {
        self.values.get(name).map(|(_, value)| value)
    }

    /// Environment pairs to export for the named secrets. Unresolved optional
    /// secrets are skipped.
    pub fn env_pairs<'a, I>(&self, names: I) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = &'a String>,
    {
        names
            .into_iter()
            .filter_map(|name| self.values.get(name))
            .map(|(env, value)| (env.clone(), value.expose().to_string()))
            .collect()
    }
}
