use anyhow::{anyhow, Context, Result};
use chrono::NaiveTime;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::types::{ChannelSettings, Config, Endpoint, SmtpSettings};

pub const ENDPOINT_PREFIX: &str = "URL_";
pub const DEFAULT_LOG_FILE: &str = "ssl_monitor.log";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;

    /// All variables, used only to discover `URL_<label>` endpoints.
    fn vars(&self) -> Vec<(String, String)>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars().collect()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let endpoints = load_endpoints(env);
    let smtp = load_smtp_settings(env)?;

    let slack_webhook_url = match non_empty(env, "SLACK_WEBHOOK_URL") {
        Some(url) => ChannelSettings::Configured(url),
        None => ChannelSettings::Missing(vec!["SLACK_WEBHOOK_URL"]),
    };

    let log_file = non_empty(env, "LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());

    let timeout_secs: u64 = env.get_var("CHECK_TIMEOUT_SECS")
        .unwrap_or_else(|| "10".to_string())
        .trim()
        .parse()
        .context("Invalid CHECK_TIMEOUT_SECS")?;
    if timeout_secs == 0 {
        return Err(anyhow!("CHECK_TIMEOUT_SECS must be greater than zero"));
    }

    let max_concurrent_checks: usize = env.get_var("MAX_CONCURRENT_CHECKS")
        .unwrap_or_else(|| "8".to_string())
        .trim()
        .parse()
        .context("Invalid MAX_CONCURRENT_CHECKS")?;
    if max_concurrent_checks == 0 {
        return Err(anyhow!("MAX_CONCURRENT_CHECKS must be greater than zero"));
    }

    let check_time = env.get_var("CHECK_TIME")
        .unwrap_or_else(|| "00:00".to_string());
    let check_time = NaiveTime::parse_from_str(check_time.trim(), "%H:%M")
        .with_context(|| format!("Invalid CHECK_TIME '{}', expected HH:MM", check_time))?;

    Ok(Config {
        endpoints,
        smtp,
        slack_webhook_url,
        log_file,
        timeout_secs,
        max_concurrent_checks,
        check_time,
    })
}

/// Collects `URL_<label>=<address>` pairs, sorted by label.
pub fn load_endpoints<E: EnvironmentProvider>(env: &E) -> Vec<Endpoint> {
    let found: BTreeMap<String, String> = env
        .vars()
        .into_iter()
        .filter_map(|(key, value)| {
            let label = key.strip_prefix(ENDPOINT_PREFIX)?.to_string();
            let address = value.trim().to_string();
            if label.is_empty() || address.is_empty() {
                return None;
            }
            Some((label, address))
        })
        .collect();

    found
        .into_iter()
        .map(|(label, address)| Endpoint { label, address })
        .collect()
}

fn load_smtp_settings<E: EnvironmentProvider>(env: &E) -> Result<ChannelSettings<SmtpSettings>> {
    let host = non_empty(env, "SMTP_HOST");
    let port = non_empty(env, "SMTP_PORT");
    let from = non_empty(env, "EMAIL_FROM");
    let to: Vec<String> = non_empty(env, "EMAIL_TO")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let mut missing = Vec::new();
    if host.is_none() { missing.push("SMTP_HOST"); }
    if port.is_none() { missing.push("SMTP_PORT"); }
    if from.is_none() { missing.push("EMAIL_FROM"); }
    if to.is_empty() { missing.push("EMAIL_TO"); }

    let (Some(host), Some(port), Some(from), false) = (host, port, from, to.is_empty()) else {
        return Ok(ChannelSettings::Missing(missing));
    };

    let port: u16 = port.trim().parse().context("Invalid SMTP_PORT")?;

    let username = non_empty(env, "SMTP_USER");
    let password = non_empty(env, "SMTP_PASS");
    if let Some(absent) = partial_credentials(&username, &password) {
        warn!("{} is not set, SMTP authentication will be skipped", absent);
    }

    Ok(ChannelSettings::Configured(SmtpSettings {
        host,
        port,
        username,
        password,
        from,
        to,
    }))
}

/// Names the absent key when exactly one of the SMTP credentials is given.
fn partial_credentials(username: &Option<String>, password: &Option<String>) -> Option<&'static str> {
    match (username, password) {
        (Some(_), None) => Some("SMTP_PASS"),
        (None, Some(_)) => Some("SMTP_USER"),
        _ => None,
    }
}

fn non_empty<E: EnvironmentProvider>(env: &E, key: &str) -> Option<String> {
    env.get_var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
