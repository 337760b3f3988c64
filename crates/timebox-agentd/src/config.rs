use std::{net::SocketAddr, str::FromStr};

use thiserror::Error;
use timebox_exec::SerialMode;
use timebox_model::{Intensity, Strategy, SubmitRequest};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("TIMEBOX_WORKLOAD=command needs TIMEBOX_COMMAND")]
    MissingCommand,
}

/// Which built-in workload the worker runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadKind {
    Sum,
    /// Whitespace separated program and arguments.
    Command(String),
}

/// Worker settings, read once at start.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub iterations: u32,
    pub intensity: Intensity,
    pub deadline_secs: f64,
    pub strategy: Strategy,
    pub cleanup_children: bool,
    pub threads: usize,
    pub lock: SerialMode,
    pub workload: WorkloadKind,
    pub log_level: String,
    pub log_format: String,
    pub http_addr: Option<SocketAddr>,
    pub run_on_start: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            intensity: 500_000_000,
            deadline_secs: 2.0,
            strategy: Strategy::from_signals(false),
            cleanup_children: false,
            threads: 1,
            lock: SerialMode::Serialized,
            workload: WorkloadKind::Sum,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            http_addr: None,
            run_on_start: true,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("TIMEBOX_ITERATIONS") {
            cfg.iterations = parse("TIMEBOX_ITERATIONS", &v)?;
        }
        if let Some(v) = get("TIMEBOX_INTENSITY") {
            cfg.intensity = parse("TIMEBOX_INTENSITY", &v)?;
        }
        if let Some(v) = get("TIMEBOX_DEADLINE") {
            cfg.deadline_secs = parse("TIMEBOX_DEADLINE", &v)?;
        }
        if let Some(v) = get("TIMEBOX_USE_SIGNALS") {
            cfg.strategy = Strategy::from_signals(flag("TIMEBOX_USE_SIGNALS", &v)?);
        }
        // A strategy name wins over the signals switch.
        if let Some(v) = get("TIMEBOX_STRATEGY") {
            cfg.strategy = parse("TIMEBOX_STRATEGY", &v)?;
        }
        if let Some(v) = get("TIMEBOX_CLEANUP_CHILDREN") {
            cfg.cleanup_children = flag("TIMEBOX_CLEANUP_CHILDREN", &v)?;
        }
        if let Some(v) = get("TIMEBOX_THREADS") {
            cfg.threads = parse("TIMEBOX_THREADS", &v)?;
        }
        if let Some(v) = get("TIMEBOX_LOCK") {
            cfg.lock = v.parse().map_err(|reason| invalid("TIMEBOX_LOCK", &v, reason))?;
        }
        if let Some(v) = get("TIMEBOX_WORKLOAD") {
            cfg.workload = match v.trim().to_ascii_lowercase().as_str() {
                "sum" => WorkloadKind::Sum,
                "command" | "cmd" => {
                    WorkloadKind::Command(get("TIMEBOX_COMMAND").ok_or(ConfigError::MissingCommand)?)
                }
                _ => return Err(invalid("TIMEBOX_WORKLOAD", &v, "expected sum|command")),
            };
        }
        if let Some(v) = get("TIMEBOX_LOG_LEVEL") {
            cfg.log_level = v;
        }
        if let Some(v) = get("TIMEBOX_LOG_FORMAT") {
            cfg.log_format = v;
        }
        if let Some(v) = get("TIMEBOX_HTTP_ADDR") {
            cfg.http_addr = Some(parse("TIMEBOX_HTTP_ADDR", &v)?);
        }
        if let Some(v) = get("TIMEBOX_RUN_ON_START") {
            cfg.run_on_start = flag("TIMEBOX_RUN_ON_START", &v)?;
        }

        Ok(cfg)
    }

    /// The invocation submitted at start when `run_on_start` is set.
    pub fn startup_request(&self) -> SubmitRequest {
        SubmitRequest {
            iterations: self.iterations,
            intensity: self.intensity,
            deadline_secs: self.deadline_secs,
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value.trim().parse().map_err(|e| invalid(var, value, e))
}

fn flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected 0 or 1")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AgentConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg, AgentConfig::default());
        assert_eq!(cfg.strategy, Strategy::Preemptive);
        assert_eq!(cfg.startup_request().iterations, 10);
    }

    #[test]
    fn reads_every_knob() {
        let cfg = load(&[
            ("TIMEBOX_ITERATIONS", "3"),
            ("TIMEBOX_INTENSITY", "42"),
            ("TIMEBOX_DEADLINE", "0.5"),
            ("TIMEBOX_USE_SIGNALS", "1"),
            ("TIMEBOX_CLEANUP_CHILDREN", "1"),
            ("TIMEBOX_THREADS", "4"),
            ("TIMEBOX_LOCK", "free"),
            ("TIMEBOX_WORKLOAD", "command"),
            ("TIMEBOX_COMMAND", "sleep {intensity}"),
            ("TIMEBOX_LOG_LEVEL", "debug"),
            ("TIMEBOX_LOG_FORMAT", "json"),
            ("TIMEBOX_HTTP_ADDR", "127.0.0.1:8085"),
            ("TIMEBOX_RUN_ON_START", "0"),
        ])
        .unwrap();

        assert_eq!(cfg.iterations, 3);
        assert_eq!(cfg.intensity, 42);
        assert_eq!(cfg.deadline_secs, 0.5);
        assert_eq!(cfg.strategy, Strategy::Cooperative);
        assert!(cfg.cleanup_children);
        assert_eq!(cfg.threads, 4);
        assert_eq!(cfg.lock, SerialMode::Free);
        assert_eq!(cfg.workload, WorkloadKind::Command("sleep {intensity}".into()));
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.http_addr, Some("127.0.0.1:8085".parse().unwrap()));
        assert!(!cfg.run_on_start);
    }

    #[test]
    fn blank_values_keep_defaults() {
        let cfg = load(&[("TIMEBOX_ITERATIONS", "  "), ("TIMEBOX_HTTP_ADDR", "")]).unwrap();
        assert_eq!(cfg.iterations, 10);
        assert!(cfg.http_addr.is_none());
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = load(&[("TIMEBOX_ITERATIONS", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TIMEBOX_ITERATIONS", .. }));

        let err = load(&[("TIMEBOX_USE_SIGNALS", "maybe")]).unwrap_err();
        assert!(err.to_string().starts_with("TIMEBOX_USE_SIGNALS="));

        let err = load(&[("TIMEBOX_LOCK", "sometimes")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TIMEBOX_LOCK", .. }));
    }

    #[test]
    fn strategy_name_overrides_signals_switch() {
        let cfg = load(&[("TIMEBOX_USE_SIGNALS", "1"), ("TIMEBOX_STRATEGY", "Preemptive")]).unwrap();
        assert_eq!(cfg.strategy, Strategy::Preemptive);

        let cfg = load(&[("TIMEBOX_STRATEGY", "cooperative")]).unwrap();
        assert_eq!(cfg.strategy, Strategy::Cooperative);

        let err = load(&[("TIMEBOX_STRATEGY", "eventually")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TIMEBOX_STRATEGY", .. }));
        assert!(err.to_string().contains("eventually"));
    }

    #[test]
    fn command_workload_requires_command() {
        assert_eq!(
            load(&[("TIMEBOX_WORKLOAD", "command")]).unwrap_err(),
            ConfigError::MissingCommand
        );
    }
}
