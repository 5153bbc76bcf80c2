// src/config/mod.rs

use crate::interpreter::OperationKind;
use crate::invoker::InvokeOptions;
use anyhow::{Context as _, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "JARVIS_LLM_CONFIG";
pub const BIN_ENV: &str = "JARVIS_LLM_BIN";
pub const MODEL_ENV: &str = "JARVIS_LLM_MODEL";
pub const REFINE_TIMEOUT_ENV: &str = "JARVIS_LLM_REFINE_TIMEOUT_SECS";
pub const EXPLAIN_TIMEOUT_ENV: &str = "JARVIS_LLM_EXPLAIN_TIMEOUT_SECS";
pub const FAILURE_TIMEOUT_ENV: &str = "JARVIS_LLM_FAILURE_TIMEOUT_SECS";

/// Handler configuration, loadable from TOML and overridable from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Inference tool executable, looked up on `PATH` when not a path.
    #[serde(default = "default_program")]
    pub program: PathBuf,
    /// Leading arguments placed before the generated ones.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_true")]
    pub no_stream: bool,
    #[serde(default = "default_true")]
    pub no_log: bool,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Deadlines per operation, in seconds. `0` waits indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_refine_secs")]
    pub refine_secs: u64,
    #[serde(default)]
    pub explain_secs: u64,
    #[serde(default)]
    pub failure_secs: u64,
}

fn default_program() -> PathBuf {
    "llm".into()
}
fn default_true() -> bool {
    true
}
fn default_refine_secs() -> u64 {
    30
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            refine_secs: default_refine_secs(),
            explain_secs: 0,
            failure_secs: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            model: None,
            no_stream: true,
            no_log: true,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file path.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the effective config: file (explicit path, else `JARVIS_LLM_CONFIG`),
    /// then environment overrides. `env` is a variable lookup, normally `std::env::var`.
    pub fn load<F>(path: Option<&Path>, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env(CONFIG_ENV).filter(|p| !p.trim().is_empty()).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, env: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(program) = set(BIN_ENV) {
            self.program = program.into();
        }
        if let Some(model) = set(MODEL_ENV) {
            self.model = Some(model);
        }
        for (key, slot) in [
            (REFINE_TIMEOUT_ENV, &mut self.timeouts.refine_secs),
            (EXPLAIN_TIMEOUT_ENV, &mut self.timeouts.explain_secs),
            (FAILURE_TIMEOUT_ENV, &mut self.timeouts.failure_secs),
        ] {
            if let Some(value) = set(key) {
                *slot = value.parse().map_err(|_| {
                    anyhow!("invalid {key}={value:?} (expected integer seconds; 0 disables)")
                })?;
            }
        }
        Ok(())
    }

    pub fn timeout_for(&self, kind: OperationKind) -> Option<Duration> {
        let secs = match kind {
            OperationKind::Refine => self.timeouts.refine_secs,
            OperationKind::Explain => self.timeouts.explain_secs,
            OperationKind::Failure => self.timeouts.failure_secs,
        };
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    pub fn options_for(&self, kind: OperationKind) -> InvokeOptions {
        InvokeOptions {
            no_stream: self.no_stream,
            no_log: self.no_log,
            extract: kind == OperationKind::Refine,
            timeout: self.timeout_for(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.program, PathBuf::from("llm"));
        assert!(config.args.is_empty());
        assert!(config.model.is_none());
        assert!(config.no_stream);
        assert!(config.no_log);
        assert_eq!(config.timeouts, TimeoutConfig::default());
        assert_eq!(config.timeouts.refine_secs, 30);
    }

    #[test]
    fn deserialize_full_config() {
        let toml = r#"
program = "/usr/local/bin/uvx"
args = ["llm"]
model = "llama3.2"
no_log = false

[timeouts]
refine_secs = 10
explain_secs = 60
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.program, PathBuf::from("/usr/local/bin/uvx"));
        assert_eq!(config.args, ["llm"]);
        assert_eq!(config.model.as_deref(), Some("llama3.2"));
        assert!(config.no_stream);
        assert!(!config.no_log);
        assert_eq!(config.timeouts.refine_secs, 10);
        assert_eq!(config.timeouts.explain_secs, 60);
        assert_eq!(config.timeouts.failure_secs, 0);
    }

    #[test]
    fn only_refinement_has_a_default_deadline() {
        let config = Config::default();
        assert_eq!(
            config.timeout_for(OperationKind::Refine),
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.timeout_for(OperationKind::Explain), None);
        assert_eq!(config.timeout_for(OperationKind::Failure), None);
    }

    #[test]
    fn only_refinement_requests_extraction() {
        let config = Config::default();
        let refine = config.options_for(OperationKind::Refine);
        assert!(refine.extract && refine.no_stream && refine.no_log);
        assert!(!config.options_for(OperationKind::Explain).extract);
        assert!(!config.options_for(OperationKind::Failure).extract);
    }

    #[test]
    fn env_overrides_defaults() {
        let config = Config::load(
            None,
            env_of(&[
                (BIN_ENV, "/opt/llm/bin/llm"),
                (MODEL_ENV, "gpt-4o-mini"),
                (REFINE_TIMEOUT_ENV, "0"),
                (FAILURE_TIMEOUT_ENV, " 45 "),
            ]),
        )
        .unwrap();
        assert_eq!(config.program, PathBuf::from("/opt/llm/bin/llm"));
        assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.timeout_for(OperationKind::Refine), None);
        assert_eq!(
            config.timeout_for(OperationKind::Failure),
            Some(Duration::from_secs(45))
        );
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config = Config::load(None, env_of(&[(BIN_ENV, "  "), (CONFIG_ENV, "")])).unwrap();
        assert_eq!(config.program, PathBuf::from("llm"));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = Config::load(None, env_of(&[(EXPLAIN_TIMEOUT_ENV, "soon")])).unwrap_err();
        assert!(err.to_string().contains(EXPLAIN_TIMEOUT_ENV));
    }

    #[test]
    fn load_reads_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm.toml");
        std::fs::write(&path, "program = \"from-file\"\nmodel = \"file-model\"\n").unwrap();

        let config = Config::load(Some(&path), env_of(&[(MODEL_ENV, "env-model")])).unwrap();
        assert_eq!(config.program, PathBuf::from("from-file"));
        assert_eq!(config.model.as_deref(), Some("env-model"));
    }

    #[test]
    fn load_follows_config_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm.toml");
        std::fs::write(&path, "[timeouts]\nexplain_secs = 5\n").unwrap();

        let config = Config::load(None, env_of(&[(CONFIG_ENV, path.to_str().unwrap())])).unwrap();
        assert_eq!(
            config.timeout_for(OperationKind::Explain),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/llm.toml")), env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
