use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::PromptPairError;
use crate::params::GenerationParameters;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_BIND: &str = "127.0.0.1:7860";
pub const DEFAULT_NUM_PAIRS: usize = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Process-wide settings, resolved once at startup.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub bind: String,
    pub num_pairs: usize,
    pub timeout: Duration,
    /// Values the form starts out with.
    pub defaults: GenerationParameters,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("bind", &self.bind)
            .field("num_pairs", &self.num_pairs)
            .field("timeout", &self.timeout)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            num_pairs: DEFAULT_NUM_PAIRS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            defaults: GenerationParameters::default(),
        }
    }
}

/// Optional TOML overlay (`PROMPTPAIR_CONFIG`).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub form: Option<FormSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct FormSection {
    pub num_pairs: Option<usize>,
    #[serde(flatten)]
    pub defaults: GenerationParameters,
}

impl Config {
    /// Environment plus the TOML file named by `PROMPTPAIR_CONFIG`, if any.
    /// Environment variables win over file values.
    pub fn load() -> Result<Self, PromptPairError> {
        let file = match env::var("PROMPTPAIR_CONFIG") {
            Ok(path) => Some(FileConfig::read(Path::new(&path))?),
            Err(_) => None,
        };

        let mut config = Self::default();
        if let Some(file) = file {
            config.apply_file(file)?;
        }
        config.apply_env(|name| env::var(name).ok())?;
        config.log_warnings();
        Ok(config)
    }

    /// Build from an arbitrary variable lookup, without the TOML overlay.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PromptPairError> {
        let mut config = Self::default();
        config.apply_env(lookup)?;
        config.log_warnings();
        Ok(config)
    }

    pub fn apply_file(&mut self, file: FileConfig) -> Result<(), PromptPairError> {
        if let Some(bind) = file.server.bind {
            self.bind = bind;
        }
        if let Some(base_url) = file.server.base_url {
            self.base_url = base_url;
        }
        if let Some(secs) = file.server.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(form) = file.form {
            if let Some(n) = form.num_pairs {
                self.num_pairs = check_num_pairs(n)?;
            }
            form.defaults.validate().map_err(|e| {
                PromptPairError::Config(format!("invalid [form] defaults: {e}"))
            })?;
            self.defaults = form.defaults;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), PromptPairError> {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("PROMPTPAIR_BASE_URL") {
            self.base_url = url;
        }
        if let Some(bind) = lookup("PROMPTPAIR_BIND") {
            self.bind = bind;
        }
        if let Some(raw) = lookup("PROMPTPAIR_NUM_PAIRS") {
            let n = raw.trim().parse::<usize>().map_err(|e| {
                PromptPairError::Config(format!("PROMPTPAIR_NUM_PAIRS: {e}"))
            })?;
            self.num_pairs = check_num_pairs(n)?;
        }
        if let Some(raw) = lookup("PROMPTPAIR_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                PromptPairError::Config(format!("PROMPTPAIR_TIMEOUT_SECS: {e}"))
            })?;
            self.timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    fn log_warnings(&self) {
        if self.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, every request will fail");
        }
    }
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, PromptPairError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PromptPairError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, PromptPairError> {
        toml::from_str(raw).map_err(|e| PromptPairError::Config(e.to_string()))
    }
}

fn check_num_pairs(n: usize) -> Result<usize, PromptPairError> {
    if n == 0 {
        return Err(PromptPairError::Config(
            "num_pairs must be at least 1".to_string(),
        ));
    }
    Ok(n)
}
