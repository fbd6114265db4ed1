// ⚙️ Configuration - TOML file with built-in defaults
//
// Resolution order for the file: explicit path (CLI flag or
// PAYCHECK_RECON_CONFIG), otherwise defaults only. PORT overrides the bind port.

use crate::breakdown::SourceKind;
use crate::error::{PaycheckError, Result};
use crate::normalizer::LabelVocabulary;
use crate::reconciliation::{ReconciliationEngine, DEFAULT_TOLERANCE_PCT};
use crate::retry::DEFAULT_MAX_ATTEMPTS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_ENV_VAR: &str = "PAYCHECK_RECON_CONFIG";
pub const PORT_ENV_VAR: &str = "PORT";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reconciliation: ReconciliationConfig,
    pub retry: RetryConfig,
    pub server: ServerConfig,
    pub sources: SourcesConfig,
    pub vocabulary: VocabularyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Percentage points of salary
    pub tolerance_pct: f64,
    pub exclude_net_pay: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        ReconciliationConfig {
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
            exclude_net_pay: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Browser worker endpoint for this calculator
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl SourceConfig {
    fn with_endpoint(endpoint: &str) -> Self {
        SourceConfig {
            endpoint: endpoint.to_string(),
            timeout_secs: 90,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::with_endpoint("http://127.0.0.1:4000/calculate")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub payroll: SourceConfig,
    pub consumer: SourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            payroll: SourceConfig::with_endpoint("http://127.0.0.1:4000/calculate/payroll"),
            consumer: SourceConfig::with_endpoint("http://127.0.0.1:4000/calculate/consumer"),
        }
    }
}

impl SourcesConfig {
    pub fn get(&self, source: SourceKind) -> &SourceConfig {
        match source {
            SourceKind::Payroll => &self.payroll,
            SourceKind::Consumer => &self.consumer,
        }
    }
}

/// Optional label overrides; an absent list keeps the built-in one
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub payroll: Option<LabelVocabulary>,
    pub consumer: Option<LabelVocabulary>,
}

impl VocabularyConfig {
    pub fn for_source(&self, source: SourceKind) -> LabelVocabulary {
        let configured = match source {
            SourceKind::Payroll => self.payroll.as_ref(),
            SourceKind::Consumer => self.consumer.as_ref(),
        };
        configured
            .cloned()
            .unwrap_or_else(|| LabelVocabulary::default_for(source))
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from an explicit path, else the env var, else defaults; then apply PORT
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = cli_path {
            Self::load(path)?
        } else if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            Self::load(Path::new(&path))?
        } else {
            AppConfig::default()
        };

        if let Ok(port) = std::env::var(PORT_ENV_VAR) {
            config.apply_port(&port)?;
        }
        Ok(config)
    }

    /// Replace the port of the bind address
    pub fn apply_port(&mut self, port: &str) -> Result<()> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| PaycheckError::Config(format!("invalid PORT: {:?}", port)))?;
        let host = self
            .server
            .bind
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        self.server.bind = format!("{}:{}", host, port);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let tolerance = self.reconciliation.tolerance_pct;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(PaycheckError::Config(format!(
                "reconciliation.tolerance_pct must be a non-negative number, got {}",
                tolerance
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(PaycheckError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        for source in [SourceKind::Payroll, SourceKind::Consumer] {
            if self.sources.get(source).endpoint.trim().is_empty() {
                return Err(PaycheckError::Config(format!("sources.{}.endpoint is empty", source)));
            }
        }
        Ok(())
    }

    pub fn engine(&self) -> ReconciliationEngine {
        ReconciliationEngine::with_options(
            self.reconciliation.tolerance_pct,
            self.reconciliation.exclude_net_pay,
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
