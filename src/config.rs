//! Configuration management for the swap submitter
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at the configuration file
pub const CONFIG_ENV_VAR: &str = "SWAP_SUBMITTER_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub swap: SwapConfig,
    pub submitter: SubmitterConfig,
    pub chain: ChainConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapConfig {
    /// Endpoint returning `{ validatedSwapTransaction }` for an approved intent
    pub execute_swap_url: String,
    /// Maximum drift between price and guaranteed price, in percent
    pub max_slippage_percent: f64,
    #[serde(default = "default_quote_timeout_ms")]
    pub quote_timeout_ms: u64,
}

impl SwapConfig {
    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }
}

fn default_quote_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitterConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// How long finished swaps stay queryable
    #[serde(default = "default_record_ttl_secs")]
    pub record_ttl_secs: u64,
}

fn default_record_ttl_secs() -> u64 {
    3_600
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_urls: Vec<String>,
    pub gas_price_strategy: GasPriceStrategy,
    pub max_gas_price_gwei: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceStrategy {
    Legacy,
    Eip1559,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the hex private key
    pub private_key_env: String,
}

impl Settings {
    /// Load settings from the file named by `SWAP_SUBMITTER_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse settings from TOML text, substituting `${VAR}` references first
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chain.rpc_urls.is_empty() {
            anyhow::bail!("Chain {} has no RPC URLs configured", self.chain.name);
        }

        if self.swap.execute_swap_url.is_empty() {
            anyhow::bail!("swap.execute_swap_url must be set");
        }

        if !(self.swap.max_slippage_percent > 0.0) {
            anyhow::bail!(
                "swap.max_slippage_percent must be positive, got {}",
                self.swap.max_slippage_percent
            );
        }

        if self.submitter.max_retries == 0 {
            anyhow::bail!("submitter.max_retries must be at least 1");
        }

        if self.swap.max_slippage_percent > 50.0 {
            tracing::warn!(
                "Slippage tolerance of {}% is unusually high",
                self.swap.max_slippage_percent
            );
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern");
    }

    let mut result = input.to_string();

    for cap in ENV_VAR.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[swap]
execute_swap_url = "https://api.example.com/${SWAP_TEST_PATH}/execute"
max_slippage_percent = 2.0

[submitter]
max_retries = 3
retry_delay_ms = 500

[chain]
chain_id = 42220
name = "celo"
rpc_urls = ["https://forno.celo.org"]
gas_price_strategy = "legacy"
max_gas_price_gwei = 50

[api]
host = "127.0.0.1"
port = 8080

[metrics]
enabled = false
port = 9090

[wallet]
private_key_env = "SWAP_PRIVATE_KEY"
"#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_parse_sample_with_defaults() {
        env::set_var("SWAP_TEST_PATH", "v2");
        let settings = Settings::from_toml_str(SAMPLE).unwrap();

        assert_eq!(
            settings.swap.execute_swap_url,
            "https://api.example.com/v2/execute"
        );
        assert_eq!(settings.swap.quote_timeout(), Duration::from_secs(30));
        assert_eq!(settings.submitter.send_timeout_secs, 30);
        assert_eq!(settings.chain.gas_price_strategy, GasPriceStrategy::Legacy);
        assert_eq!(settings.api.record_ttl_secs, 3_600);
    }

    #[test]
    fn test_rejects_non_positive_slippage() {
        let input = SAMPLE.replace("max_slippage_percent = 2.0", "max_slippage_percent = 0.0");
        assert!(Settings::from_toml_str(&input).is_err());
    }

    #[test]
    fn test_rejects_missing_rpc_urls() {
        let input = SAMPLE.replace(r#"["https://forno.celo.org"]"#, "[]");
        assert!(Settings::from_toml_str(&input).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.chain.chain_id, 42220);
        assert_eq!(settings.api.port, 8080);
    }
}
