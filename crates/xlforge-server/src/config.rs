use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use xlforge_plan::prompt::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory holding the workbook and its backups
    pub data_dir: PathBuf,
    /// Workbook file name inside `data_dir`
    pub excel_file: String,
    /// Backup copies retained on save
    pub max_backups: usize,
    pub ai: AiConfig,
}

/// AI provider settings
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Provider key. AI routes are disabled without it.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 3001)?;
        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let excel_file = lookup("EXCEL_FILE").unwrap_or_else(|| "store-data.xlsx".to_string());
        let max_backups = parse_or(&lookup, "MAX_BACKUPS", 5)?;

        let ai = AiConfig {
            api_key: lookup("ANTHROPIC_API_KEY").filter(|key| !key.trim().is_empty()),
            api_url: lookup("ANTHROPIC_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model: lookup("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: parse_or(&lookup, "AI_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            excel_file,
            max_backups,
            ai,
        })
    }

    /// Full path of the hosted workbook
    pub fn file_path(&self) -> PathBuf {
        self.data_dir.join(&self.excel_file)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.file_path(), PathBuf::from("data").join("store-data.xlsx"));
        assert_eq!(config.max_backups, 5);
        assert_eq!(config.ai.api_key, None);
        assert_eq!(config.ai.api_url, DEFAULT_API_URL);
        assert_eq!(config.ai.max_tokens, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "8080"),
            ("EXCEL_FILE", "stores.xlsx"),
            ("MAX_BACKUPS", "2"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.excel_file, "stores.xlsx");
        assert_eq!(config.max_backups, 2);
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_invalid_numbers_fail() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("MAX_BACKUPS", "-1")]).is_err());
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = config(&[("ANTHROPIC_API_KEY", "  ")]).unwrap();
        assert!(config.ai.api_key.is_none());
    }
}
