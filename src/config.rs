use crate::error::{PipelineError, Result};
use crate::loader::FieldMap;
use crate::types::ServiceKey;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "lgu.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub resource_id: String,
    /// Name of the environment variable holding the bearer token.
    pub token_env: String,
    pub timeout_seconds: u64,
    pub sheets: BTreeMap<ServiceKey, String>,
    pub columns: BTreeMap<ServiceKey, FieldMap>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            resource_id: "18kaPQlN0_kA9i7YAD-DftbdVPZX35Qf33sVMkw_TcWc".to_string(),
            token_env: "SHEETS_TOKEN".to_string(),
            timeout_seconds: 30,
            sheets: BTreeMap::new(),
            columns: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from `path`, or from `lgu.toml` when it exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Config::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn sheet_name(&self, service: ServiceKey) -> String {
        self.sheets
            .get(&service)
            .cloned()
            .unwrap_or_else(|| service.default_sheet().to_string())
    }

    pub fn field_map(&self, service: ServiceKey) -> FieldMap {
        self.columns.get(&service).copied().unwrap_or_default()
    }

    pub fn field_maps(&self) -> BTreeMap<ServiceKey, FieldMap> {
        ServiceKey::ALL.into_iter().map(|s| (s, self.field_map(s))).collect()
    }

    /// Bearer token from the environment, after reading `.env` if present.
    pub fn token(&self) -> Result<String> {
        dotenv::dotenv().ok();
        match std::env::var(&self.token_env) {
            Ok(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
            _ => Err(PipelineError::MissingToken(self.token_env.clone())),
        }
    }
}
