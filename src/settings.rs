use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{EtlError, Result};

const DEFAULT_CONFIG_FILE: &str = "insurance_etl.toml";
const ENV_PREFIX: &str = "INSURANCE_ETL";

/// Runtime settings, resolved from defaults, an optional TOML file and the environment.
#[derive(Clone, Deserialize)]
pub struct Settings {
    pub supabase_url: Option<String>,
    pub supabase_api_key: Option<String>,
    pub warehouse_db: PathBuf,
    pub capture_db: PathBuf,
    pub model_path: Option<PathBuf>,
    pub http_timeout_secs: u64,
}

/// BaaS endpoint and key, only available once both are configured.
#[derive(Clone)]
pub struct Credentials {
    pub base_url: String,
    pub api_key: String,
}

impl Settings {
    /// Layering: defaults < config file < `INSURANCE_ETL_*` < bare `SUPABASE_*` variables.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file = match config_file {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("warehouse_db", "data/warehouse.sqlite")
            .and_then(|b| b.set_default("capture_db", "user_data.db"))
            .and_then(|b| b.set_default("http_timeout_secs", 30_i64))
            .map_err(config_error)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("supabase_url", std::env::var("SUPABASE_URL").ok())
            .and_then(|b| {
                b.set_override_option(
                    "supabase_api_key",
                    std::env::var("SUPABASE_CLIENT_API_KEY").ok(),
                )
            })
            .map_err(config_error)?
            .build()
            .map_err(config_error)?;

        settings.try_deserialize().map_err(config_error)
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let base_url = self
            .supabase_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| EtlError::Config("SUPABASE_URL is not set".into()))?;
        let api_key = self
            .supabase_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| EtlError::Config("SUPABASE_CLIENT_API_KEY is not set".into()))?;
        Ok(Credentials {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

// Keeps the API key out of log lines.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("supabase_url", &self.supabase_url)
            .field(
                "supabase_api_key",
                &self.supabase_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("warehouse_db", &self.warehouse_db)
            .field("capture_db", &self.capture_db)
            .field("model_path", &self.model_path)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

fn config_error(e: config::ConfigError) -> EtlError {
    EtlError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> Settings {
        Settings {
            supabase_url: None,
            supabase_api_key: None,
            warehouse_db: PathBuf::from("w.sqlite"),
            capture_db: PathBuf::from("c.sqlite"),
            model_path: None,
            http_timeout_secs: 30,
        }
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "warehouse_db = \"/tmp/wh.sqlite\"\nhttp_timeout_secs = 5\nmodel_path = \"model.json\"\n",
        )
        .unwrap();

        let s = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(s.warehouse_db, PathBuf::from("/tmp/wh.sqlite"));
        assert_eq!(s.capture_db, PathBuf::from("user_data.db"));
        assert_eq!(s.http_timeout_secs, 5);
        assert_eq!(s.model_path, Some(PathBuf::from("model.json")));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn credentials_require_url_and_key() {
        let mut s = bare();
        assert!(matches!(s.credentials(), Err(EtlError::Config(_))));

        s.supabase_url = Some("https://example.supabase.co/".into());
        assert!(matches!(s.credentials(), Err(EtlError::Config(_))));

        s.supabase_api_key = Some("anon-key".into());
        let c = s.credentials().unwrap();
        assert_eq!(c.base_url, "https://example.supabase.co");
        assert_eq!(c.api_key, "anon-key");
    }

    #[test]
    fn debug_output_redacts_key() {
        let mut s = bare();
        s.supabase_api_key = Some("super-secret".into());
        let printed = format!("{:?}", s);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
