//! Settings / Configuration.

use crate::paths::{config_file, default_session_file};
use anyhow::Result;
use config::{Config, Environment, File};
use devdine_core::email::EmailPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Where the server runs unless configured otherwise
pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:3000";

/// CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// server address
    pub api_endpoint: Url,
    /// where the session state is kept
    pub session_file: PathBuf,
    /// Accepted top-level domains for email addresses. Empty accepts any.
    pub allowed_tlds: Vec<String>,
}

impl Settings {
    /// Load settings from defaults, the settings file and `DEVDINE_CLI_*`
    /// environment variables, in increasing priority.
    ///
    /// An explicitly given `config_path` has to exist, the default one doesn't.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let (path, required) = match config_path {
            Some(path) => (path, true),
            None => (config_file()?, false),
        };

        let s = Config::builder()
            .set_default("api_endpoint", DEFAULT_API_ENDPOINT)?
            .set_default(
                "session_file",
                default_session_file()?.display().to_string(),
            )?
            .set_default("allowed_tlds", vec!["com", "net", "org"])?
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix("DEVDINE_CLI")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_tlds"),
            )
            .build()?;

        Ok(s.try_deserialize()?)
    }

    /// The [EmailPolicy] described by these settings.
    pub fn email_policy(&self) -> EmailPolicy {
        EmailPolicy::new(&self.allowed_tlds)
    }
}
