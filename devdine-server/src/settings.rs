//! Settings / Configuration.

use config::{Config, ConfigError, Environment, File};
use devdine_core::email::EmailPolicy;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Names of environments for devdine-server.
/// Overrides serialization to force lower case in settings and
/// environment variables
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    /// Local environment (local testing).
    Local,
    /// Official Develop environment.
    Dev,
    /// Official environment.
    Staging,
    /// Official Production environment.
    Prod,
}

/// Implement display to force environment to lower case
impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{self:?}").to_lowercase())
    }
}

/// Database settings.
#[derive(Clone, Deserialize)]
pub struct Database {
    /// Server URL, without the database name
    pub url: String,
    /// Name of the database holding the users table
    pub name: String,
    /// Connect Timeout in seconds
    pub connect_timeout: u64,
    /// Whether to apply pending migrations on startup
    #[serde(default)]
    pub run_migrations: bool,
}

impl Database {
    /// The full connection URL, including the database name.
    pub fn connection_url(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.name)
    }
}

// Connection strings can carry credentials.
impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("url", &redact_credentials(&self.url))
            .field("name", &self.name)
            .field("connect_timeout", &self.connect_timeout)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

/// Server settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    /// Server [AppEnvironment].
    pub environment: AppEnvironment,
    /// Server port.
    pub port: u16,
    /// Server metrics port.
    pub metrics_port: u16,
    /// Server timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Verification code settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Otp {
    /// How long an issued code stays valid, in seconds.
    pub ttl_seconds: u64,
    /// Mismatching submissions after which a code is thrown away.
    pub max_attempts: u32,
    /// Return issued codes in the response body. Demo shortcut,
    /// ignored in [AppEnvironment::Prod].
    #[serde(default)]
    pub echo_code: bool,
    /// How often expired codes are swept out of memory, in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Otp {
    /// [Otp::ttl_seconds] as a [chrono::Duration].
    pub fn ttl(&self) -> chrono::Duration {
        let seconds = i64::try_from(self.ttl_seconds)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        chrono::Duration::seconds(seconds)
    }

    /// [Otp::sweep_interval_ms] as a [Duration].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

/// Email address acceptance settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Email {
    /// Accepted top-level domains. Empty accepts any.
    #[serde(default)]
    pub allowed_tlds: Vec<String>,
}

impl Email {
    /// The [EmailPolicy] described by these settings.
    pub fn policy(&self) -> EmailPolicy {
        EmailPolicy::new(&self.allowed_tlds)
    }
}

#[derive(Clone, Debug, Deserialize)]
/// Application settings.
pub struct Settings {
    /// Database settings
    pub database: Database,
    /// Server settings
    pub server: Server,
    /// Verification code settings
    pub otp: Otp,
    /// Email acceptance settings
    pub email: Email,
    /// The path where the settings file resides.
    /// This can't actually be configured in the settings file itself, for obvious reasons.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load settings.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = config_path.unwrap_or_else(Self::default_path);
        // inject environment variables naming them properly on the settings
        // e.g. [database] url="foo"
        // would be injected with environment variable DEVDINE_DATABASE__URL="foo"
        let s = Config::builder()
            .add_source(File::with_name(&path.as_path().display().to_string()))
            .add_source(
                Environment::with_prefix("DEVDINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("email.allowed_tlds"),
            )
            .build()?;
        let mut settings: Self = s.try_deserialize()?;
        settings.path = Some(path);
        Ok(settings)
    }

    /// The settings file shipped with the crate.
    pub fn default_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/settings.toml")
    }

    /// Whether issued codes may be returned to the caller.
    pub fn echo_codes(&self) -> bool {
        self.otp.echo_code && self.server.environment != AppEnvironment::Prod
    }
}

/// Replace the `user:password@` portion of a URL, if any.
fn redact_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
