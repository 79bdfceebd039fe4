//! Application settings.
//!
//! Read from `config/telemoney.toml` (or `--config`), then overridden by
//! `TELEMONEY__SECTION__KEY` environment variables. See
//! `config/telemoney.example.toml` for the keys.

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use sheets::Credentials;

const DEFAULT_CONFIG_PATH: &str = "config/telemoney.toml";
const DEFAULT_SHEET: &str = "Transactions";

const TELEGRAM_TOKEN_ENV: &str = "TG_BOT_TOKEN";
const GOOGLE_CREDENTIALS_ENV: &str = "GAUTH_TOKEN";
const GOOGLE_ACCESS_TOKEN_ENV: &str = "GSHEETS_ACCESS_TOKEN";

#[derive(Debug, Parser)]
#[command(name = "telemoney")]
#[command(about = "Telegram bot that records expenses in a Google spreadsheet")]
pub struct Args {
    /// Config file path (TOML).
    #[arg(long, env = "TELEMONEY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    /// Override `app.level` (e.g. debug).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Prod,
    #[default]
    Test,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
    pub env: Env,
    pub timezone: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            env: Env::default(),
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Telegram {
    pub token: String,
    pub allowed_users: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Sheets {
    pub spreadsheet_id: String,
    pub transaction_sheet: String,
    pub transaction_sheet_test: Option<String>,
    pub base_url: Option<String>,
    /// Base64 of a `service_account` or `authorized_user` JSON. Falls back to
    /// `GAUTH_TOKEN`.
    pub credentials: Option<String>,
}

impl Sheets {
    pub fn transaction_sheet(&self, env: Env) -> &str {
        match (env, &self.transaction_sheet_test) {
            (Env::Test, Some(test)) => test,
            _ => &self.transaction_sheet,
        }
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let encoded = self
            .credentials
            .clone()
            .or_else(|| std::env::var(GOOGLE_CREDENTIALS_ENV).ok());
        if let Some(encoded) = encoded {
            return Credentials::from_base64(&encoded)
                .map_err(|err| ConfigError::Message(format!("storage.credentials: {err}")));
        }

        std::env::var(GOOGLE_ACCESS_TOKEN_ENV)
            .map(Credentials::AccessToken)
            .map_err(|_| {
                ConfigError::Message(format!(
                    "missing Google credentials: set storage.credentials, \
                     {GOOGLE_CREDENTIALS_ENV} or {GOOGLE_ACCESS_TOKEN_ENV}"
                ))
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Storage {
    Memory {
        #[serde(default = "default_sheet")]
        transaction_sheet: String,
    },
    Sheets(Sheets),
}

impl Default for Storage {
    fn default() -> Self {
        Self::Memory {
            transaction_sheet: default_sheet(),
        }
    }
}

fn default_sheet() -> String {
    DEFAULT_SHEET.to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub telegram: Telegram,
    pub storage: Storage,
}

impl Settings {
    pub fn new(args: &Args) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(&args.config).required(false))
            .add_source(
                Environment::with_prefix("TELEMONEY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("telegram.allowed_users")
                    .try_parsing(true),
            );
        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Some(level) = &args.log_level {
            settings.app.level = level.clone();
        }
        if settings.telegram.token.is_empty()
            && let Ok(token) = std::env::var(TELEGRAM_TOKEN_ENV)
        {
            settings.telegram.token = token;
        }

        Ok(settings)
    }
}
