//! OAuth credentials for the Sheets API.
//!
//! Three forms are accepted:
//!
//! - a ready bearer token ([`Credentials::AccessToken`]), used as-is;
//! - an `authorized_user` JSON, the format written by
//!   `gcloud auth application-default login`, whose refresh token is exchanged
//!   for short-lived access tokens on demand;
//! - a `service_account` JSON key, which signs an RS256 assertion and trades
//!   it for an access token (the JWT bearer grant).

use std::{
    fmt,
    time::{Duration, Instant},
};

use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::SheetsError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Google caps assertions at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("credentials are not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("credentials are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid service account private key: {0}")]
    PrivateKey(#[source] jsonwebtoken::errors::Error),
    #[error(
        "unsupported credentials type \"{0}\", expected \"authorized_user\" or \"service_account\""
    )]
    UnsupportedType(String),
}

#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service account key file we use.
#[derive(Deserialize)]
struct ServiceAccountFile {
    client_email: String,
    private_key: String,
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key_id: Option<String>,
    pub token_uri: String,
    key: EncodingKey,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceAccount {
    fn from_file(file: ServiceAccountFile) -> Result<Self, CredentialsError> {
        let key = EncodingKey::from_rsa_pem(file.private_key.as_bytes())
            .map_err(CredentialsError::PrivateKey)?;
        Ok(Self {
            client_email: file.client_email,
            private_key_id: file.private_key_id,
            token_uri: file.token_uri,
            key,
        })
    }

    /// Signed JWT asking for [`SPREADSHEETS_SCOPE`], issued at `now` (unix
    /// seconds).
    fn assertion(&self, now: i64) -> Result<String, jsonwebtoken::errors::Error> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.private_key_id);

        let claims = Claims {
            iss: &self.client_email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&header, &claims, &self.key)
    }
}

#[derive(Clone)]
pub enum Credentials {
    AccessToken(String),
    AuthorizedUser(AuthorizedUser),
    ServiceAccount(ServiceAccount),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(..)"),
            Self::AuthorizedUser(user) => f.debug_tuple("AuthorizedUser").field(user).finish(),
            Self::ServiceAccount(account) => {
                f.debug_tuple("ServiceAccount").field(account).finish()
            }
        }
    }
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    rest: serde_json::Value,
}

impl Credentials {
    /// Parses a credentials JSON document.
    pub fn from_json(json: &str) -> Result<Self, CredentialsError> {
        let file: CredentialsFile = serde_json::from_str(json)?;
        match file.kind.as_str() {
            "authorized_user" => Ok(Self::AuthorizedUser(serde_json::from_value(file.rest)?)),
            "service_account" => {
                let file: ServiceAccountFile = serde_json::from_value(file.rest)?;
                Ok(Self::ServiceAccount(ServiceAccount::from_file(file)?))
            }
            _ => Err(CredentialsError::UnsupportedType(file.kind)),
        }
    }

    /// Parses a base64-encoded credentials JSON, as stored in `GAUTH_TOKEN`.
    pub fn from_base64(encoded: &str) -> Result<Self, CredentialsError> {
        let raw = base64::prelude::BASE64_STANDARD.decode(encoded.trim())?;
        let json = String::from_utf8_lossy(&raw);
        Self::from_json(&json)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Hands out bearer tokens, refreshing them when needed.
pub(crate) struct TokenSource {
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSource")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    pub(crate) fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub(crate) async fn token(&self, client: &Client) -> Result<String, SheetsError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let request = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::AuthorizedUser(user) => {
                tracing::debug!(client_id = %user.client_id, "refreshing sheets access token");
                client.post(&user.token_uri).form(&[
                    ("grant_type", "refresh_token"),
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", user.refresh_token.as_str()),
                ])
            }
            Credentials::ServiceAccount(account) => {
                tracing::debug!(
                    client_email = %account.client_email,
                    "requesting sheets access token"
                );
                let assertion = account.assertion(Utc::now().timestamp())?;
                client.post(&account.token_uri).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ])
            }
        };

        let resp = request.send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Token { status, message });
        }

        let token: TokenResponse = resp.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}
