use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::CogError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// An authorized user token file as written by the Google OAuth tooling.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default, alias = "token")]
    pub access_token: Option<String>,
    #[serde(default, rename = "token_expiry", alias = "expiry")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl Credentials {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            CogError::MissingConfig(format!("sheets credentials {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expiry) {
            (Some(_), Some(expiry)) => expiry - Duration::seconds(60) > now,
            _ => false,
        }
    }
}

/// HTTP client plus the credentials needed to talk to the Sheets API.
pub struct SheetsClient {
    pub(crate) http: reqwest::Client,
    creds: Mutex<Credentials>,
}

impl SheetsClient {
    pub fn new(creds: Credentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            creds: Mutex::new(creds),
        }
    }

    /// A valid access token, refreshed through the token endpoint when stale.
    pub async fn access_token(&self) -> Result<String> {
        let mut creds = self.creds.lock().await;
        let now = Utc::now();
        if creds.is_fresh(now) {
            if let Some(token) = &creds.access_token {
                return Ok(token.clone());
            }
        }

        debug!("Refreshing sheets access token");
        let resp = self
            .http
            .post(&creds.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
                ("refresh_token", creds.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CogError::Remote {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }
            .into());
        }

        let token: TokenResponse = resp.json().await?;
        info!("Sheets access token refreshed, valid for {}s", token.expires_in);
        creds.expiry = Some(now + Duration::seconds(token.expires_in));
        creds.access_token = Some(token.access_token.clone());

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authorized_user_file() {
        let creds: Credentials = serde_json::from_str(
            r#"{
                "type": "authorized_user",
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "secret",
                "refresh_token": "1//refresh"
            }"#,
        )
        .unwrap();

        assert_eq!(creds.token_uri, DEFAULT_TOKEN_URI);
        assert!(creds.access_token.is_none());
        assert!(!creds.is_fresh(Utc::now()));
    }

    #[test]
    fn freshness_has_margin() {
        let now = Utc::now();
        let mut creds: Credentials = serde_json::from_str(
            r#"{"client_id": "a", "client_secret": "b", "refresh_token": "c", "token": "t"}"#,
        )
        .unwrap();

        creds.expiry = Some(now + Duration::seconds(30));
        assert!(!creds.is_fresh(now));

        creds.expiry = Some(now + Duration::seconds(600));
        assert!(creds.is_fresh(now));
    }

    #[test]
    fn stored_token_reused_until_expiry() {
        let creds: Credentials = serde_json::from_str(
            r#"{
                "client_id": "a",
                "client_secret": "b",
                "refresh_token": "c",
                "access_token": "ya29.cached",
                "token_expiry": "2023-03-09T07:00:00Z"
            }"#,
        )
        .unwrap();

        let before = "2023-03-09T06:00:00Z".parse().unwrap();
        let after = "2023-03-09T07:30:00Z".parse().unwrap();
        assert!(creds.is_fresh(before));
        assert!(!creds.is_fresh(after));
    }
}
