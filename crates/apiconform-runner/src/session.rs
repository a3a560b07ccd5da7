//! Pre-authenticated HTTP session
//!
//! Local runs use basic auth and accept self-signed certificates; remote runs
//! exchange client credentials for a bearer token once, up front.

use std::time::{Duration, Instant};

use apiconform_core::Config;
use apiconform_core::config::OAuth2;
use serde_json::Value;

/// Anything that can send an authenticated GET.
pub trait Session {
    /// # Errors
    ///
    /// Returns error when no response arrives (connection, TLS).
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<HttpResponse, SessionError>;
}

/// A received response, body already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub elapsed: Duration,
    pub body: String,
}

impl HttpResponse {
    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoder error for non-JSON bodies.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Debug, Clone)]
enum Credentials {
    Anonymous,
    Basic { username: String, password: String },
    Bearer(String),
}

/// reqwest-backed [`Session`].
pub struct HttpSession {
    client: reqwest::blocking::Client,
    credentials: Credentials,
}

impl HttpSession {
    /// Build a session for the mode `config.local_test` selects.
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be built or the token request fails.
    pub fn connect(config: &Config) -> Result<Self, SessionError> {
        // No client timeout: slow responses are judged against the latency bound
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .danger_accept_invalid_certs(config.local_test)
            .build()
            .map_err(|e| SessionError::Client(e.to_string()))?;

        let credentials = if config.local_test {
            match &config.auth.basic_auth {
                Some(basic) => Credentials::Basic {
                    username: basic.username.clone(),
                    password: basic.password.clone(),
                },
                None => Credentials::Anonymous,
            }
        } else {
            match &config.auth.oauth2 {
                Some(oauth2) => Credentials::Bearer(fetch_token(&client, oauth2)?),
                None => Credentials::Anonymous,
            }
        };

        if matches!(credentials, Credentials::Anonymous) {
            tracing::warn!(
                local_test = config.local_test,
                "no credentials configured, sending unauthenticated requests"
            );
        }

        Ok(Self {
            client,
            credentials,
        })
    }
}

/// Client-credentials grant against `token_api_url`.
fn fetch_token(client: &reqwest::blocking::Client, oauth2: &OAuth2) -> Result<String, SessionError> {
    tracing::debug!(url = %oauth2.token_api_url, "requesting access token");

    let form = [
        ("client_id", oauth2.client_id.as_str()),
        ("client_secret", oauth2.client_secret.as_str()),
        ("grant_type", "client_credentials"),
    ];
    let body: Value = client
        .post(&oauth2.token_api_url)
        .form(&form)
        .send()
        .map_err(|e| SessionError::Transport(e.to_string()))?
        .json()
        .map_err(|e| SessionError::InvalidCredentials(format!("token response: {e}")))?;

    token_from_response(&body)
}

fn token_from_response(body: &Value) -> Result<String, SessionError> {
    body.get("access_token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            SessionError::InvalidCredentials("token response has no access_token".to_string())
        })
}

impl Session for HttpSession {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<HttpResponse, SessionError> {
        let mut req = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        req = match &self.credentials {
            Credentials::Anonymous => req,
            Credentials::Basic { username, password } => req.basic_auth(username, Some(password)),
            Credentials::Bearer(token) => req.bearer_auth(token),
        };
        if !params.is_empty() {
            req = req.query(params);
        }

        let start = Instant::now();
        let resp = req
            .send()
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        let elapsed = start.elapsed();

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            elapsed,
            body,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid OAuth2 credentials: {0}")]
    InvalidCredentials(String),
}
