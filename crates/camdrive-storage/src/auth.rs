//! Service-account credentials and OAuth2 access tokens.
//!
//! Tokens are obtained with the JWT-bearer grant: a claim set signed with the
//! service account's RSA key is exchanged at the key's `token_uri`. Setting
//! the `sub` claim requests a token for a workspace user instead
//! (domain-wide delegation).

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::traits::{DriveError, DriveResult};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: u64 = 60;

/// Raw service-account key file as downloaded from the cloud console
#[derive(Deserialize)]
struct KeyFile {
    #[serde(rename = "type")]
    key_type: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    private_key_id: Option<String>,
    token_uri: Option<String>,
}

/// Parsed service-account key, loaded once at startup and shared read-only
#[derive(Clone)]
pub struct ServiceAccountKey {
    client_email: String,
    private_key_id: Option<String>,
    token_uri: String,
    signing_key: EncodingKey,
}

impl Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Load and validate a key file
    pub async fn from_file(path: impl AsRef<Path>) -> DriveResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            DriveError::Config(format!(
                "Failed to read service account key {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Parse and validate a key from its JSON text
    pub fn from_json(json: &str) -> DriveResult<Self> {
        let file: KeyFile = serde_json::from_str(json)
            .map_err(|e| DriveError::Config(format!("Failed to parse service account key: {}", e)))?;

        match file.key_type.as_deref() {
            Some("service_account") => {}
            other => {
                return Err(DriveError::Config(format!(
                    "Unsupported credential type: {}",
                    other.unwrap_or("<missing>")
                )))
            }
        }

        let client_email = file
            .client_email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| DriveError::Config("Missing client_email in service account key".to_string()))?;
        let private_key = file
            .private_key
            .ok_or_else(|| DriveError::Config("Missing private_key in service account key".to_string()))?;
        let signing_key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| DriveError::Config(format!("Invalid private_key: {}", e)))?;

        Ok(Self {
            client_email,
            private_key_id: file.private_key_id,
            token_uri: file
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            signing_key,
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Build a signed JWT assertion for `scope`, optionally on behalf of `subject`.
    pub fn sign_assertion(&self, scope: &str, subject: Option<&str>) -> DriveResult<String> {
        let issued_at = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
            sub: subject,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        encode(&header, &claims, &self.signing_key)
            .map_err(|e| DriveError::Auth(format!("Failed to sign assertion: {}", e)))
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Source of bearer tokens for drive requests
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a valid access token, refreshing it when needed
    async fn access_token(&self) -> DriveResult<String>;
}

/// Cached access token with expiry.
struct CachedToken {
    access_token: String,
    expiry: Instant,
}

/// Token source backed by a service-account key
pub struct ServiceAccountTokenSource {
    http: reqwest::Client,
    key: Arc<ServiceAccountKey>,
    scope: String,
    subject: Option<String>,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(
        http: reqwest::Client,
        key: Arc<ServiceAccountKey>,
        scope: impl Into<String>,
        subject: Option<String>,
    ) -> Self {
        Self {
            http,
            key,
            scope: scope.into(),
            subject,
            cache: Mutex::new(None),
        }
    }

    async fn fetch_token(&self) -> DriveResult<(String, u64)> {
        let assertion = self
            .key
            .sign_assertion(&self.scope, self.subject.as_deref())?;

        let response = self
            .http
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| self.failure(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("token endpoint returned {}: {}", status, body),
            };
            return Err(self.failure(message));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(format!("Malformed token response: {}", e)))?;

        Ok((token.access_token, token.expires_in.unwrap_or(3600)))
    }

    fn failure(&self, message: String) -> DriveError {
        match self.subject {
            Some(ref account) => DriveError::Delegation {
                account: account.clone(),
                message,
            },
            None => DriveError::Auth(message),
        }
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> DriveResult<String> {
        let mut cache = self.cache.lock().await;
        if let Some(ref cached) = *cache {
            if cached.expiry > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let (token, expires_in) = self.fetch_token().await?;
        tracing::debug!(
            subject = ?self.subject,
            expires_in_secs = expires_in,
            "Obtained drive access token"
        );

        *cache = Some(CachedToken {
            access_token: token.clone(),
            expiry: Instant::now() + Duration::from_secs(expires_in.saturating_sub(EXPIRY_MARGIN_SECS)),
        });

        Ok(token)
    }
}
