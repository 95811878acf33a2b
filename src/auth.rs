//! Google OAuth for the installed-app flow.
//!
//! Tokens are cached as JSON under the configured cache path. On startup we
//! prefer the cache, fall back to the refresh grant, and only run the
//! browser-based loopback flow when invoked explicitly (`deskpilot auth`).
//!
//! If an authorized email is configured, the id_token's email claim must match
//! it; a mismatch aborts authentication before any document operation runs.
//! The check runs both after the initial login and again after every refresh
//! grant, and a token response without an id_token fails the check outright.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::GoogleConfig;
use crate::error::AuthError;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Expiry slack so a token is refreshed before it actually lapses.
const EXPIRY_MARGIN_SECS: u64 = 60;

/// OAuth client secrets, as downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
struct ClientSecretsFile {
    installed: ClientSecrets,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
}

/// Cached OAuth token state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedToken {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// Unix timestamp after which the access token is stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(at) => now_unix() + EXPIRY_MARGIN_SECS < at,
            None => false,
        }
    }
}

/// Process-wide authenticator. Built once in main and injected into the API
/// clients; holds the cached token behind a lock so concurrent tool calls
/// share one refresh.
pub struct GoogleAuth {
    config: GoogleConfig,
    secrets: ClientSecrets,
    http: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleAuth {
    /// Load client secrets and any cached token from disk.
    pub async fn new(config: GoogleConfig) -> Result<Self, AuthError> {
        let raw = tokio::fs::read_to_string(&config.credentials_path)
            .await
            .map_err(|e| AuthError::CredentialsUnreadable {
                path: config.credentials_path.display().to_string(),
                reason: e.to_string(),
            })?;
        let secrets: ClientSecretsFile =
            serde_json::from_str(&raw).map_err(|e| AuthError::CredentialsUnreadable {
                path: config.credentials_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let token = load_token_cache(&config.token_cache_path).await?;

        Ok(Self {
            config,
            secrets: secrets.installed,
            http: reqwest::Client::new(),
            token: Mutex::new(token),
        })
    }

    /// Get a bearer token, refreshing the cached one if it has gone stale.
    ///
    /// Fails with `NotAuthenticated` when there is no cached token at all;
    /// the browser flow is never started implicitly from a tool call.
    pub async fn bearer_token(&self) -> Result<String, AuthError> {
        let mut guard = self.token.lock().await;

        match guard.as_ref() {
            Some(token) if token.is_fresh() => Ok(token.access_token.clone()),
            Some(token) => {
                let refresh = token.refresh_token.clone().ok_or_else(|| {
                    AuthError::RefreshFailed("cached token has no refresh_token".to_string())
                })?;
                let refreshed = self.refresh(&refresh).await?;
                self.verify_identity(&refreshed)?;
                let access = refreshed.access_token.clone();
                save_token_cache(&self.config.token_cache_path, &refreshed).await?;
                *guard = Some(refreshed);
                Ok(access)
            }
            None => Err(AuthError::NotAuthenticated(
                "run 'deskpilot auth' to log in".to_string(),
            )),
        }
    }

    /// Whether a token is cached (fresh or refreshable).
    pub async fn has_cached_token(&self) -> bool {
        self.token.lock().await.is_some()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CachedToken, AuthError> {
        tracing::debug!("Refreshing Google access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.secrets.client_id),
            ("client_secret", &self.secrets.client_secret),
        ];

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(format!("HTTP {status}: {body}")));
        }

        let granted: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        Ok(CachedToken {
            access_token: granted.access_token,
            // Google omits the refresh token on refresh grants; keep the old one.
            refresh_token: granted
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: granted.expires_in.map(|s| now_unix() + s),
            id_token: granted.id_token,
        })
    }

    /// Enforce the authorized-email gate against a token's id_token claim.
    ///
    /// With no authorized email configured the gate is open. With one
    /// configured, a token response that carries no id_token at all fails the
    /// check: the scopes always request openid + email, so an absent id_token
    /// means the identity cannot be verified, not that verification is
    /// optional.
    fn verify_identity(&self, token: &CachedToken) -> Result<(), AuthError> {
        let Some(expected) = self.config.authorized_email.as_ref() else {
            return Ok(());
        };
        let id_token = token.id_token.as_ref().ok_or_else(|| {
            AuthError::IdentityUnverifiable(
                "token response carried no id_token to check the email claim against".to_string(),
            )
        })?;
        let actual = email_from_id_token(id_token)?;
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(AuthError::UnauthorizedIdentity {
                expected: expected.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Run the full browser-based login: loopback listener, PKCE, code
    /// exchange, identity check, cache write. Nothing is cached unless the
    /// identity check passes.
    pub async fn run_browser_flow(&self) -> Result<(), AuthError> {
        use rand::RngCore;
        use sha2::{Digest, Sha256};
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::TcpListener;

        // Find an available loopback port for the callback
        let mut listener = None;
        let mut port = 0;
        for p in 9876..=9886 {
            match TcpListener::bind(format!("127.0.0.1:{p}")).await {
                Ok(l) => {
                    listener = Some(l);
                    port = p;
                    break;
                }
                Err(_) => continue,
            }
        }
        let listener = listener
            .ok_or_else(|| AuthError::FlowFailed("could not find available port".to_string()))?;
        let redirect_uri = format!("http://localhost:{port}/callback");

        // PKCE verifier and challenge
        let mut verifier_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut verifier_bytes);
        let code_verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let mut hasher = Sha256::new();
        hasher.update(code_verifier.as_bytes());
        let code_challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

        let mut auth_url = format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&access_type=offline&prompt=consent",
            AUTH_URL,
            urlencoding::encode(&self.secrets.client_id),
            urlencoding::encode(&redirect_uri),
        );
        auth_url.push_str(&format!(
            "&scope={}",
            urlencoding::encode(&self.config.scopes.join(" "))
        ));
        auth_url.push_str(&format!(
            "&code_challenge={code_challenge}&code_challenge_method=S256"
        ));
        if let Some(ref email) = self.config.authorized_email {
            auth_url.push_str(&format!("&login_hint={}", urlencoding::encode(email)));
        }

        println!("Opening browser for Google login...");
        if let Err(e) = open::that(&auth_url) {
            println!("Could not open browser: {e}");
            println!("Please open this URL manually:");
            println!("{auth_url}");
        }
        println!("Waiting for authorization...");

        let timeout = Duration::from_secs(300);
        let code = tokio::time::timeout(timeout, async {
            loop {
                let (mut socket, _) = listener
                    .accept()
                    .await
                    .map_err(|e| AuthError::FlowFailed(e.to_string()))?;

                let mut reader = BufReader::new(&mut socket);
                let mut request_line = String::new();
                reader
                    .read_line(&mut request_line)
                    .await
                    .map_err(|e| AuthError::FlowFailed(e.to_string()))?;

                // Parse GET /callback?code=xxx HTTP/1.1
                if let Some(path) = request_line.split_whitespace().nth(1) {
                    if path.starts_with("/callback") {
                        if let Some(query) = path.split('?').nth(1) {
                            for param in query.split('&') {
                                let parts: Vec<&str> = param.splitn(2, '=').collect();
                                if parts.len() == 2 && parts[0] == "code" {
                                    let code = urlencoding::decode(parts[1])
                                        .unwrap_or_else(|_| parts[1].into())
                                        .into_owned();

                                    let response = "HTTP/1.1 200 OK\r\n\
                                         Content-Type: text/html\r\n\
                                         \r\n\
                                         <!DOCTYPE html><html><body>\
                                         <h1>Connected</h1>\
                                         <p>You can close this window.</p>\
                                         </body></html>";
                                    let _ = socket.write_all(response.as_bytes()).await;
                                    let _ = socket.shutdown().await;
                                    return Ok::<_, AuthError>(code);
                                }
                            }

                            if query.contains("error=") {
                                let response = "HTTP/1.1 400 Bad Request\r\n\r\nAuthorization denied";
                                let _ = socket.write_all(response.as_bytes()).await;
                                return Err(AuthError::FlowFailed(
                                    "authorization denied by user".to_string(),
                                ));
                            }
                        }
                    }
                }

                let response = "HTTP/1.1 404 Not Found\r\n\r\n";
                let _ = socket.write_all(response.as_bytes()).await;
            }
        })
        .await
        .map_err(|_| AuthError::FlowFailed("timed out waiting for authorization".to_string()))??;

        // Exchange code for tokens
        let params = [
            ("grant_type", "authorization_code".to_string()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
            ("client_id", self.secrets.client_id.clone()),
            ("client_secret", self.secrets.client_secret.clone()),
        ];

        let response = self
            .http
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::FlowFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::FlowFailed(format!(
                "token exchange failed: HTTP {status}: {body}"
            )));
        }

        let granted: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::FlowFailed(e.to_string()))?;

        let token = CachedToken {
            access_token: granted.access_token,
            refresh_token: granted.refresh_token,
            expires_at: granted.expires_in.map(|s| now_unix() + s),
            id_token: granted.id_token,
        };

        // Verify the logged-in identity before caching anything
        self.verify_identity(&token)?;

        save_token_cache(&self.config.token_cache_path, &token).await?;
        *self.token.lock().await = Some(token);

        println!("Authenticated. Token cached at {}", self.config.token_cache_path.display());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Decode the email claim out of a Google id_token without verifying the
/// signature. The token came straight from Google over TLS; we only need the
/// claim for the identity gate, not for trust decisions beyond it.
fn email_from_id_token(id_token: &str) -> Result<String, AuthError> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::FlowFailed("malformed id_token".to_string()))?;

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::FlowFailed(format!("malformed id_token payload: {e}")))?;

    #[derive(Deserialize)]
    struct Claims {
        #[serde(default)]
        email: String,
    }

    let claims: Claims = serde_json::from_slice(&decoded)
        .map_err(|e| AuthError::FlowFailed(format!("unparsable id_token claims: {e}")))?;

    Ok(claims.email)
}

async fn load_token_cache(path: &Path) -> Result<Option<CachedToken>, AuthError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            let token =
                serde_json::from_str(&raw).map_err(|e| AuthError::TokenCacheCorrupt {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            Ok(Some(token))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AuthError::TokenCacheCorrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

async fn save_token_cache(path: &Path, token: &CachedToken) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let raw = serde_json::to_string_pretty(token)
        .map_err(|e| AuthError::FlowFailed(format!("failed to serialize token: {e}")))?;
    tokio::fs::write(path, raw).await?;
    Ok(())
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
