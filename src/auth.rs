/// Authentication extractors and token verification
use crate::{
    api::middleware::{extract_bearer_token, extract_device_id},
    config::{AuthConfig, TokenVerification},
    context::AppContext,
    error::{DistimError, DistimResult},
    session::{AuthSession, DeviceId, Role},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{
    decode, decode_header, errors::ErrorKind, jwk::JwkSet, Algorithm, DecodingKey, Validation,
};
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Minimum delay between two JWKS downloads
const JWKS_REFRESH_INTERVAL: Duration = Duration::from_secs(12);

enum VerifierMode {
    Jwks {
        jwks_url: String,
        issuer: String,
        audience: String,
    },
    SharedSecret {
        key: DecodingKey,
    },
}

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    last_refresh: Option<Instant>,
}

/// Verifies bearer tokens and turns them into sessions
pub struct TokenVerifier {
    mode: VerifierMode,
    role_claim: String,
    http_client: reqwest::Client,
    cache: RwLock<KeyCache>,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> DistimResult<Self> {
        let mode = match &config.verification {
            TokenVerification::Jwks { domain, audience } => {
                let base = if domain.starts_with("http://") || domain.starts_with("https://") {
                    domain.clone()
                } else {
                    format!("https://{}", domain)
                };
                VerifierMode::Jwks {
                    jwks_url: format!("{}/.well-known/jwks.json", base),
                    issuer: format!("{}/", base),
                    audience: audience.clone(),
                }
            }
            TokenVerification::SharedSecret { secret } => VerifierMode::SharedSecret {
                key: DecodingKey::from_secret(secret.as_bytes()),
            },
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DistimError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            mode,
            role_claim: config.role_claim.clone(),
            http_client,
            cache: RwLock::new(KeyCache::default()),
        })
    }

    /// Verify a bearer token and build the authenticated session
    pub async fn verify(&self, token: &str) -> DistimResult<AuthSession> {
        let claims = match &self.mode {
            VerifierMode::SharedSecret { key } => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.validate_aud = false;
                validation.leeway = 60;
                decode_claims(token, key, &validation)?
            }
            VerifierMode::Jwks {
                jwks_url,
                issuer,
                audience,
            } => {
                let header = decode_header(token)
                    .map_err(|e| DistimError::Authentication(format!("Invalid token: {}", e)))?;
                let kid = header.kid.ok_or_else(|| {
                    DistimError::Authentication("Token header has no key id".to_string())
                })?;
                let key = self.signing_key(jwks_url, &kid).await?;

                let mut validation = Validation::new(Algorithm::RS256);
                validation.set_audience(&[audience]);
                validation.set_issuer(&[issuer]);
                validation.leeway = 60;
                decode_claims(token, &key, &validation)?
            }
        };

        let user_id = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DistimError::Authentication("Invalid JWT: missing 'sub' claim".to_string()))?
            .to_string();
        let role = Role::from_claim(claims.get(&self.role_claim).and_then(|v| v.as_str()));

        Ok(AuthSession::Authenticated { user_id, role })
    }

    /// Look up a signing key, refreshing the JWKS on an unknown key id
    async fn signing_key(&self, jwks_url: &str, kid: &str) -> DistimResult<DecodingKey> {
        if let Some(key) = self.cache.read().await.keys.get(kid) {
            return Ok(key.clone());
        }

        let mut cache = self.cache.write().await;
        if let Some(key) = cache.keys.get(kid) {
            return Ok(key.clone());
        }

        let recently_refreshed = cache
            .last_refresh
            .is_some_and(|at| at.elapsed() < JWKS_REFRESH_INTERVAL);
        if !recently_refreshed {
            cache.keys = self.fetch_jwks(jwks_url).await?;
            cache.last_refresh = Some(Instant::now());
            tracing::debug!("Loaded {} signing keys from {}", cache.keys.len(), jwks_url);
        }

        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| DistimError::Authentication(format!("Unknown signing key: {}", kid)))
    }

    async fn fetch_jwks(&self, jwks_url: &str) -> DistimResult<HashMap<String, DecodingKey>> {
        let response = self
            .http_client
            .get(jwks_url)
            .send()
            .await
            .map_err(|e| DistimError::Upstream(format!("Failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(DistimError::Upstream(format!(
                "JWKS endpoint returned status {}",
                response.status()
            )));
        }

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| DistimError::Upstream(format!("Invalid JWKS document: {}", e)))?;

        Ok(set
            .keys
            .iter()
            .filter_map(|jwk| {
                let kid = jwk.common.key_id.clone()?;
                match DecodingKey::from_jwk(jwk) {
                    Ok(key) => Some((kid, key)),
                    Err(e) => {
                        tracing::warn!("Skipping unusable JWK {}: {}", kid, e);
                        None
                    }
                }
            })
            .collect())
    }
}

fn decode_claims(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> DistimResult<serde_json::Value> {
    decode::<serde_json::Value>(token, key, validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    DistimError::Authentication("Token has expired".to_string())
                }
                ErrorKind::InvalidSignature => {
                    DistimError::Authentication("Invalid token signature".to_string())
                }
                _ => DistimError::Authentication(format!("Invalid token: {}", e)),
            }
        })
}

/// Session of the caller: authenticated by bearer token, else anonymous
///
/// A bearer token that fails verification is rejected rather than treated
/// as anonymous.
#[derive(Debug, Clone)]
pub struct Session(pub AuthSession);

#[async_trait]
impl FromRequestParts<AppContext> for Session {
    type Rejection = DistimError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = extract_bearer_token(&parts.headers) {
            let session = state.token_verifier.verify(&token).await?;
            return Ok(Session(session));
        }

        let device = extract_device_id(&parts.headers)?;
        Ok(Session(AuthSession::anonymous(device)))
    }
}

/// Authenticated user - requires a valid bearer token
#[derive(Debug, Clone)]
pub struct UserAuth {
    pub user_id: String,
    pub role: Role,
    /// Device header sent alongside the token, if any
    pub device: Option<DeviceId>,
}

impl UserAuth {
    pub fn session(&self) -> AuthSession {
        AuthSession::Authenticated {
            user_id: self.user_id.clone(),
            role: self.role,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for UserAuth {
    type Rejection = DistimError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| DistimError::Authentication("Missing authorization header".to_string()))?;

        match state.token_verifier.verify(&token).await? {
            AuthSession::Authenticated { user_id, role } => Ok(UserAuth {
                user_id,
                role,
                device: extract_device_id(&parts.headers)?,
            }),
            AuthSession::Anonymous { .. } => Err(DistimError::Authentication(
                "Token did not identify a user".to_string(),
            )),
        }
    }
}

/// Admin authentication - requires the admin role claim
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub user_id: String,
}

/// Rejection of the admin extractor
#[derive(Debug)]
pub enum AdminRejection {
    /// Missing or invalid token
    Unauthenticated(DistimError),
    /// Valid token without the admin role
    Forbidden,
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            AdminRejection::Unauthenticated(e) => e.into_response(),
            AdminRejection::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Admin access required" })),
            )
                .into_response(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuth {
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = UserAuth::from_request_parts(parts, state)
            .await
            .map_err(AdminRejection::Unauthenticated)?;

        if !user.role.can_act_as(Role::Admin) {
            tracing::warn!("User {} attempted an admin action", user.user_id);
            return Err(AdminRejection::Forbidden);
        }

        Ok(AdminAuth {
            user_id: user.user_id,
        })
    }
}
