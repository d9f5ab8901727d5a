//! Firebase ID-token verification
//!
//! ID tokens are RS256 JWTs signed by Google's securetoken service. The
//! public signing keys rotate, so they are fetched from the JWKS endpoint
//! and cached; an unknown key id forces a refresh.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{AuthError, IdentityVerifier, VerifiedIdentity};

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// How long fetched signing keys are trusted before a refresh
const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Tolerated clock skew when validating expiry, in seconds
const LEEWAY_SECONDS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Claims carried by an ID token. Audience, issuer, and expiry are enforced
/// by the validation itself; the email is what downstream handlers consume.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, Jwk>,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn is_stale(&self) -> bool {
        match self.fetched_at {
            Some(at) => at.elapsed() > KEY_CACHE_TTL,
            None => true,
        }
    }
}

pub struct FirebaseVerifier {
    client: reqwest::Client,
    project_id: String,
    jwks_url: String,
    cache: RwLock<KeyCache>,
}

impl FirebaseVerifier {
    pub fn new(project_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            project_id,
            jwks_url: JWKS_URL.to_string(),
            cache: RwLock::new(KeyCache::default()),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);
        validation.leeway = LEEWAY_SECONDS;
        validation
    }

    /// Look up a signing key by key id, refreshing the cache when the key is
    /// unknown or the cache has gone stale.
    async fn signing_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale() {
                if let Some(key) = cache.keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock.
        if cache.is_stale() || !cache.keys.contains_key(kid) {
            let set = fetch_keys(&self.client, &self.jwks_url).await?;
            cache.keys = set.keys.into_iter().map(|k| (k.kid.clone(), k)).collect();
            cache.fetched_at = Some(Instant::now());
        }

        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown key id {}", kid)))
    }
}

async fn fetch_keys(client: &reqwest::Client, url: &str) -> Result<JwkSet, AuthError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

    if !response.status().is_success() {
        return Err(AuthError::KeyFetch(format!(
            "key endpoint returned {}",
            response.status()
        )));
    }

    response
        .json::<JwkSet>()
        .await
        .map_err(|e| AuthError::KeyFetch(e.to_string()))
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header carries no key id".to_string()))?;

        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let data = decode::<IdTokenClaims>(token, &key, &self.validation()).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let email = data
            .claims
            .email
            .ok_or_else(|| AuthError::InvalidToken("token carries no email claim".to_string()))?;

        Ok(VerifiedIdentity {
            email,
            name: data.claims.name,
        })
    }
}
