//! Paginated API source client
//!
//! Fetches whole collections from the remote REST source through ranged
//! reads: `Range: {offset}-{offset+page_size-1}` with `Prefer: count=exact`,
//! walking the offset forward until either an empty page arrives or the
//! accumulated count reaches the total declared by the `Content-Range`
//! header. Both stop signals are honored independently because declared
//! totals can shrink mid-fetch or be omitted entirely.
//!
//! The bearer token is held in an explicit session with an expiry check and
//! is refreshed once on a 401-class page response. Failing the credential
//! exchange is fatal; a transport failure mid-pagination only ends that
//! collection's fetch and yields whatever was accumulated.

use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use wellstage_common::{Result, StageError};

use crate::config::ApiConfig;

// ============================================================================
// API Client Constants
// ============================================================================

/// Timeout for a single HTTP request in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Token lifetime assumed when the auth response omits `expires_in`.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Margin subtracted from the token lifetime so a token is refreshed before
/// it actually lapses mid-collection.
pub const TOKEN_EXPIRY_MARGIN_SECS: u64 = 30;

/// One JSON record as returned by the API
pub type ApiRecord = Map<String, Json>;

/// Result of fetching one collection
#[derive(Debug)]
pub struct FetchOutcome {
    pub records: Vec<ApiRecord>,
    /// False when pagination ended early on a transport or protocol failure;
    /// `records` then holds the partial accumulation.
    pub complete: bool,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Bearer credential with a refresh deadline
struct Session {
    access_token: String,
    expires_at: Instant,
}

impl Session {
    fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Client for the paginated REST data source
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StageError::Network(e.to_string()))?;

        Ok(Self {
            http,
            config,
            session: None,
        })
    }

    /// Exchange credentials for a bearer token
    async fn authenticate(&self) -> Result<Session> {
        info!("authenticating against API source");
        let url = format!("{}/auth/v1/token?grant_type=password", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({
                "email": self.config.email.trim(),
                "password": self.config.password.trim(),
            }))
            .send()
            .await
            .map_err(|e| StageError::Authentication(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StageError::Authentication(format!(
                "credential exchange returned {}",
                response.status()
            )));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| StageError::Authentication(e.to_string()))?;

        let ttl = auth
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS)
            .saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);

        Ok(Session {
            access_token: auth.access_token,
            expires_at: Instant::now() + Duration::from_secs(ttl),
        })
    }

    /// Token for the next request, authenticating or refreshing as needed
    async fn bearer_token(&mut self) -> Result<String> {
        let stale = match self.session {
            Some(ref session) => session.expired(),
            None => true,
        };
        if stale {
            self.session = Some(self.authenticate().await?);
        }
        // session was just populated above when absent
        Ok(self
            .session
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_default())
    }

    /// Fetch every record of one collection
    ///
    /// Fails only when the credential exchange fails. Any other failure ends
    /// this collection's pagination and returns the partial accumulation with
    /// `complete = false`.
    pub async fn fetch_collection(&mut self, collection: &str) -> Result<FetchOutcome> {
        let url = format!("{}/rest/v1/{}", self.config.base_url, collection);
        let page_size = self.config.page_size;

        let mut records: Vec<ApiRecord> = Vec::new();
        let mut offset = 0usize;
        let mut reauthenticated = false;

        info!(collection = %collection, "fetching collection");

        loop {
            let token = self.bearer_token().await?;

            let response = self
                .http
                .get(&url)
                .header("apikey", &self.config.api_key)
                .bearer_auth(&token)
                .header("Prefer", "count=exact")
                .header("Range", format!("{}-{}", offset, offset + page_size - 1))
                .send()
                .await;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        collection = %collection,
                        offset = offset,
                        error = %e,
                        "page fetch failed; keeping partial result"
                    );
                    return Ok(FetchOutcome { records, complete: false });
                },
            };

            if response.status() == StatusCode::UNAUTHORIZED && !reauthenticated {
                debug!(collection = %collection, "token rejected; refreshing session");
                self.session = None;
                reauthenticated = true;
                continue;
            }

            if !response.status().is_success() {
                warn!(
                    collection = %collection,
                    offset = offset,
                    status = %response.status(),
                    "page fetch rejected; keeping partial result"
                );
                return Ok(FetchOutcome { records, complete: false });
            }

            let declared_total = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_declared_total);

            let page: Vec<ApiRecord> = match response.json().await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        collection = %collection,
                        offset = offset,
                        error = %e,
                        "page body unreadable; keeping partial result"
                    );
                    return Ok(FetchOutcome { records, complete: false });
                },
            };

            if page.is_empty() {
                break;
            }
            records.extend(page);

            match declared_total {
                Some(total) => {
                    debug!(
                        collection = %collection,
                        fetched = records.len(),
                        total = total,
                        "page accumulated"
                    );
                    if records.len() >= total {
                        break;
                    }
                    offset += page_size;
                },
                // no declared total: a single unpaginated response
                None => break,
            }
        }

        info!(collection = %collection, records = records.len(), "collection fetched");
        Ok(FetchOutcome { records, complete: true })
    }
}

/// Total collection size from a `{range}/{total}` Content-Range value
fn parse_declared_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declared_total() {
        assert_eq!(parse_declared_total("0-999/2500"), Some(2500));
        assert_eq!(parse_declared_total("*/17"), Some(17));
        assert_eq!(parse_declared_total("0-999/*"), None);
        assert_eq!(parse_declared_total("garbage"), None);
    }

    #[test]
    fn test_session_expiry() {
        let live = Session {
            access_token: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(60),
        };
        assert!(!live.expired());

        let stale = Session {
            access_token: "t".into(),
            expires_at: Instant::now() - Duration::from_secs(1),
        };
        assert!(stale.expired());
    }
}
