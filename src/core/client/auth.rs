//! Cookie & crumb acquisition for Yahoo endpoints.
//!
//! The pair is process-scoped state behind `state`; `credential_fetch_lock`
//! guarantees at most one handshake is in flight while other callers wait.

use std::sync::atomic::Ordering;

use rand::seq::IndexedRandom;

use super::Credentials;
use crate::core::error::YfError;
use crate::core::net::HttpRequest;

impl super::YfClient {
    /// Returns usable credentials, performing the handshake only if none are cached.
    pub(crate) async fn ensure_credentials(&self) -> Result<Credentials, YfError> {
        // Fast path: check if credentials exist with a read lock.
        {
            let state = self.state.read().await;
            if state.crumb.is_some() {
                return Ok(state.clone());
            }
        }

        // Slow path: acquire the dedicated fetch lock to ensure only one task proceeds.
        let _guard = self.credential_fetch_lock.lock().await;

        // Double-check: another task might have fetched credentials while this one was waiting.
        {
            let state = self.state.read().await;
            if state.crumb.is_some() {
                return Ok(state.clone());
            }
        }

        self.handshake().await
    }

    /// Replaces a crumb that upstream rejected.
    ///
    /// If another task already swapped `stale` for a new crumb while this one
    /// waited for the lock, that crumb is reused instead of handshaking again.
    pub(crate) async fn refresh_credentials(
        &self,
        stale: Option<&str>,
    ) -> Result<Credentials, YfError> {
        let _guard = self.credential_fetch_lock.lock().await;

        {
            let state = self.state.read().await;
            if state.crumb.is_some() && state.crumb.as_deref() != stale {
                return Ok(state.clone());
            }
        }

        self.clear_crumb().await;
        self.handshake().await
    }

    async fn clear_crumb(&self) {
        let mut state = self.state.write().await;
        state.crumb = None;
    }

    /// Fetches a fresh cookie and crumb. Callers must hold `credential_fetch_lock`.
    async fn handshake(&self) -> Result<Credentials, YfError> {
        self.counters.handshakes.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        tracing::debug!(cookie_url = %self.cookie_url, "performing cookie/crumb handshake");

        let cookie = self.get_cookie().await?;
        let crumb = self.get_crumb_internal(&cookie).await?;

        let creds = Credentials {
            cookie: Some(cookie),
            crumb: Some(crumb),
        };
        *self.state.write().await = creds.clone();
        Ok(creds)
    }

    fn handshake_request(&self, url: &url::Url) -> HttpRequest {
        let ua = self
            .user_agents
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_default();
        let mut req = HttpRequest::get(url.clone()).header("user-agent", ua);
        req.proxy = self.proxies.pick();
        req
    }

    async fn get_cookie(&self) -> Result<String, YfError> {
        let req = self.handshake_request(&self.cookie_url);
        let resp = self.transport.send(&req).await?;

        // The consent endpoint sets the cookie even on error statuses.
        let pairs: Vec<&str> = resp
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, v)| v.split(';').next())
            .map(str::trim)
            .filter(|kv| kv.contains('='))
            .collect();

        if pairs.is_empty() {
            return Err(YfError::Auth(format!(
                "No cookie received from {}",
                self.cookie_url
            )));
        }
        Ok(pairs.join("; "))
    }

    async fn get_crumb_internal(&self, cookie: &str) -> Result<String, YfError> {
        let req = self
            .handshake_request(&self.crumb_url)
            .header("cookie", cookie);
        let resp = self.transport.send(&req).await?;
        if !resp.is_success() {
            return Err(YfError::Auth(format!(
                "crumb endpoint answered {}",
                resp.status
            )));
        }

        let crumb = resp.body.trim();
        if crumb.is_empty() || crumb.contains('{') || crumb.contains('<') {
            return Err(YfError::Auth(format!("Received invalid crumb: {crumb}")));
        }
        Ok(crumb.to_string())
    }
}
