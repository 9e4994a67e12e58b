//! One logical request: credentials, pacing, retries with a sleep budget, decode.

use std::sync::atomic::Ordering;

use rand::seq::IndexedRandom;
use serde_json::Value;

use super::Credentials;
use super::retry::{RetryConfig, SleepBudget};
use crate::core::YfError;
use crate::core::net::{HttpRequest, Proxies};
use crate::endpoint::Endpoint;

/// What a failed attempt means for the loop.
enum Failure {
    /// 401 or an "Invalid Crumb" body: refresh credentials once.
    Unauthorized,
    /// Worth another attempt if the policy and budget allow.
    Retryable(YfError),
}

/// Whether a decoded body reports a rejected crumb.
fn is_invalid_crumb(body: &Value) -> bool {
    let Value::Object(map) = body else {
        return false;
    };
    map.values().any(|section| {
        section
            .get("error")
            .and_then(|e| e.get("description"))
            .and_then(Value::as_str)
            .is_some_and(|d| d.to_ascii_lowercase().contains("invalid crumb"))
    })
}

impl super::YfClient {
    /// Executes `endpoint` and returns its decoded body.
    ///
    /// Network errors and statuses listed in the retry policy are retried with
    /// backoff until attempts or the sleep budget run out. A 401 (or an invalid
    /// crumb body) triggers exactly one credential refresh; a second one is terminal.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, endpoint, retry, proxies), err, fields(fingerprint = %endpoint.fingerprint))
    )]
    pub(crate) async fn execute(
        &self,
        endpoint: &Endpoint,
        retry: &RetryConfig,
        proxies: &Proxies,
    ) -> Result<Value, YfError> {
        let out = self.execute_inner(endpoint, retry, proxies).await;
        let counter = if out.is_ok() {
            &self.counters.succeeded
        } else {
            &self.counters.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
        out
    }

    async fn execute_inner(
        &self,
        endpoint: &Endpoint,
        retry: &RetryConfig,
        proxies: &Proxies,
    ) -> Result<Value, YfError> {
        let attempts = retry.attempts();
        let mut budget = SleepBudget::new(retry.max_total_sleep);
        let mut needs_crumb = endpoint.requires_crumb;
        let mut refreshed = false;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let creds = if needs_crumb {
                Some(self.ensure_credentials().await?)
            } else {
                None
            };
            let req = self.prepare(endpoint, creds.as_ref(), proxies);
            self.pace().await;

            let failure = match self.transport.send(&req).await {
                Ok(resp) if resp.is_success() => {
                    let body = self.decryptor.decode(&resp.body)?;
                    if !is_invalid_crumb(&body) {
                        return Ok(body);
                    }
                    Failure::Unauthorized
                }
                Ok(resp) if resp.status == 401 => Failure::Unauthorized,
                Ok(resp) => {
                    let err = YfError::Status {
                        status: resp.status,
                        url: endpoint.url.to_string(),
                    };
                    if !retry.should_retry_status(resp.status) {
                        return Err(err);
                    }
                    Failure::Retryable(err)
                }
                Err(e) => {
                    let retryable = matches!(
                        &e,
                        YfError::Network { timeout, .. } if retry.should_retry_network(*timeout)
                    );
                    if !retryable {
                        return Err(e);
                    }
                    Failure::Retryable(e)
                }
            };

            match failure {
                Failure::Unauthorized => {
                    if refreshed {
                        return Err(YfError::Auth(format!(
                            "{} rejected credentials after a refresh",
                            endpoint.url
                        )));
                    }
                    refreshed = true;
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, "credentials rejected; refreshing once");
                    if needs_crumb {
                        let stale = creds.as_ref().and_then(|c| c.crumb.as_deref());
                        self.refresh_credentials(stale).await?;
                    } else {
                        needs_crumb = true;
                    }
                    // The refreshed attempt is granted even when the retry allowance is spent.
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                }
                Failure::Retryable(err) => {
                    if attempt >= attempts {
                        return Err(err);
                    }
                    let Some(delay) = budget.take(retry.backoff.delay(attempt - 1)) else {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(attempt, "retry sleep budget exhausted");
                        return Err(err);
                    };
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, ?delay, error = %err, "retrying");
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn prepare(
        &self,
        endpoint: &Endpoint,
        creds: Option<&Credentials>,
        proxies: &Proxies,
    ) -> HttpRequest {
        let mut url = endpoint.url.clone();
        if let Some(crumb) = creds.and_then(|c| c.crumb.as_deref()) {
            url.query_pairs_mut().append_pair("crumb", crumb);
        }

        let mut req = HttpRequest::get(url);
        req.headers.extend(endpoint.headers.iter().cloned());
        if let Some(ua) = self.user_agents.choose(&mut rand::rng()) {
            req.headers.push(("user-agent".into(), ua.clone()));
        }
        if let Some(cookie) = creds.and_then(|c| c.cookie.as_deref()) {
            req.headers.push(("cookie".into(), cookie.to_string()));
        }
        req.proxy = proxies.pick();
        req
    }

    async fn pace(&self) {
        let Some(interval) = self.pacer.interval else {
            return;
        };
        let mut last = self.pacer.last.lock().await;
        if let Some(prev) = *last {
            let next = prev + interval;
            if next > tokio::time::Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
        *last = Some(tokio::time::Instant::now());
    }
}
