//! Article retrieval: the HTTP client seam and the batch fetcher.
//!
//! # Architecture
//!
//! - [`HttpClient`]: the transport seam. One operation, `get`, that always
//!   resolves to an [`HttpResponse`] and never errors.
//! - [`ReqwestClient`]: the production client (redirect cap, connect and
//!   total timeouts from the request, descriptive user agent, feed/HTML
//!   `Accept` header, TLS verification on, capped streaming body reads).
//! - [`BatchFetcher`]: resolves a set of targets in two passes.
//!
//! # Fetch Strategy
//!
//! 1. **Batch stage**: every target goes through `buffer_unordered` with at
//!    most `concurrency` requests in flight. Results land in the map as each
//!    request finishes. A panicking task is caught and simply leaves its
//!    target unresolved.
//! 2. **Resilience pass**: afterwards, every target that is missing or failed
//!    gets one sequential single fetch, which overwrites its entry.
//!
//! Every call to the client is wrapped in a hard timeout, so a dead target
//! degrades into a failed [`FetchResult`] instead of stalling the batch.

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::models::{FetchResult, FetchTarget};
use encoding_rs::{Encoding, UTF_8};
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// `Accept` header sent with every request: feeds and HTML first.
pub const ACCEPT_FEEDS_AND_HTML: &str = "application/xml,application/rss+xml,application/atom+xml,application/xhtml+xml,text/html;q=0.9,*/*;q=0.8";

/// Slack on top of the request timeout before a client call is abandoned.
const HARD_TIMEOUT_GRACE: Duration = Duration::from_millis(250);

/// Raw outcome of one GET, as reported by an [`HttpClient`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    /// HTTP status, `0` when no response arrived.
    pub status: u16,
    pub body: String,
    /// Set for transport failures and rejected bodies.
    pub error: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            error: None,
        }
    }

    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: String::new(),
            error: Some(message.into()),
        }
    }

    /// Classify this response for `url`.
    pub fn into_result(self, url: FetchTarget) -> FetchResult {
        match self.error {
            Some(error) => FetchResult::failure(url, self.status, error),
            None => FetchResult::from_status(url, self.status, self.body),
        }
    }
}

/// Transport seam used for both the feed document and article pages.
///
/// Implementations must not panic on network failures; they report them
/// through [`HttpResponse::error`] with status `0`.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> impl Future<Output = HttpResponse> + Send;
}

/// Production [`HttpClient`] backed by `reqwest`.
///
/// `reqwest` only takes a connect timeout at build time, so one client is
/// kept per distinct request timeout. Each carries `connect_timeout` equal to
/// that timeout; the total timeout is set on the request itself.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    user_agent: String,
    max_redirects: usize,
    max_body_bytes: usize,
    clients: Arc<Mutex<HashMap<Duration, Client>>>,
}

impl ReqwestClient {
    /// Build the client for the default timeout.
    ///
    /// # Errors
    ///
    /// [`AppError::DependencyUnavailable`] when the TLS backend or resolver
    /// cannot be initialized.
    pub fn new(settings: &Settings) -> Result<Self> {
        let this = Self {
            user_agent: settings.user_agent.clone(),
            max_redirects: settings.max_redirects,
            max_body_bytes: settings.max_body_bytes,
            clients: Arc::default(),
        };
        this.client_for(settings.default_timeout())?;
        Ok(this)
    }

    /// The client whose connect timeout is `timeout`, built on first use.
    fn client_for(&self, timeout: Duration) -> Result<Client> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&timeout) {
            return Ok(client.clone());
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_FEEDS_AND_HTML));
        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .default_headers(headers)
            .redirect(Policy::limited(self.max_redirects))
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::DependencyUnavailable(format!("HTTP client: {e}")))?;

        debug!(connect_timeout_ms = timeout.as_millis() as u64, "Built HTTP client");
        clients.insert(timeout, client.clone());
        Ok(client)
    }

    #[cfg(test)]
    fn connect_timeouts(&self) -> Vec<Duration> {
        let clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let mut timeouts: Vec<Duration> = clients.keys().copied().collect();
        timeouts.sort();
        timeouts
    }
}

fn describe(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_redirect() {
        "redirect"
    } else if e.is_connect() {
        "connect"
    } else if e.is_body() || e.is_decode() {
        "body"
    } else {
        "request"
    };
    format!("{kind}: {e}")
}

/// Encoding named by a `Content-Type` charset parameter, UTF-8 otherwise.
fn charset_of(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .into_iter()
        .flat_map(|ct| ct.split(';').skip(1))
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
        .unwrap_or(UTF_8)
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, timeout: Duration) -> HttpResponse {
        debug!(%url, timeout_ms = timeout.as_millis() as u64, "GET");
        let client = match self.client_for(timeout) {
            Ok(client) => client,
            Err(e) => return HttpResponse::transport_error(e.to_string()),
        };
        let mut response = match client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => return HttpResponse::transport_error(describe(&e)),
        };

        let status = response.status().as_u16();
        let too_large = |len: usize| HttpResponse {
            status,
            body: String::new(),
            error: Some(format!("body of {len} bytes exceeds {} byte cap", self.max_body_bytes)),
        };

        if let Some(len) = response.content_length() {
            if len as usize > self.max_body_bytes {
                return too_large(len as usize);
            }
        }

        let encoding = charset_of(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        // Chunked bodies carry no length up front; stop reading at the cap.
        let mut bytes: Vec<u8> = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if bytes.len() + chunk.len() > self.max_body_bytes {
                        return too_large(bytes.len() + chunk.len());
                    }
                    bytes.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => return HttpResponse::transport_error(describe(&e)),
            }
        }

        let (body, _, _) = encoding.decode(&bytes);
        HttpResponse::new(status, body.into_owned())
    }
}

/// Resolves a set of [`FetchTarget`]s to exactly one [`FetchResult`] each.
#[derive(Debug)]
pub struct BatchFetcher<'a, C> {
    client: &'a C,
    concurrency: usize,
}

impl<'a, C: HttpClient> BatchFetcher<'a, C> {
    pub fn new(client: &'a C, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch every target, returning one result per distinct target.
    ///
    /// The batch stage runs first; the resilience pass then re-fetches, one
    /// at a time, every target the batch stage left missing or failed.
    #[instrument(level = "info", skip_all, fields(targets = targets.len(), concurrency = self.concurrency))]
    pub async fn fetch_all(
        &self,
        targets: &[FetchTarget],
        timeout: Duration,
    ) -> HashMap<FetchTarget, FetchResult> {
        let t0 = Instant::now();
        let mut results = HashMap::with_capacity(targets.len());

        self.run_batch(targets, timeout, &mut results).await;
        let batch_resolved = results.values().filter(|r| r.success).count();
        info!(
            resolved = batch_resolved,
            recorded = results.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Batch stage finished"
        );

        let mut retried = 0usize;
        for target in targets {
            if results.get(target).is_some_and(|r| r.success) {
                continue;
            }
            retried += 1;
            let result = match AssertUnwindSafe(self.fetch_one(target, timeout))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    error!(url = %target, "Single fetch panicked");
                    FetchResult::failure(target.clone(), 0, "fetch task panicked")
                }
            };
            if !result.success {
                warn!(
                    url = %target,
                    status = result.http_status,
                    error = result.error.as_deref().unwrap_or(""),
                    "Fetch failed after single-fetch retry"
                );
            }
            results.insert(target.clone(), result);
        }

        info!(
            total = results.len(),
            succeeded = results.values().filter(|r| r.success).count(),
            retried,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched article pages"
        );
        results
    }

    /// The bounded-concurrency stage. Records whatever completes.
    async fn run_batch(
        &self,
        targets: &[FetchTarget],
        timeout: Duration,
        results: &mut HashMap<FetchTarget, FetchResult>,
    ) {
        let mut completed = stream::iter(targets.iter().cloned())
            .map(|target| async move {
                let outcome = AssertUnwindSafe(self.fetch_one(&target, timeout))
                    .catch_unwind()
                    .await;
                (target, outcome)
            })
            .buffer_unordered(self.concurrency);

        while let Some((target, outcome)) = completed.next().await {
            match outcome {
                Ok(result) => {
                    debug!(url = %target, success = result.success, status = result.http_status, "Batch fetch completed");
                    results.insert(target, result);
                }
                Err(_) => {
                    warn!(url = %target, "Batch fetch task panicked; deferring to single fetch");
                }
            }
        }
    }

    /// One GET with a hard deadline.
    pub async fn fetch_one(&self, target: &FetchTarget, timeout: Duration) -> FetchResult {
        let call = self.client.get(target.as_str(), timeout);
        match tokio::time::timeout(timeout + HARD_TIMEOUT_GRACE, call).await {
            Ok(response) => response.into_result(target.clone()),
            Err(_) => FetchResult::failure(
                target.clone(),
                0,
                format!("timed out after {}ms", timeout.as_millis()),
            ),
        }
    }
}
