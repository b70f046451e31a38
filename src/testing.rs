//! In-memory [`HttpClient`] for tests.

use crate::fetcher::{HttpClient, HttpResponse};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock answers one URL.
#[derive(Debug, Clone)]
pub enum MockRoute {
    Respond(u16, String),
    Transport(String),
    /// Never completes.
    Hang,
}

/// URL-keyed fake transport with call accounting.
///
/// Unknown URLs answer with a transport error, like an unreachable host.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    routes: HashMap<String, MockRoute>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    delay: Duration,
    panic_on_first_call: bool,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, route: MockRoute) -> Self {
        self.routes.insert(url.to_string(), route);
        self
    }

    pub fn page(self, url: &str, html: &str) -> Self {
        self.route(url, MockRoute::Respond(200, html.to_string()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panic the first time each URL is requested.
    pub fn panicking_on_first_call(mut self) -> Self {
        self.panic_on_first_call = true;
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl HttpClient for MockClient {
    async fn get(&self, url: &str, _timeout: Duration) -> HttpResponse {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if self.panic_on_first_call && call == 1 {
            panic!("simulated batch failure for {url}");
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.routes.get(url) {
            Some(MockRoute::Respond(status, body)) => HttpResponse::new(*status, body.clone()),
            Some(MockRoute::Transport(message)) => HttpResponse::transport_error(message.clone()),
            Some(MockRoute::Hang) => std::future::pending::<HttpResponse>().await,
            None => HttpResponse::transport_error(format!("no route to {url}")),
        }
    }
}
