//! # Fetch Coordinator
//!
//! Performs upstream origin fetches on cache miss with single-flight
//! de-duplication: for a given cache key at most one upstream request is
//! active, and concurrent requesters attach as waiters that all receive the
//! same outcome. Failures surface to every waiter; there is no automatic
//! retry (re-requesting is the playback layer's decision) and nothing is
//! cached on failure.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

use crate::cache::CacheKey;
use crate::error::CacheProxyError;

/// Outcome of an upstream fetch, cloneable so it can fan out to waiters
pub type FetchOutcome = Result<FetchedResource, CacheProxyError>;

/// A successfully fetched origin resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// Response body
    pub body: Bytes,
    /// Content-Type reported by the origin, if any
    pub content_type: Option<String>,
}

/// Coordinates upstream fetches with per-key single-flight de-duplication
pub struct FetchCoordinator {
    client: Client,
    /// Waiter lists per in-flight key. Presence of a key means a leader
    /// fetch is active; the read-check-insert-or-attach is atomic under
    /// this mutex.
    in_flight: Mutex<HashMap<CacheKey, Vec<oneshot::Sender<FetchOutcome>>>>,
}

impl FetchCoordinator {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the resource at `url`, coalescing concurrent requests for the
    /// same key into one upstream request.
    pub async fn fetch(&self, key: &CacheKey, url: &Url) -> FetchOutcome {
        let waiter = {
            let mut map = self.in_flight.lock();
            match map.get_mut(key) {
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                None => {
                    map.insert(key.clone(), Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            debug!(key = ?key, "Attached to in-flight fetch");
            return match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(CacheProxyError::Internal(
                    "in-flight fetch abandoned".to_string(),
                )),
            };
        }

        // Leader path. The guard releases waiters even if this future is
        // dropped mid-fetch (e.g. the requesting player disconnected).
        let guard = FlightGuard {
            coordinator: self,
            key,
        };
        let outcome = self.fetch_upstream(url).await;
        guard.complete(&outcome);
        outcome
    }

    async fn fetch_upstream(&self, url: &Url) -> FetchOutcome {
        debug!(url = %url, "Fetching from origin");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Origin returned non-success status");
            return Err(CacheProxyError::UpstreamStatus(status));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.bytes().await?;
        debug!(url = %url, bytes = body.len(), "Origin fetch complete");

        Ok(FetchedResource { body, content_type })
    }
}

/// Clears the in-flight record for a key when the leader finishes or is
/// dropped. Dropping without `complete` wakes waiters with an error.
struct FlightGuard<'a> {
    coordinator: &'a FetchCoordinator,
    key: &'a CacheKey,
}

impl FlightGuard<'_> {
    fn complete(self, outcome: &FetchOutcome) {
        let waiters = self
            .coordinator
            .in_flight
            .lock()
            .remove(self.key)
            .unwrap_or_default();
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }
        // Drop of `self` finds the key already removed and does nothing
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(waiters) = self.coordinator.in_flight.lock().remove(self.key) {
            if !waiters.is_empty() {
                warn!(key = ?self.key, waiters = waiters.len(), "Leader fetch dropped before completion");
            }
            // Dropping the senders wakes every waiter with a recv error
        }
    }
}
