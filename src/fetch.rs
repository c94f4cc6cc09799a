//! Minimal HTTP client used to retrieve quiz bank resources.
//!
//! The loader only depends on the `BankFetcher` seam, so tests can serve banks
//! from memory. Calls are instrumented and log paths, statuses, latencies, and
//! body sizes (not contents).

use std::future::Future;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::Url;
use tracing::{debug, instrument};

/// Outcome of one retrieval attempt that reached a server.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched {
  Body(String),
  /// Non-success HTTP status; the caller moves on to the next candidate.
  Status(u16),
}

/// Retrieve a resource by (possibly relative) URL path.
/// `Err` is a transport-level failure (connection refused, timeout, bad URL).
pub trait BankFetcher: Send + Sync {
  fn fetch(&self, path: &str) -> impl Future<Output = Result<Fetched, String>> + Send;
}

#[derive(Clone)]
pub struct HttpFetcher {
  pub client: reqwest::Client,
  pub base: Url,
}

impl HttpFetcher {
  /// Build a fetcher resolving candidate paths against `base_url`.
  /// No timeout unless one is given.
  pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, String> {
    let base = Url::parse(base_url).map_err(|e| e.to_string())?;
    let mut builder = reqwest::Client::builder();
    if let Some(t) = timeout {
      builder = builder.timeout(t);
    }
    let client = builder.build().map_err(|e| e.to_string())?;
    Ok(Self { client, base })
  }

  pub fn resolve(&self, path: &str) -> Result<Url, String> {
    self.base.join(path).map_err(|e| format!("cannot resolve '{}': {}", path, e))
  }
}

impl BankFetcher for HttpFetcher {
  #[instrument(level = "debug", skip(self), fields(base = %self.base))]
  async fn fetch(&self, path: &str) -> Result<Fetched, String> {
    let url = self.resolve(path)?;
    let start = std::time::Instant::now();
    let res = self
      .client
      .get(url.clone())
      .header(USER_AGENT, "study-tool-backend/0.1")
      .send()
      .await
      .map_err(|e| e.to_string())?;

    let status = res.status();
    if !status.is_success() {
      debug!(target: "quiz", %url, status = status.as_u16(), elapsed = ?start.elapsed(), "Non-success response");
      return Ok(Fetched::Status(status.as_u16()));
    }

    let body = res.text().await.map_err(|e| e.to_string())?;
    debug!(target: "quiz", %url, bytes = body.len(), elapsed = ?start.elapsed(), "Fetched resource");
    Ok(Fetched::Body(body))
  }
}
