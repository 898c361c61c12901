use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

use fake_user_agent::get_rua;
use rand::Rng;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::configuration::GatewaySettings;

/// How a gateway call failed. Not-found is never an error here; empty
/// result sets flow back as values.
#[derive(Debug)]
pub enum GatewayError {
    /// Credentials were refused. Non-retryable, fatal to the whole run.
    Auth(String),
    /// The API rejected the request for a reason retrying will not fix.
    Rejected { status: u16 },
    /// Transient failures (429, 5xx, timeouts) survived every backoff
    /// attempt. Callers treat this as "no result" for that call.
    RetriesExhausted { attempts: u32 },
    /// The request could not be issued at all.
    Request(reqwest::Error),
    /// The API answered with a body we could not parse.
    Malformed(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Auth(msg) => write!(f, "authentication rejected: {}", msg),
            GatewayError::Rejected { status } => write!(f, "request rejected with status {}", status),
            GatewayError::RetriesExhausted { attempts } => {
                write!(f, "gave up after {} attempts", attempts)
            }
            GatewayError::Request(e) => write!(f, "request error: {}", e),
            GatewayError::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl Error for GatewayError {}

impl GatewayError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Auth(_))
    }
}

/// One result row from the free-text search capability.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// One address row from the bulk domain-search capability.
#[derive(Debug, Clone)]
pub struct DiscoveredEmail {
    pub value: String,
    /// "personal" or "generic" when the provider labels it.
    pub kind: Option<String>,
}

struct KeyRingState {
    cursor: usize,
    last_call: Option<Instant>,
}

/// Round-robin credential rotation plus a minimum inter-call delay for one
/// key group. The reservation pattern matters: the wait is computed and the
/// timestamp advanced under the lock, then the sleep happens outside it, so
/// two concurrent callers can never both see a zero wait.
pub struct KeyRing {
    keys: Vec<String>,
    min_delay: Duration,
    state: Mutex<KeyRingState>,
}

impl KeyRing {
    pub fn new(keys: Vec<String>, min_delay: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!keys.is_empty(), "key ring needs at least one credential");
        Ok(KeyRing {
            keys,
            min_delay,
            state: Mutex::new(KeyRingState {
                cursor: 0,
                last_call: None,
            }),
        })
    }

    pub async fn checkout(&self) -> String {
        let (key, wait) = {
            let mut state = self.state.lock().await;
            let key = self.keys[state.cursor].clone();
            state.cursor = (state.cursor + 1) % self.keys.len();

            let now = Instant::now();
            let wait = match state.last_call {
                Some(last) => (last + self.min_delay).saturating_duration_since(now),
                None => Duration::ZERO,
            };
            state.last_call = Some(now + wait);
            (key, wait)
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        key
    }
}

#[derive(Serialize)]
struct SearchBody<'a> {
    q: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicHit>,
}

#[derive(Deserialize)]
struct OrganicHit {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Deserialize)]
struct DomainSearchResponse {
    data: DomainSearchData,
}

#[derive(Deserialize)]
struct DomainSearchData {
    #[serde(default)]
    emails: Vec<DomainSearchEmail>,
}

#[derive(Deserialize)]
struct DomainSearchEmail {
    value: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Shared, key-rotating access layer for every external call the pipeline
/// makes. Both worker pools funnel through the same instance, so the
/// per-group pacing holds regardless of how many tasks are in flight.
pub struct Gateway {
    client: Client,
    search_url: String,
    email_lookup_url: String,
    search_keys: KeyRing,
    email_keys: KeyRing,
    max_attempts: u32,
}

impl Gateway {
    pub fn new(settings: &GatewaySettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Gateway {
            client,
            search_url: settings.search_url.clone(),
            email_lookup_url: settings.email_lookup_url.clone(),
            search_keys: KeyRing::new(
                settings.search_api_keys.clone(),
                Duration::from_millis(settings.search_delay_ms),
            )?,
            email_keys: KeyRing::new(
                settings.email_api_keys.clone(),
                Duration::from_millis(settings.email_delay_ms),
            )?,
            max_attempts: settings.max_attempts.max(1),
        })
    }

    /// Free-text search returning `{url, title, snippet}` rows.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, GatewayError> {
        let response = self
            .send_with_retry(&self.search_keys, |key| {
                self.client
                    .post(&self.search_url)
                    .header("X-API-KEY", key)
                    .json(&SearchBody { q: query })
            })
            .await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        Ok(parsed
            .organic
            .into_iter()
            .map(|hit| SearchHit {
                url: hit.link,
                title: hit.title,
                snippet: hit.snippet,
            })
            .collect())
    }

    /// Bulk "all addresses at this domain" lookup. A 404 from the provider
    /// means the domain is unknown, which is a not-found, not an error.
    pub async fn domain_emails(
        &self,
        domain: &str,
        company: Option<&str>,
    ) -> Result<Vec<DiscoveredEmail>, GatewayError> {
        let response = self
            .send_with_retry(&self.email_keys, |key| {
                let mut request = self
                    .client
                    .get(&self.email_lookup_url)
                    .query(&[("domain", domain), ("api_key", key)]);
                if let Some(company) = company {
                    request = request.query(&[("company", company)]);
                }
                request
            })
            .await;

        let response = match response {
            Ok(response) => response,
            Err(GatewayError::Rejected { status: 404 }) => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        let parsed: DomainSearchResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        Ok(parsed
            .data
            .emails
            .into_iter()
            .map(|email| DiscoveredEmail {
                value: email.value,
                kind: email.kind,
            })
            .collect())
    }

    async fn send_with_retry<F>(
        &self,
        ring: &KeyRing,
        build: F,
    ) -> Result<reqwest::Response, GatewayError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let key = ring.checkout().await;
            let outcome = build(&key)
                .header(header::USER_AGENT, get_rua())
                .send()
                .await;

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            return Err(GatewayError::Auth(format!(
                                "status {} from {}",
                                status,
                                response.url()
                            )));
                        }
                        StatusCode::TOO_MANY_REQUESTS => {
                            log::warn!("Rate limited (429), backing off");
                        }
                        s if s.is_server_error() => {
                            log::warn!("Server error {}, backing off", s);
                        }
                        s => return Err(GatewayError::Rejected { status: s.as_u16() }),
                    }
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    log::warn!("Transient request failure: {}", e);
                }
                Err(e) => return Err(GatewayError::Request(e)),
            }

            attempt += 1;
            if attempt >= self.max_attempts {
                return Err(GatewayError::RetriesExhausted { attempts: attempt });
            }
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }
}

/// `2^attempt` seconds with a little jitter so concurrent workers do not
/// retry in lockstep.
fn backoff_delay(attempt: u32) -> Duration {
    let base = Duration::from_secs(1u64 << attempt.min(6));
    base + Duration::from_millis(rand::thread_rng().gen_range(0..250))
}
