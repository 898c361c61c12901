use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use url::Url;

use crate::domain::{normalize_company_name, CompanyQuery, ResolvedWebsite, WebsiteAttempt};
use crate::services::gateway::{Gateway, GatewayError, SearchHit};

/// Hosts that can never be a company's own site: professional networks,
/// social media, listing/press aggregators. Matched against the host and
/// every parent suffix, so subdomains are caught too.
pub const BLOCKED_DOMAINS: &[&str] = &[
    "linkedin.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "youtube.com",
    "tiktok.com",
    "pinterest.com",
    "glassdoor.com",
    "indeed.com",
    "crunchbase.com",
    "bloomberg.com",
    "reuters.com",
    "forbes.com",
    "wikipedia.org",
    "medium.com",
    "yelp.com",
    "yellowpages.com",
    "mapquest.com",
    "prnewswire.com",
    "businesswire.com",
    "sec.gov",
    "scribd.com",
    "slideshare.net",
    "google.com",
    "amazon.com",
];

/// Path prefixes that mark a hit as a secondary page on the right site.
const SUBPAGE_SEGMENTS: &[&str] = &[
    "careers",
    "about",
    "about-us",
    "team",
    "our-team",
    "news",
    "contact",
    "contact-us",
    "jobs",
    "blog",
    "press",
];

/// Finds a company's canonical domain through an ordered ladder of search
/// queries, most specific first. Results are cached (hits and misses) per
/// normalized company name for the life of the process.
pub struct WebsiteResolver {
    gateway: Arc<Gateway>,
    cache: Mutex<HashMap<String, Option<ResolvedWebsite>>>,
}

impl WebsiteResolver {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        WebsiteResolver {
            gateway,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the canonical domain for one company. `hint_keywords` are
    /// free-text context terms (industry, location) that sharpen the first
    /// query when available. Only auth failures propagate; transient
    /// exhaustion just moves the ladder along.
    pub async fn resolve(
        &self,
        query: &CompanyQuery,
        hint_keywords: &[String],
    ) -> Result<Option<ResolvedWebsite>, GatewayError> {
        let cache_key = normalize_company_name(&query.name);
        if let Some(cached) = self.cache.lock().await.get(&cache_key) {
            return Ok(cached.clone());
        }

        if let Some(known) = &query.known_website {
            if let Some(domain) = normalize_domain(known) {
                if !is_blocked_host(&domain) {
                    let resolved = ResolvedWebsite {
                        domain,
                        source_attempt: WebsiteAttempt::KnownWebsite,
                    };
                    self.cache
                        .lock()
                        .await
                        .insert(cache_key, Some(resolved.clone()));
                    return Ok(Some(resolved));
                }
            }
            log::warn!(
                "Known website {} for {} is unusable, falling back to search",
                known,
                query.name
            );
        }

        let mut attempt_failed = false;
        for (attempt, search_query) in build_query_ladder(&query.name, hint_keywords) {
            match self.gateway.search(&search_query).await {
                Ok(hits) => {
                    if let Some(domain) = pick_domain(&hits) {
                        let resolved = ResolvedWebsite {
                            domain,
                            source_attempt: attempt,
                        };
                        self.cache
                            .lock()
                            .await
                            .insert(cache_key, Some(resolved.clone()));
                        return Ok(Some(resolved));
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!(
                        "Website query {:?} failed for {}: {}",
                        attempt,
                        query.name,
                        e
                    );
                    attempt_failed = true;
                }
            }
        }

        // Only a clean "every attempt searched, nothing matched" is worth
        // remembering as a miss.
        if !attempt_failed {
            self.cache.lock().await.insert(cache_key, None);
        }
        Ok(None)
    }
}

fn build_query_ladder(name: &str, hint_keywords: &[String]) -> Vec<(WebsiteAttempt, String)> {
    let mut ladder = vec![];
    if !hint_keywords.is_empty() {
        ladder.push((
            WebsiteAttempt::HintedOfficial,
            format!("\"{}\" {} official website", name, hint_keywords.join(" ")),
        ));
    }
    ladder.push((
        WebsiteAttempt::Official,
        format!("\"{}\" official website", name),
    ));
    ladder.push((
        WebsiteAttempt::Company,
        format!("\"{}\" company website", name),
    ));
    ladder.push((WebsiteAttempt::Broad, format!("{} site", name)));
    ladder
}

/// First homepage hit wins; if only subpages matched, the first of those.
/// Blocked hosts and document links are discarded before classification.
fn pick_domain(hits: &[SearchHit]) -> Option<String> {
    let mut subpage_fallback: Option<String> = None;

    for hit in hits {
        let parsed = match parse_with_scheme(&hit.url) {
            Some(parsed) => parsed,
            None => continue,
        };
        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_lowercase(),
            _ => continue,
        };
        if is_blocked_host(&host) {
            continue;
        }
        let path = parsed.path().to_lowercase();
        if path.ends_with(".pdf") {
            continue;
        }

        let domain = strip_www(&host);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => return Some(domain),
            [first, ..] if SUBPAGE_SEGMENTS.contains(first) => {
                if subpage_fallback.is_none() {
                    subpage_fallback = Some(domain);
                }
            }
            _ => {}
        }
    }

    subpage_fallback
}

pub fn is_blocked_host(host: &str) -> bool {
    let host = strip_www(&host.to_lowercase());
    BLOCKED_DOMAINS
        .iter()
        .any(|blocked| host == *blocked || host.ends_with(&format!(".{}", blocked)))
}

/// Bare host out of whatever URL shape the search results hand back:
/// scheme, `www.`, path and query are all stripped.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let parsed = parse_with_scheme(raw)?;
    let host = parsed.host_str()?;
    if host.is_empty() || !host.contains('.') {
        return None;
    }
    Some(strip_www(&host.to_lowercase()))
}

fn parse_with_scheme(raw: &str) -> Option<Url> {
    let candidate = match raw.contains("://") {
        true => raw.to_string(),
        false => format!("https://{}", raw),
    };
    Url::parse(&candidate).ok()
}

fn strip_www(host: &str) -> String {
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host.to_string(),
    }
}
