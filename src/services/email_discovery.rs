use std::sync::Arc;

use itertools::Itertools;

use crate::domain::{is_generic_local_part, EmailCandidate};
use crate::services::gateway::{DiscoveredEmail, Gateway, GatewayError};

/// Whether the bulk lookup had anything for the domain. Not-found is a
/// value, not an error; the company run just ends early.
#[derive(Debug, Clone, PartialEq)]
pub enum EmailDiscoveryOutcome {
    Found(Vec<EmailCandidate>),
    NotFound,
}

/// Wraps the "all addresses at this domain" capability: dedup, put
/// personal-looking addresses ahead of shared mailboxes, cap the list.
pub struct EmailDiscoveryClient {
    gateway: Arc<Gateway>,
    max_candidates: usize,
}

impl EmailDiscoveryClient {
    pub fn new(gateway: Arc<Gateway>, max_candidates: usize) -> Self {
        EmailDiscoveryClient {
            gateway,
            max_candidates,
        }
    }

    pub async fn discover(
        &self,
        domain: &str,
        company: Option<&str>,
    ) -> Result<EmailDiscoveryOutcome, GatewayError> {
        let discovered = self.gateway.domain_emails(domain, company).await?;
        if discovered.is_empty() {
            return Ok(EmailDiscoveryOutcome::NotFound);
        }

        let candidates = order_candidates(discovered, domain, self.max_candidates);
        log::info!("Found {} email candidates at {}", candidates.len(), domain);

        match candidates.is_empty() {
            true => Ok(EmailDiscoveryOutcome::NotFound),
            false => Ok(EmailDiscoveryOutcome::Found(candidates)),
        }
    }
}

/// Provider labels win when present; otherwise the local part decides
/// whether an address looks like a shared mailbox. Order within each class
/// follows the provider's ranking.
fn order_candidates(
    discovered: Vec<DiscoveredEmail>,
    domain: &str,
    cap: usize,
) -> Vec<EmailCandidate> {
    let (personal, generic): (Vec<DiscoveredEmail>, Vec<DiscoveredEmail>) = discovered
        .into_iter()
        .filter(|email| email.value.contains('@'))
        .unique_by(|email| email.value.to_lowercase())
        .partition(|email| !looks_generic(email));

    personal
        .into_iter()
        .chain(generic)
        .take(cap)
        .map(|email| EmailCandidate {
            address: email.value,
            domain: domain.to_string(),
        })
        .collect()
}

fn looks_generic(email: &DiscoveredEmail) -> bool {
    match email.kind.as_deref() {
        Some("generic") => true,
        Some("personal") => false,
        _ => email
            .value
            .split('@')
            .next()
            .map(is_generic_local_part)
            .unwrap_or(true),
    }
}
