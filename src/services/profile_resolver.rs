use std::sync::Arc;

use crate::domain::{
    candidate_name_from_title, extract_title, is_profile_url, names_match, validate_person_name,
    ProfileAttempt, ProfileMatch,
};
use crate::services::gateway::{Gateway, GatewayError, SearchHit};

/// Confirms a person's professional profile by name + company and harvests
/// their job title from the hit. The query budget scales with how sure the
/// extractor was about the name: low-confidence names rarely match beyond
/// the first, most specific query, so they only get that one.
#[derive(Clone)]
pub struct ProfileResolver {
    gateway: Arc<Gateway>,
    high_confidence_cutoff: f64,
    fuzzy_name_cutoff: f64,
    company_similarity_cutoff: f64,
}

impl ProfileResolver {
    pub fn new(
        gateway: Arc<Gateway>,
        high_confidence_cutoff: f64,
        fuzzy_name_cutoff: f64,
        company_similarity_cutoff: f64,
    ) -> Self {
        ProfileResolver {
            gateway,
            high_confidence_cutoff,
            fuzzy_name_cutoff,
            company_similarity_cutoff,
        }
    }

    pub async fn resolve(
        &self,
        person_name: &str,
        company_name: &str,
        extractor_confidence: f64,
    ) -> Result<Option<ProfileMatch>, GatewayError> {
        let attempts: &[ProfileAttempt] = match extractor_confidence >= self.high_confidence_cutoff
        {
            true => &[
                ProfileAttempt::QuotedWithNetwork,
                ProfileAttempt::Quoted,
                ProfileAttempt::Broad,
            ],
            false => &[ProfileAttempt::QuotedWithNetwork],
        };

        for attempt in attempts {
            let query = build_profile_query(*attempt, person_name, company_name);
            match self.gateway.search(&query).await {
                Ok(hits) => {
                    if let Some(profile) = self.pick_profile(&hits, person_name, company_name, *attempt)
                    {
                        return Ok(Some(profile));
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!(
                        "Profile query {:?} failed for {} at {}: {}",
                        attempt,
                        person_name,
                        company_name,
                        e
                    );
                }
            }
        }

        Ok(None)
    }

    fn pick_profile(
        &self,
        hits: &[SearchHit],
        queried_name: &str,
        company_name: &str,
        attempt: ProfileAttempt,
    ) -> Option<ProfileMatch> {
        for hit in hits {
            if !is_profile_url(&hit.url) {
                continue;
            }
            let candidate = match candidate_name_from_title(&hit.title) {
                Some(candidate) => candidate,
                None => continue,
            };
            if !validate_person_name(&candidate, company_name, self.company_similarity_cutoff) {
                continue;
            }
            if !names_match(queried_name, &candidate, self.fuzzy_name_cutoff) {
                continue;
            }
            let title = match extract_title(&[hit.title.as_str(), hit.snippet.as_str()]) {
                Some(title) => title,
                None => continue,
            };

            return Some(ProfileMatch {
                name: candidate,
                title,
                profile_url: hit.url.clone(),
                match_attempt: attempt,
            });
        }
        None
    }
}

/// Escalation from most specific to broadest. The site operator keeps the
/// first query pinned to actual member profiles.
fn build_profile_query(attempt: ProfileAttempt, person_name: &str, company_name: &str) -> String {
    match attempt {
        ProfileAttempt::QuotedWithNetwork => format!(
            "site:linkedin.com/in \"{}\" \"{}\"",
            person_name, company_name
        ),
        ProfileAttempt::Quoted => format!("\"{}\" \"{}\"", person_name, company_name),
        ProfileAttempt::Broad => format!("{} {}", person_name, company_name),
    }
}
