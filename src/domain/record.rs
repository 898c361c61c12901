use serde::Serialize;

use super::company::WebsiteAttempt;

/// The unit of pipeline output: one confirmed decision-maker at a company.
/// Placeholder records carry only the company/domain fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionMakerRecord {
    pub company_name: String,
    pub domain: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub email: String,
    pub profile_url: String,
    /// Which website-resolution strategy found the domain. `None` only on
    /// placeholder records for companies whose domain never resolved.
    pub source_attempt: Option<WebsiteAttempt>,
}

impl DecisionMakerRecord {
    /// A record with only company/domain fields, flagging the company for
    /// manual research.
    pub fn placeholder(
        company_name: impl Into<String>,
        domain: impl Into<String>,
        source_attempt: Option<WebsiteAttempt>,
    ) -> Self {
        DecisionMakerRecord {
            company_name: company_name.into(),
            domain: domain.into(),
            first_name: String::new(),
            last_name: String::new(),
            title: String::new(),
            email: String::new(),
            profile_url: String::new(),
            source_attempt,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.first_name.is_empty() && self.last_name.is_empty() && self.email.is_empty()
    }

    pub fn full_name(&self) -> String {
        match self.last_name.is_empty() {
            true => self.first_name.clone(),
            false => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// Everything the pipeline produced for one company. Records arrive in
/// completion order and never share a case-insensitive person name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentResult {
    pub company_name: String,
    pub records: Vec<DecisionMakerRecord>,
}

impl EnrichmentResult {
    pub fn empty(company_name: impl Into<String>) -> Self {
        EnrichmentResult {
            company_name: company_name.into(),
            records: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
