use serde::{Deserialize, Serialize};

/// One unit of pipeline input. Producers (listing scrapers, spreadsheet
/// importers) build these; the pipeline consumes each one exactly once.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyQuery {
    pub name: String,
    pub known_website: Option<String>,
}

impl CompanyQuery {
    pub fn new(name: impl Into<String>) -> Self {
        CompanyQuery {
            name: name.into(),
            known_website: None,
        }
    }

    pub fn with_website(name: impl Into<String>, website: impl Into<String>) -> Self {
        CompanyQuery {
            name: name.into(),
            known_website: Some(website.into()),
        }
    }
}

/// Which query strategy produced the resolved domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WebsiteAttempt {
    KnownWebsite,
    HintedOfficial,
    Official,
    Company,
    Broad,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWebsite {
    /// Bare host, no scheme, no `www.`, no path.
    pub domain: String,
    pub source_attempt: WebsiteAttempt,
}

/// Cache key for everything keyed by company.
pub fn normalize_company_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::normalize_company_name;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(
            normalize_company_name("  Acme   Robotics "),
            "acme robotics"
        );
        assert_eq!(normalize_company_name("ACME"), "acme");
    }
}
