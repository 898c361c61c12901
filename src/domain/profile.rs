use once_cell::sync::Lazy;
use regex::Regex;
use strsim::jaro_winkler;

/// Which query escalation step produced the profile hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAttempt {
    QuotedWithNetwork,
    Quoted,
    Broad,
}

/// A validated professional-profile hit for one person.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileMatch {
    pub name: String,
    pub title: String,
    pub profile_url: String,
    pub match_attempt: ProfileAttempt,
}

/// Only results whose URL looks like an actual member profile are accepted,
/// never company pages or post permalinks.
pub fn is_profile_url(url: &str) -> bool {
    url.to_lowercase().contains("linkedin.com/in/")
}

const SITE_SUFFIXES: &[&str] = &[" | LinkedIn", " - LinkedIn", " – LinkedIn", " · LinkedIn"];

/// Separators that end the name segment of a result title. The name is
/// whatever sits left of the earliest one.
const NAME_SEPARATORS: &[&str] = &[" - ", " – ", " | ", " · ", ", ", " at ", " @ "];

/// Cut the person-name segment out of a search result title like
/// `"Jane Doe - CEO at Acme | LinkedIn"`.
pub fn candidate_name_from_title(title: &str) -> Option<String> {
    let mut trimmed = title.trim();
    for suffix in SITE_SUFFIXES {
        if let Some(rest) = trimmed.strip_suffix(suffix) {
            trimmed = rest.trim_end();
            break;
        }
    }

    let mut cut = trimmed.len();
    for sep in NAME_SEPARATORS {
        if let Some(idx) = trimmed.find(sep) {
            cut = cut.min(idx);
        }
    }

    let head = trimmed[..cut].trim();
    match head.is_empty() {
        true => None,
        false => Some(head.to_string()),
    }
}

/// Phrases that mark a result title as a listicle or site chrome rather
/// than a person.
const NAME_BLACKLIST: &[&str] = &[
    "contact us",
    "about us",
    "top 10",
    "top ten",
    "the best",
    "sign in",
    "log in",
    "login",
    "privacy policy",
    "terms of service",
    "jobs at",
    "careers at",
    "see all",
    "directory",
];

const ENTITY_KEYWORDS: &[&str] = &[
    "inc",
    "llc",
    "ltd",
    "corp",
    "corporation",
    "company",
    "gmbh",
    "technologies",
    "technology",
    "solutions",
    "group",
    "agency",
    "services",
    "ventures",
    "holdings",
    "consulting",
    "software",
    "systems",
    "labs",
];

/// Heuristic check that a string cut from a result title is actually a
/// person's name and not the company, a listicle, or site chrome.
pub fn validate_person_name(candidate: &str, company_name: &str, company_cutoff: f64) -> bool {
    let name = candidate.trim();
    let char_count = name.chars().count();
    if !(2..=60).contains(&char_count) {
        return false;
    }
    if name.split_whitespace().count() > 4 {
        return false;
    }

    let lowered = name.to_lowercase();
    if name.chars().any(|c| c.is_ascii_digit()) && !lowered.starts_with("dr") {
        return false;
    }
    if NAME_BLACKLIST.iter().any(|phrase| lowered.contains(phrase)) {
        return false;
    }

    let company = company_name.trim().to_lowercase();
    if lowered == company || jaro_winkler(&lowered, &company) >= company_cutoff {
        return false;
    }

    let has_entity_keyword = lowered
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .any(|token| ENTITY_KEYWORDS.contains(&token));
    !has_entity_keyword
}

/// Containment first, string similarity as the fallback.
pub fn names_match(queried: &str, candidate: &str, cutoff: f64) -> bool {
    let queried = queried.trim().to_lowercase();
    let candidate = candidate.trim().to_lowercase();
    if queried.is_empty() || candidate.is_empty() {
        return false;
    }
    if candidate.contains(&queried) || queried.contains(&candidate) {
        return true;
    }
    jaro_winkler(&queried, &candidate) >= cutoff
}

// "<separator> Co-Founder & CEO at Acme": the segment between a separator
// and "at"/"@" is almost always the role. The separator needs trailing
// whitespace so the hyphen in "Co-Founder" is not mistaken for one.
static SEPARATOR_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[-–|·]\s+([^|·–]{3,100}?)\s+(?:at|@)\s+").expect("valid title pattern")
});

// Fallback anchored on known executive vocabulary, for snippets without a
// clean separator structure.
static KEYWORD_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b((?:co[- ]?founder|founder|chief\s+[a-z]+(?:\s+[a-z]+)?\s+officer|ceo|cto|cfo|coo|cmo|president|vice\s+president|vp|managing\s+director|managing\s+partner|executive\s+director|director|head\s+of\s+[a-z]+(?:\s+[a-z]+)?|owner|principal|partner)(?:\s*(?:&|and)\s*(?:co[- ]?founder|founder|ceo|cto|cfo|coo|cmo|president|owner|partner))?)\b",
    )
    .expect("valid title pattern")
});

const TITLE_MIN_LEN: usize = 3;
const TITLE_MAX_LEN: usize = 100;

/// Pull a job title out of a result title or snippet. Ordered fallbacks:
/// the separator-delimited form first, then the keyword-anchored form.
pub fn extract_title(texts: &[&str]) -> Option<String> {
    for pattern in [&*SEPARATOR_TITLE, &*KEYWORD_TITLE] {
        for text in texts {
            if let Some(caps) = pattern.captures(text) {
                if let Some(title) = clean_title(caps.get(1).map(|m| m.as_str()).unwrap_or("")) {
                    return Some(title);
                }
            }
        }
    }
    None
}

fn clean_title(raw: &str) -> Option<String> {
    let title = raw
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .trim_matches(|c: char| c == ',' || c == '.' || c == ';' || c == '|')
        .to_string();

    let lowered = title.to_lowercase();
    if lowered.contains("http") || lowered.contains("www.") || lowered.contains(".com") {
        return None;
    }
    let char_count = title.chars().count();
    match (TITLE_MIN_LEN..=TITLE_MAX_LEN).contains(&char_count) {
        true => Some(title),
        false => None,
    }
}
