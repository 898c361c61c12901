use once_cell::sync::Lazy;
use regex::Regex;

/// Titles that indicate authority to approve a purchase or partnership.
const INCLUSION_KEYWORDS: &[&str] = &[
    "founder",
    "co-founder",
    "cofounder",
    "ceo",
    "chief",
    "owner",
    "president",
    "cfo",
    "cto",
    "coo",
    "cmo",
    "vice president",
    "vp",
    "director",
    "managing director",
    "managing partner",
    "partner",
    "head of",
    "principal",
    "executive",
];

/// Support roles that disqualify a title even when an inclusion keyword is
/// present ("Assistant to the CEO" is not a decision-maker).
const EXCLUSION_KEYWORDS: &[&str] = &[
    "assistant",
    "associate",
    "junior",
    "intern",
    "coordinator",
    "analyst",
    "specialist",
    "representative",
    "clerk",
    "trainee",
    "student",
];

// Word-boundary matching is mandatory: "vp" and "ceo" must never match as
// substrings of unrelated words.
static INCLUSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| compile_boundary(INCLUSION_KEYWORDS));
static EXCLUSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| compile_boundary(EXCLUSION_KEYWORDS));

fn compile_boundary(keywords: &[&str]) -> Vec<Regex> {
    keywords
        .iter()
        .map(|kw| {
            Regex::new(&format!(r"\b{}\b", regex::escape(kw)))
                .expect("keyword patterns are literal words")
        })
        .collect()
}

/// Rule-based check: does this job title belong to a decision-maker?
/// Exclusion always wins over inclusion.
pub fn is_decision_maker(title: &str) -> bool {
    let title = title.to_lowercase();
    let included = INCLUSION_PATTERNS.iter().any(|p| p.is_match(&title));
    let excluded = EXCLUSION_PATTERNS.iter().any(|p| p.is_match(&title));
    included && !excluded
}
