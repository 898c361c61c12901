/// A work address discovered at a company domain, waiting for a worker task.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailCandidate {
    pub address: String,
    pub domain: String,
}

/// What the local part of an address tells us about the person behind it.
/// Never mutated after extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContact {
    /// "First Last" when a name could be inferred, empty otherwise.
    pub name: String,
    /// Shared mailbox (`info@`, `sales@`), never a person.
    pub is_generic: bool,
    pub confidence: f64,
}

impl ExtractedContact {
    fn generic() -> Self {
        ExtractedContact {
            name: String::new(),
            is_generic: true,
            confidence: CONFIDENCE_GENERIC,
        }
    }

    /// ("First", "Last") split of the inferred name; last is empty for
    /// single-token names.
    pub fn split_name(&self) -> (String, String) {
        match self.name.split_once(' ') {
            Some((first, last)) => (first.to_string(), last.to_string()),
            None => (self.name.clone(), String::new()),
        }
    }
}

/// Local parts containing any of these are shared mailboxes.
pub const GENERIC_KEYWORDS: &[&str] = &[
    "info",
    "contact",
    "sales",
    "support",
    "admin",
    "hello",
    "office",
    "team",
    "hr",
    "careers",
    "jobs",
    "help",
    "enquiries",
    "inquiries",
    "marketing",
    "press",
    "billing",
    "accounts",
    "noreply",
    "no-reply",
    "newsletter",
    "webmaster",
    "postmaster",
];

pub const CONFIDENCE_GENERIC: f64 = 0.0;
pub const CONFIDENCE_DOTTED_PAIR: f64 = 0.95;
pub const CONFIDENCE_DOTTED_MANY: f64 = 0.90;
pub const CONFIDENCE_SPLIT_FULL: f64 = 0.90;
pub const CONFIDENCE_SPLIT_SHORT: f64 = 0.70;
pub const CONFIDENCE_CAMEL_CASE: f64 = 0.85;
pub const CONFIDENCE_SINGLE_TOKEN: f64 = 0.60;
pub const CONFIDENCE_UNKNOWN: f64 = 0.20;

pub fn is_generic_local_part(local: &str) -> bool {
    let local = local.to_lowercase();
    GENERIC_KEYWORDS.iter().any(|kw| local.contains(kw))
}

/// Infer a person name from one email address. Pure heuristic, no I/O.
///
/// The rules are ordered: the generic check wins over everything, dotted
/// pairs (`first.last@`) are the strongest personal signal, then mixed
/// separators, then camelCase, then a lone token.
pub fn extract_contact(address: &str) -> ExtractedContact {
    let local = match address.split('@').next() {
        Some(local) if !local.is_empty() => local,
        _ => {
            return ExtractedContact {
                name: String::new(),
                is_generic: false,
                confidence: CONFIDENCE_UNKNOWN,
            }
        }
    };

    if is_generic_local_part(local) {
        return ExtractedContact::generic();
    }

    let dotted: Vec<&str> = local.split('.').collect();
    if dotted.len() == 2 && dotted.iter().all(|t| is_name_token(t, 1)) {
        return ExtractedContact {
            name: format!("{} {}", capitalize(dotted[0]), capitalize(dotted[1])),
            is_generic: false,
            confidence: CONFIDENCE_DOTTED_PAIR,
        };
    }
    if dotted.len() > 2 && dotted.iter().all(|t| is_name_token(t, 1)) {
        let first = dotted.first().unwrap();
        let last = dotted.last().unwrap();
        return ExtractedContact {
            name: format!("{} {}", capitalize(first), capitalize(last)),
            is_generic: false,
            confidence: CONFIDENCE_DOTTED_MANY,
        };
    }

    // Split on every non-alphabetic separator: dots, underscores, dashes,
    // digits.
    let tokens: Vec<&str> = local
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() >= 2 && tokens.iter().all(|t| is_name_token(t, 2)) {
        let first = tokens.first().unwrap();
        let last = tokens.last().unwrap();
        let confidence = match first.len() >= 3 && last.len() >= 3 {
            true => CONFIDENCE_SPLIT_FULL,
            false => CONFIDENCE_SPLIT_SHORT,
        };
        return ExtractedContact {
            name: format!("{} {}", capitalize(first), capitalize(last)),
            is_generic: false,
            confidence,
        };
    }

    if tokens.len() == 1 && tokens[0].len() == local.len() {
        let token = tokens[0];
        if let Some((first, last)) = split_camel_case(token) {
            return ExtractedContact {
                name: format!("{} {}", capitalize(&first), capitalize(&last)),
                is_generic: false,
                confidence: CONFIDENCE_CAMEL_CASE,
            };
        }
        if token.len() >= 3 {
            return ExtractedContact {
                name: capitalize(token),
                is_generic: false,
                confidence: CONFIDENCE_SINGLE_TOKEN,
            };
        }
    }

    ExtractedContact {
        name: String::new(),
        is_generic: false,
        confidence: CONFIDENCE_UNKNOWN,
    }
}

fn is_name_token(token: &str, min_len: usize) -> bool {
    token.len() >= min_len && token.len() <= 20 && token.chars().all(|c| c.is_ascii_alphabetic())
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// `firstnameLastname` -> ("firstname", "Lastname"). Requires exactly one
/// lower-to-upper boundary so initialisms don't split.
fn split_camel_case(token: &str) -> Option<(String, String)> {
    let chars: Vec<char> = token.chars().collect();
    let mut boundaries = vec![];
    for i in 1..chars.len() {
        if chars[i - 1].is_ascii_lowercase() && chars[i].is_ascii_uppercase() {
            boundaries.push(i);
        }
    }
    match boundaries.as_slice() {
        [i] => {
            let (first, last) = token.split_at(*i);
            match first.len() >= 2 && last.len() >= 2 {
                true => Some((first.to_string(), last.to_string())),
                false => None,
            }
        }
        _ => None,
    }
}
