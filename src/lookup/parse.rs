/// Interpretation of free-text oracle answers
use super::types::Confidence;
use once_cell::sync::Lazy;
use regex::Regex;

/// Tried in order; the first match wins
static USERNAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)username[:\s]+@?([A-Za-z0-9_]{1,15})",
        r"@([A-Za-z0-9_]{1,15})",
        r"(?i)handle[:\s]+@?([A-Za-z0-9_]{1,15})",
        r"(?i)twitter[:\s]+@?([A-Za-z0-9_]{1,15})",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static CONFIDENCE_LABEL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)confidence(?:\s+level)?[:\s]+\[?(high|strong|medium|moderate|low|weak|none)\b")
        .ok()
});

/// Keyword scan order, strongest first
static CONFIDENCE_KEYWORDS: Lazy<Vec<(Confidence, Regex)>> = Lazy::new(|| {
    [
        (Confidence::High, r"(?i)\b(high|strong|clear|definite|certain)\b"),
        (Confidence::Medium, r"(?i)\b(medium|moderate|somewhat|partial)\b"),
        (Confidence::Low, r"(?i)\b(low|weak|minimal|uncertain)\b"),
        (Confidence::None, r"(?i)\b(none|no|false|not found)\b"),
    ]
    .into_iter()
    .filter_map(|(level, p)| Regex::new(p).ok().map(|re| (level, re)))
    .collect()
});

/// Existence answer: Some(true)/Some(false), None when ambiguous
pub fn parse_existence(answer: &str) -> Option<bool> {
    let lower = answer.trim().to_lowercase();
    if lower.contains("true") && !lower.contains("false") {
        Some(true)
    } else if lower.contains("false") {
        Some(false)
    } else {
        None
    }
}

/// Twitter/X username without the "@"
pub fn extract_username(answer: &str) -> Option<String> {
    USERNAME_PATTERNS.iter().find_map(|re| {
        re.captures(answer)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn level_from_word(word: &str) -> Option<Confidence> {
    match word.to_lowercase().as_str() {
        "high" | "strong" => Some(Confidence::High),
        "medium" | "moderate" => Some(Confidence::Medium),
        "low" | "weak" => Some(Confidence::Low),
        "none" => Some(Confidence::None),
        _ => None,
    }
}

/// Confidence level named in the answer, if any
///
/// An explicit `Confidence: <level>` label wins over loose keywords
/// elsewhere in the text.
pub fn extract_confidence(answer: &str) -> Option<Confidence> {
    let labelled = CONFIDENCE_LABEL
        .as_ref()
        .and_then(|re| re.captures(answer))
        .and_then(|caps| caps.get(1))
        .and_then(|m| level_from_word(m.as_str()));

    labelled.or_else(|| {
        CONFIDENCE_KEYWORDS
            .iter()
            .find(|(_, re)| re.is_match(answer))
            .map(|(level, _)| *level)
    })
}
