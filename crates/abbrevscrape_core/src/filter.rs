use std::sync::LazyLock;

use regex::Regex;

// One or more runs of word characters, each followed by any number of
// periods, with the whole token ending in a period. A token must start with a
// word character: leading periods (".a.") are rejected on purpose.
static ABBREVIATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\w+\.*)+$").expect("abbreviation pattern is a valid regex")
});

/// Whether `candidate`, once trimmed, is a single period-terminated token.
pub fn is_valid_abbreviation(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    trimmed.ends_with('.') && ABBREVIATION_PATTERN.is_match(trimmed)
}

/// Trim every candidate and keep the valid ones in their original order.
pub fn filter_abbreviations<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let trimmed = candidate.as_ref().trim();
            is_valid_abbreviation(trimmed).then(|| trimmed.to_string())
        })
        .collect()
}
