//! Fuzzy text matching (§4.E step 2): `ratio`/`partial_ratio`/`token_sort_ratio`, combined as
//! `0.4*ratio + 0.3*partial_ratio + 0.3*token_sort_ratio` into a single 0-100 score. Built on
//! `strsim`'s normalized Levenshtein distance as the base similarity measure, the way the
//! `rapidfuzz`/`fuzzywuzzy` family these heuristics are named after does.

/// Whole-string similarity, 0-100.
pub fn ratio(a: &str, b: &str) -> f32 {
    (strsim::normalized_levenshtein(a, b) * 100.0) as f32
}

/// Best-matching-substring similarity: finds the highest `ratio` between the shorter string and
/// any equal-length window of the longer string, 0-100. Approximates what a human means by "is
/// this text *contained* in that text", catching OCR results with extra surrounding characters.
pub fn partial_ratio(a: &str, b: &str) -> f32 {
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if shorter.is_empty() {
        return if longer.is_empty() { 100.0 } else { 0.0 };
    }
    if shorter.len() >= longer.len() {
        return ratio(shorter, longer);
    }

    let longer_chars: Vec<char> = longer.chars().collect();
    let window = shorter.chars().count();
    let mut best = 0.0f32;
    for start in 0..=longer_chars.len().saturating_sub(window) {
        let slice: String = longer_chars[start..start + window].iter().collect();
        let score = ratio(shorter, &slice);
        if score > best {
            best = score;
        }
    }
    best
}

/// Order-insensitive similarity: sorts each string's whitespace-separated tokens alphabetically
/// before comparing, so "new york city" and "city new york" score a perfect match.
pub fn token_sort_ratio(a: &str, b: &str) -> f32 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// The weighted combination the tracker uses to decide whether an OCR result "matches" a target
/// text (§4.E step 2): `0.4*ratio + 0.3*partial_ratio + 0.3*token_sort_ratio`.
pub fn combined_score(a: &str, b: &str) -> f32 {
    0.4 * ratio(a, b) + 0.3 * partial_ratio(a, b) + 0.3 * token_sort_ratio(a, b)
}

pub const MATCH_THRESHOLD: f32 = 70.0;

pub fn is_match(a: &str, b: &str) -> bool {
    combined_score(a, b) >= MATCH_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_perfectly() {
        assert_eq!(ratio("hello", "hello"), 100.0);
        assert_eq!(combined_score("hello", "hello"), 100.0);
    }

    #[test]
    fn completely_different_strings_score_low() {
        assert!(combined_score("abcdef", "zyxwvu") < 30.0);
    }

    #[test]
    fn partial_ratio_finds_substring_match() {
        let score = partial_ratio("york", "new york city");
        assert!(score > 90.0, "expected high partial ratio, got {score}");
    }

    #[test]
    fn token_sort_ratio_ignores_word_order() {
        let score = token_sort_ratio("new york city", "city new york");
        assert_eq!(score, 100.0);
    }

    #[test]
    fn is_match_respects_threshold() {
        assert!(is_match("confidential", "confidential"));
        assert!(!is_match("confidential", "zzzzzzzzzzzz"));
    }
}
