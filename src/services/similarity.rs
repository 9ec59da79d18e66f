//! Fuzzy text comparison used to grade free-form guesses.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Ratio floor granted when one normalized string contains the other.
const CONTAINMENT_FLOOR: f64 = 0.5;

const FEAT_TOKENS: [&str; 5] = ["feat", "feat.", "ft", "ft.", "featuring"];
const CANDIDATE_SEPARATORS: [&str; 10] = [
    " feat. ", " feat ", " ft. ", " ft ", " featuring ", " x ", "&", "/", "•", ",",
];

/// Score thresholds mapping a similarity ratio to points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum ratio for a full point.
    pub full: f64,
    /// Minimum ratio for half a point.
    pub half: f64,
}

impl Thresholds {
    /// Artist-style fields.
    pub const ARTIST: Thresholds = Thresholds {
        full: 0.82,
        half: 0.55,
    };
    /// Title-style fields, which require closer matches.
    pub const TITLE: Thresholds = Thresholds {
        full: 0.84,
        half: 0.58,
    };

    /// Points awarded for `ratio`.
    pub fn points(&self, ratio: f64) -> f64 {
        if ratio >= self.full {
            1.0
        } else if ratio >= self.half {
            0.5
        } else {
            0.0
        }
    }
}

/// Canonical form used for comparison.
pub fn normalize(text: &str) -> String {
    let folded = strip_brackets(&fold_accents(&text.to_lowercase()));
    let cleaned = folded
        .split_whitespace()
        .filter(|word| !FEAT_TOKENS.contains(word))
        .map(clean_word)
        .collect::<Vec<_>>()
        .join(" ");

    cleaned
        .split_whitespace()
        .filter(|word| *word != "x")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity in `[0, 1]` between two raw strings.
pub fn similarity(left: &str, right: &str) -> f64 {
    let left = normalize(left);
    let right = normalize(right);
    if left == right {
        return 1.0;
    }

    let score = ratio(&left, &right);
    let contains = !left.is_empty()
        && !right.is_empty()
        && (left.contains(right.as_str()) || right.contains(left.as_str()));
    if score < CONTAINMENT_FLOOR && contains {
        CONTAINMENT_FLOOR
    } else {
        score
    }
}

/// Points for `guess` against a key that may list several acceptable values.
///
/// Empty guesses and empty keys score nothing.
pub fn score_field(guess: &str, key: &str, thresholds: Thresholds) -> f64 {
    if guess.trim().is_empty() || key.trim().is_empty() {
        return 0.0;
    }

    let best = candidates(key)
        .iter()
        .map(|candidate| similarity(guess, candidate))
        .fold(0.0, f64::max);
    thresholds.points(best)
}

/// Full key plus each part split on collaboration separators.
fn candidates(key: &str) -> Vec<String> {
    let mut marked = format!(" {} ", key.to_lowercase());
    for separator in CANDIDATE_SEPARATORS {
        marked = marked.replace(separator, "\u{1f}");
    }

    let mut out = vec![key.to_string()];
    out.extend(
        marked
            .split('\u{1f}')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string),
    );
    out
}

/// Longest-matching-blocks ratio `2M / T`.
fn ratio(left: &str, right: &str) -> f64 {
    let a: Vec<char> = left.chars().collect();
    let b: Vec<char> = right.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`; ties go to the earliest start in
/// `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let mut previous = vec![0usize; b.len() + 1];
    for i in alo..ahi {
        let mut current = vec![0usize; b.len() + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let size = previous[j] + 1;
                current[j + 1] = size;
                if size > best.2 {
                    best = (i + 1 - size, j + 1 - size, size);
                }
            }
        }
        previous = current;
    }
    best
}

fn fold_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        match c {
            'đ' => out.push('d'),
            'ł' => out.push('l'),
            'ø' => out.push('o'),
            'æ' => out.push_str("ae"),
            'œ' => out.push_str("oe"),
            'ß' => out.push_str("ss"),
            other => out.push(other),
        }
    }
    out
}

fn strip_brackets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' if depth > 0 => {
                depth -= 1;
                out.push(' ');
            }
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn clean_word(word: &str) -> String {
    word.chars()
        .filter(|c| !matches!(c, '\'' | '’' | '`'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_folds_decorations() {
        assert_eq!(
            normalize("Beyoncé feat. JAY-Z (Live) [2003 Remaster]"),
            "beyonce jay z"
        );
        assert_eq!(normalize("Simon & Garfunkel"), "simon garfunkel");
        assert_eq!(normalize("Don't Stop Me Now!"), "dont stop me now");
        assert_eq!(normalize("Sigur Rós • Ólafur x Ærø"), "sigur ros olafur aero");
        assert_eq!(normalize("  many   spaces  "), "many spaces");
    }

    #[test]
    fn equal_normalized_forms_score_one() {
        for (left, right) in [
            ("Bohemian Rhapsody", "bohemian rhapsody"),
            ("Motörhead", "Motorhead"),
            ("AC/DC", "ac dc"),
            ("Hello (Radio Edit)", "hello"),
        ] {
            assert_eq!(similarity(left, right), 1.0, "{left} vs {right}");
        }
    }

    #[test]
    fn ratio_matches_longest_block_definition() {
        assert_eq!(ratio("abcd", "bcde"), 0.75);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        let close = similarity("Bohemian Rhapsody", "bohemian rapsody");
        assert!((close - 32.0 / 33.0).abs() < 1e-9);
    }

    #[test]
    fn containment_floors_low_ratios() {
        let score = similarity("Queen", "Queen and the Royal Philharmonic Orchestra");
        assert_eq!(score, CONTAINMENT_FLOOR);
        assert!(similarity("", "Queen") < CONTAINMENT_FLOOR);
    }

    #[test]
    fn artist_and_title_thresholds_differ() {
        assert_eq!(Thresholds::ARTIST.points(0.83), 1.0);
        assert_eq!(Thresholds::TITLE.points(0.83), 0.5);
        assert_eq!(Thresholds::ARTIST.points(0.56), 0.5);
        assert_eq!(Thresholds::TITLE.points(0.56), 0.0);
    }

    #[test]
    fn best_candidate_wins_for_collaborations() {
        assert_eq!(score_field("Daft Punk", "Daft Punk feat. Pharrell", Thresholds::ARTIST), 1.0);
        assert_eq!(score_field("pharrell", "Daft Punk & Pharrell", Thresholds::ARTIST), 1.0);
        assert_eq!(score_field("", "Daft Punk", Thresholds::ARTIST), 0.0);
        assert_eq!(score_field("Daft Punk", "  ", Thresholds::ARTIST), 0.0);
    }
}
