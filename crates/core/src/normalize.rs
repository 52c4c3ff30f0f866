use std::collections::HashSet;

/// Canonicalizes a raw bank description for identity hashing and similarity
/// scoring. Pure and stable across runs: the same input always yields the
/// same output, so it is safe to embed the result in an identity hash.
///
/// Steps, in order:
/// 1. Trim; map curly quotes and long dashes to ASCII.
/// 2. Strip maximal digit runs of length >= 5 (order numbers, phone numbers);
///    keep runs of 1-4 digits, which are often meaningful store codes.
/// 3. Replace any non-letter/non-digit/non-space character with a space and
///    collapse repeated whitespace.
/// 4. Uppercase.
/// 5. Drop a trailing exactly-two-letter token (a state code) when at least
///    one other token remains.
pub fn normalize_description(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut digit_run = String::new();

    // A trailing space forces the final digit run to flush.
    for ch in raw.trim().chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() {
            digit_run.push(ch);
            continue;
        }
        if !digit_run.is_empty() {
            if digit_run.len() < 5 {
                cleaned.push_str(&digit_run);
            } else {
                cleaned.push(' ');
            }
            digit_run.clear();
        }
        let ch = match ch {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        };
        if ch.is_alphanumeric() {
            cleaned.push(ch);
        } else {
            cleaned.push(' ');
        }
    }

    let mut tokens: Vec<String> = cleaned
        .split_whitespace()
        .map(|t| t.to_uppercase())
        .collect();

    if tokens.len() > 1 {
        let last = &tokens[tokens.len() - 1];
        if last.len() == 2 && last.chars().all(|c| c.is_ascii_alphabetic()) {
            tokens.pop();
        }
    }

    tokens.join(" ")
}

/// Token set for Jaccard similarity: whitespace-split words of length >= 2
/// from an already-normalized description.
pub fn description_tokens(normalized: &str) -> HashSet<String> {
    normalized
        .split_whitespace()
        .filter(|t| t.len() >= 2)
        .map(str::to_string)
        .collect()
}
