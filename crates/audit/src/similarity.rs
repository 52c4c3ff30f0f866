use till_core::description_tokens;

/// Jaccard similarity over the token sets of two already-normalized
/// descriptions: `|A ∩ B| / |A ∪ B|`. Defined as 0 if either token set is
/// empty, 1.0 if the normalized strings are identical.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let tokens_a = description_tokens(a);
    let tokens_b = description_tokens(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.len() + tokens_b.len() - intersection;
    intersection as f64 / union as f64
}
