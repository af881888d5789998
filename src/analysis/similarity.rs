//! Text similarity
//!
//! Sørensen–Dice coefficient over character bigram multisets. Bigram overlap
//! tolerates small insertions (ads, counters, timestamps) anywhere in the
//! page without being dominated by the length of either text.

use std::collections::HashMap;

/// Similarity of two normalized texts in `[0, 1]`.
///
/// Symmetric and reflexive: `similarity(a, a) == 1.0` for every `a`,
/// including the empty string.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a_bigrams = bigram_counts(a);
    let b_bigrams = bigram_counts(b);

    let a_total: usize = a_bigrams.values().sum();
    let b_total: usize = b_bigrams.values().sum();
    if a_total == 0 || b_total == 0 {
        // At least one side has fewer than two characters and they differ
        return 0.0;
    }

    let (small, large) = if a_bigrams.len() <= b_bigrams.len() {
        (&a_bigrams, &b_bigrams)
    } else {
        (&b_bigrams, &a_bigrams)
    };

    let overlap: usize = small
        .iter()
        .map(|(bigram, count)| large.get(bigram).map_or(0, |other| (*count).min(*other)))
        .sum();

    (2 * overlap) as f64 / (a_total + b_total) as f64
}

fn bigram_counts(text: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = text.chars().collect();
    let mut counts = HashMap::with_capacity(chars.len());
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

/// Whether `score` meets the acceptance threshold.
pub fn meets_threshold(score: f64, threshold: f64) -> bool {
    score >= threshold
}
