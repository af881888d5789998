//! Subset enumeration in indicator order
//!
//! Subsets of an n-element parameter list are represented as n-bit masks and
//! produced grouped by ascending popcount, ascending numeric value within a
//! group. This order is total and independent of scheduling, so the position
//! of a candidate in it can serve as its identity and tie-breaker.

use crate::types::{Candidate, SubsetMask};

use super::pattern::UrlPattern;

/// Iterator over the masks of popcount `1..=n`, in indicator order
#[derive(Debug, Clone)]
pub struct SubsetEnumerator {
    n: u32,
    cardinality: u32,
    next: Option<SubsetMask>,
}

impl SubsetEnumerator {
    /// Enumerate the non-empty subsets of `n` parameters. `n` must be below 64.
    pub fn new(n: u32) -> Self {
        Self::starting_at(n, 1)
    }

    /// Enumerate every subset including the empty one (mask 0 first).
    pub fn with_empty(n: u32) -> Self {
        Self::starting_at(n, 0)
    }

    fn starting_at(n: u32, cardinality: u32) -> Self {
        let n = n.min(63);
        let next = (cardinality <= n).then(|| lowest_mask(cardinality));
        Self {
            n,
            cardinality,
            next,
        }
    }

    /// Number of masks this enumerator yields in total
    pub fn total(n: u32) -> u64 {
        (1u64 << n.min(63)) - 1
    }

    /// Next mask with the same popcount (Gosper's hack), if still below 2^n
    fn same_popcount_successor(&self, mask: SubsetMask) -> Option<SubsetMask> {
        if mask == 0 {
            return None;
        }
        let lowest = mask & mask.wrapping_neg();
        let ripple = mask.checked_add(lowest)?;
        let next = (((ripple ^ mask) >> 2) / lowest) | ripple;
        (next < (1u64 << self.n)).then_some(next)
    }
}

fn lowest_mask(cardinality: u32) -> SubsetMask {
    if cardinality == 0 {
        0
    } else {
        (1u64 << cardinality) - 1
    }
}

impl Iterator for SubsetEnumerator {
    type Item = SubsetMask;

    fn next(&mut self) -> Option<SubsetMask> {
        let current = self.next?;

        self.next = match self.same_popcount_successor(current) {
            Some(next) => Some(next),
            None if self.cardinality < self.n => {
                self.cardinality += 1;
                Some(lowest_mask(self.cardinality))
            }
            None => None,
        };

        Some(current)
    }
}

/// Build the candidates for a pattern in indicator order.
///
/// With `include_empty` the bare URL (mask 0) is prepended as candidate 0.
pub fn enumerate_candidates(pattern: &UrlPattern, include_empty: bool) -> Vec<Candidate> {
    let n = pattern.len() as u32;
    let masks = if include_empty {
        SubsetEnumerator::with_empty(n)
    } else {
        SubsetEnumerator::new(n)
    };

    masks
        .enumerate()
        .map(|(index, mask)| pattern.candidate(index, mask))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_three_parameters_order() {
        let masks: Vec<u64> = SubsetEnumerator::new(3).collect();
        assert_eq!(masks, vec![0b001, 0b010, 0b100, 0b011, 0b101, 0b110, 0b111]);
    }

    #[test]
    fn test_counts_and_order_for_all_small_n() {
        for n in 0..=12u32 {
            let masks: Vec<u64> = SubsetEnumerator::new(n).collect();
            assert_eq!(masks.len() as u64, SubsetEnumerator::total(n), "n = {}", n);

            let distinct: HashSet<u64> = masks.iter().copied().collect();
            assert_eq!(distinct.len(), masks.len(), "duplicates for n = {}", n);
            assert!(masks.iter().all(|&m| m != 0 && m < (1u64 << n)));

            for pair in masks.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let key_a = (a.count_ones(), a);
                let key_b = (b.count_ones(), b);
                assert!(key_a < key_b, "order violated for n = {}: {:b} before {:b}", n, a, b);
            }
        }
    }

    #[test]
    fn test_with_empty_prepends_zero() {
        let masks: Vec<u64> = SubsetEnumerator::with_empty(2).collect();
        assert_eq!(masks, vec![0b00, 0b01, 0b10, 0b11]);
    }

    #[test]
    fn test_zero_parameters_yield_nothing() {
        assert_eq!(SubsetEnumerator::new(0).count(), 0);
        assert_eq!(SubsetEnumerator::with_empty(0).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_large_n_stays_in_range() {
        let first: Vec<u64> = SubsetEnumerator::new(63).take(3).collect();
        assert_eq!(first, vec![1, 2, 4]);

        let mut last_single = 0;
        for mask in SubsetEnumerator::new(63).take(63) {
            last_single = mask;
        }
        assert_eq!(last_single, 1u64 << 62);
    }

    #[test]
    fn test_candidates_indexed_in_order() {
        let pattern = UrlPattern::parse("https://example.com/p?a=1&b=2").unwrap();
        let candidates = enumerate_candidates(&pattern, false);

        let urls: Vec<&str> = candidates.iter().map(|c| c.test_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/p?a=1",
                "https://example.com/p?b=2",
                "https://example.com/p?a=1&b=2",
            ]
        );
        assert!(candidates.iter().enumerate().all(|(i, c)| c.index == i));

        let with_bare = enumerate_candidates(&pattern, true);
        assert_eq!(with_bare.len(), 4);
        assert_eq!(with_bare[0].test_url.as_str(), "https://example.com/p");
        assert_eq!(with_bare[1].index, 1);
    }
}
