//! URL pattern extraction
//!
//! Splits a URL into domain, path and the ordered list of query parameter
//! names, and rebuilds test URLs carrying any subset of those parameters.

use std::collections::BTreeMap;
use url::Url;

use crate::types::{AnalysisError, Candidate, ParameterSubset, SubsetMask};

/// One query parameter name with every value it had in the original URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub name: String,
    pub values: Vec<String>,
}

/// Decomposition of a URL into domain, path and parameter names
#[derive(Debug, Clone)]
pub struct UrlPattern {
    original: Url,
    base: Url,
    domain: String,
    params: Vec<QueryParam>,
}

impl UrlPattern {
    /// Parse an absolute URL.
    ///
    /// Parameter names come from the query string only, in first-seen order
    /// with duplicates collapsed. The fragment is ignored.
    pub fn parse(input: &str) -> Result<Self, AnalysisError> {
        let original =
            Url::parse(input.trim()).map_err(|e| AnalysisError::MalformedUrl(format!("{}: {}", input, e)))?;

        if original.cannot_be_a_base() {
            return Err(AnalysisError::MalformedUrl(format!("{}: not a hierarchical URL", input)));
        }
        let domain = match original.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(AnalysisError::MalformedUrl(format!("{}: missing host", input))),
        };

        let mut params: Vec<QueryParam> = Vec::new();
        for (name, value) in original.query_pairs() {
            if name.is_empty() {
                continue;
            }
            match params.iter_mut().find(|p| p.name == name) {
                Some(existing) => existing.values.push(value.into_owned()),
                None => params.push(QueryParam {
                    name: name.into_owned(),
                    values: vec![value.into_owned()],
                }),
            }
        }

        let mut base = original.clone();
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self {
            original,
            base,
            domain,
            params,
        })
    }

    pub fn original(&self) -> &Url {
        &self.original
    }

    /// Hostname used for per-domain throttling
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &str {
        self.base.path()
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Number of distinct parameter names
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Mask selecting every parameter
    pub fn full_mask(&self) -> SubsetMask {
        match self.params.len() {
            n if n >= 64 => SubsetMask::MAX,
            n => (1u64 << n) - 1,
        }
    }

    /// Every parameter with its first observed value
    pub fn all_params(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.values.first().cloned().unwrap_or_default()))
            .collect()
    }

    /// Materialize the subset selected by `mask` with the original values.
    pub fn subset(&self, mask: SubsetMask) -> ParameterSubset {
        let mut names = Vec::new();
        let mut pairs = Vec::new();

        for (i, param) in self.params.iter().enumerate().take(64) {
            if mask & (1u64 << i) == 0 {
                continue;
            }
            names.push(param.name.clone());
            for value in &param.values {
                pairs.push((param.name.clone(), value.clone()));
            }
        }

        ParameterSubset { mask, names, pairs }
    }

    /// Build the URL carrying exactly the subset's parameters.
    pub fn build_url(&self, subset: &ParameterSubset) -> Url {
        let mut url = self.base.clone();
        if !subset.pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (name, value) in &subset.pairs {
                query.append_pair(name, value);
            }
        }
        url
    }

    /// Create the candidate at `index` for the subset selected by `mask`.
    pub fn candidate(&self, index: usize, mask: SubsetMask) -> Candidate {
        let subset = self.subset(mask);
        let test_url = self.build_url(&subset);
        Candidate {
            index,
            subset,
            test_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern() {
        let pattern =
            UrlPattern::parse("https://example.com/page?id=123&utm_source=google&lang=en#section").unwrap();

        assert_eq!(pattern.domain(), "example.com");
        assert_eq!(pattern.path(), "/page");
        assert_eq!(pattern.param_names(), vec!["id", "utm_source", "lang"]);
        assert_eq!(pattern.full_mask(), 0b111);
    }

    #[test]
    fn test_duplicates_collapse_in_first_seen_order() {
        let pattern = UrlPattern::parse("https://example.com/?b=1&a=2&b=3").unwrap();
        assert_eq!(pattern.param_names(), vec!["b", "a"]);
        assert_eq!(pattern.params()[0].values, vec!["1", "3"]);
        assert_eq!(pattern.all_params().get("b").map(String::as_str), Some("1"));

        // A repeated name keeps all of its occurrences when included
        let subset = pattern.subset(0b01);
        assert_eq!(pattern.build_url(&subset).as_str(), "https://example.com/?b=1&b=3");
    }

    #[test]
    fn test_no_query_yields_empty_pattern() {
        let pattern = UrlPattern::parse("https://example.com/about").unwrap();
        assert!(pattern.is_empty());
        assert_eq!(pattern.full_mask(), 0);
    }

    #[test]
    fn test_empty_names_ignored() {
        let pattern = UrlPattern::parse("https://example.com/?=x&&q=rust").unwrap();
        assert_eq!(pattern.param_names(), vec!["q"]);
    }

    #[test]
    fn test_malformed_urls() {
        for input in ["not a url", "/relative/path?x=1", "mailto:someone@example.com", ""] {
            match UrlPattern::parse(input) {
                Err(AnalysisError::MalformedUrl(_)) => {}
                other => panic!("expected MalformedUrl for {:?}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_candidate_url_contains_only_subset() {
        let pattern = UrlPattern::parse("https://example.com/page?id=123&utm_source=google&lang=en").unwrap();

        let candidate = pattern.candidate(0, 0b001);
        assert_eq!(candidate.test_url.as_str(), "https://example.com/page?id=123");
        assert_eq!(candidate.subset.names, vec!["id"]);

        let candidate = pattern.candidate(4, 0b101);
        assert_eq!(candidate.test_url.as_str(), "https://example.com/page?id=123&lang=en");
        assert_eq!(candidate.subset.cardinality(), 2);

        let bare = pattern.candidate(0, 0);
        assert_eq!(bare.test_url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_values_are_reencoded() {
        let pattern = UrlPattern::parse("https://example.com/s?q=a%20b&x=1").unwrap();
        let candidate = pattern.candidate(0, 0b01);
        assert_eq!(candidate.test_url.as_str(), "https://example.com/s?q=a+b");
    }
}
