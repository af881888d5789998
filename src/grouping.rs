//! URL grouping
//!
//! Offline helper that buckets a URL list by domain and path, so an operator
//! can pick one representative URL per path before running the analyzer.
//! Query strings and fragments are ignored when grouping.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use url::Url;

/// Per-domain path statistics
#[derive(Debug, Clone, Default)]
struct DomainStats {
    total_urls: usize,
    depth_distribution: BTreeMap<usize, usize>,
}

/// Path statistics reported for one domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathAnalysis {
    pub total_urls: usize,
    pub unique_paths: usize,
    /// Number of URLs per path depth (count of non-empty segments)
    pub depth_distribution: BTreeMap<usize, usize>,
    pub avg_depth: f64,
}

/// An input that could not be grouped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupingError {
    pub url: String,
    pub error: String,
}

/// One line of the domain summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSummary {
    pub domain: String,
    pub unique_paths: usize,
    pub total_urls: usize,
}

/// Groups URLs by domain, then by path
#[derive(Debug, Default)]
pub struct UrlGrouper {
    groups: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    stats: BTreeMap<String, DomainStats>,
    errors: Vec<GroupingError>,
}

impl UrlGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group every URL. Unparsable inputs are recorded as errors and skipped.
    pub fn process_urls(&mut self, urls: &[String]) -> &BTreeMap<String, BTreeMap<String, Vec<String>>> {
        for url in urls {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            if let Err(error) = self.process_url(url) {
                tracing::debug!("Cannot group {}: {}", url, error);
                self.errors.push(GroupingError {
                    url: url.to_string(),
                    error,
                });
            }
        }
        &self.groups
    }

    fn process_url(&mut self, input: &str) -> Result<(), String> {
        let (domain, segments) = Self::split(input)?;

        let path = if segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", segments.join("/"))
        };

        self.groups
            .entry(domain.clone())
            .or_default()
            .entry(path)
            .or_default()
            .push(input.to_string());

        let stats = self.stats.entry(domain).or_default();
        stats.total_urls += 1;
        *stats.depth_distribution.entry(segments.len()).or_insert(0) += 1;

        Ok(())
    }

    /// Domain (with port, if any) and non-empty path segments of a URL
    fn split(input: &str) -> Result<(String, Vec<String>), String> {
        let url = Url::parse(input).map_err(|e| format!("URL parse error: {}", e))?;
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or("URL has no host")?;

        let domain = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let segments = url
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok((domain, segments))
    }

    pub fn grouped_results(&self) -> &BTreeMap<String, BTreeMap<String, Vec<String>>> {
        &self.groups
    }

    /// Sorted unique paths per domain
    pub fn unique_paths(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.groups
            .iter()
            .map(|(domain, paths)| (domain.clone(), paths.keys().cloned().collect()))
            .collect()
    }

    pub fn path_analysis(&self) -> BTreeMap<String, PathAnalysis> {
        self.stats
            .iter()
            .filter(|(_, stats)| stats.total_urls > 0)
            .map(|(domain, stats)| {
                let weighted: usize = stats
                    .depth_distribution
                    .iter()
                    .map(|(depth, count)| depth * count)
                    .sum();
                let analysis = PathAnalysis {
                    total_urls: stats.total_urls,
                    unique_paths: self.groups.get(domain).map_or(0, BTreeMap::len),
                    depth_distribution: stats.depth_distribution.clone(),
                    avg_depth: weighted as f64 / stats.total_urls as f64,
                };
                (domain.clone(), analysis)
            })
            .collect()
    }

    pub fn errors(&self) -> &[GroupingError] {
        &self.errors
    }

    pub fn domain_summary(&self) -> Vec<DomainSummary> {
        self.groups
            .iter()
            .map(|(domain, paths)| DomainSummary {
                domain: domain.clone(),
                unique_paths: paths.len(),
                total_urls: self.stats.get(domain).map_or(0, |s| s.total_urls),
            })
            .collect()
    }

    /// Write `unique_paths.json`, `path_analysis.json` and, if any inputs
    /// failed, `errors.json` into `output_dir`.
    pub fn save_results(&self, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        write_json(&output_dir.join("unique_paths.json"), &self.unique_paths())?;
        write_json(&output_dir.join("path_analysis.json"), &self.path_analysis())?;
        if !self.errors.is_empty() {
            write_json(&output_dir.join("errors.json"), &self.errors)?;
        }

        tracing::info!("Grouping results saved to {}", output_dir.display());
        Ok(())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
