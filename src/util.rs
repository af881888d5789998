//! Shared utility functions

use anyhow::{Context, Result};
use std::path::Path;

/// Truncate a string to a maximum length, appending "..." if truncated.
/// Handles multi-byte characters by finding a valid char boundary.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let suffix = "...";
    let mut end = max_len.saturating_sub(suffix.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &s[..end], suffix)
}

/// Read a URL list: one URL per line, blank lines and `#` comments skipped.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a longer message", 10), "a longe...");
        // Never splits a multi-byte character
        assert_eq!(truncate_str("ééééé", 6), "é...");
    }

    #[test]
    fn test_read_url_list() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("urls.txt");
        std::fs::write(&path, "# seeds\nhttps://a.com/?x=1\n\n  https://b.com/  \n").unwrap();

        let urls = read_url_list(&path).unwrap();
        assert_eq!(urls, vec!["https://a.com/?x=1", "https://b.com/"]);
    }
}
