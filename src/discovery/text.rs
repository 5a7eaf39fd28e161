//! Plain-text URL lists and the well-formedness check shared by every format

use url::Url;

/// Yields every non-blank line of `text`, trimmed
pub fn candidate_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Returns true if `candidate` is an absolute URL with a host
///
/// # Examples
///
/// ```
/// use swarmload::discovery::is_well_formed;
///
/// assert!(is_well_formed("https://example.com/page?q=1"));
/// assert!(!is_well_formed("/relative/path"));
/// assert!(!is_well_formed("mailto:someone@example.com"));
/// ```
pub fn is_well_formed(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return false;
    }

    match Url::parse(candidate) {
        Ok(url) => url.has_host() && !url.cannot_be_a_base(),
        Err(_) => false,
    }
}
